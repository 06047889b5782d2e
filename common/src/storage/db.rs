use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};

/// Shared SurrealDB handle used by the database connector and the surreal
/// search backend. Constructed once at startup and cloned (cheap) wherever
/// needed; safe to share across concurrent record processing.
#[derive(Clone)]
pub struct SearchDbClient {
    pub client: Surreal<Any>,
}

impl SearchDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        db.signin(Root { username, password }).await?;
        db.use_ns(namespace).use_db(database).await?;

        Ok(SearchDbClient { client: db })
    }
}

impl std::ops::Deref for SearchDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SearchDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(SearchDbClient { client: db })
    }
}
