use async_trait::async_trait;
use common::{error::AppError, search_document::SearchDocument, storage::db::SearchDbClient};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{infer_field_type, SearchBackend};

const HNSW_OPTIONS: &str = "DIST COSINE TYPE F32 EFC 100 M 8";
const FTS_ANALYZER_NAME: &str = "ingest_en_fts_analyzer";

/// SurrealDB-backed index: one table per index, HNSW over the embedding
/// field plus BM25 full-text search over the chunk content.
pub struct SurrealSearchBackend {
    db: SearchDbClient,
}

impl SurrealSearchBackend {
    pub fn new(db: SearchDbClient) -> Self {
        Self { db }
    }

    async fn define_analyzer(&self) -> Result<(), AppError> {
        let analyzer_query = format!(
            "DEFINE ANALYZER IF NOT EXISTS {FTS_ANALYZER_NAME}
                TOKENIZERS class
                FILTERS lowercase, ascii, snowball(english);"
        );
        self.db.client.query(analyzer_query).await?.check()?;
        Ok(())
    }
}

#[async_trait]
impl SearchBackend for SurrealSearchBackend {
    fn name(&self) -> &'static str {
        "surreal"
    }

    async fn create_index(
        &self,
        index: &str,
        additional_metadata: &Map<String, Value>,
        dimension: usize,
    ) -> Result<(), AppError> {
        self.define_analyzer().await?;

        // Drop-and-recreate; the schema is inferred from the metadata
        // template's value types.
        let mut ddl = format!(
            "REMOVE TABLE IF EXISTS {index};
             DEFINE TABLE {index} SCHEMALESS;
             DEFINE FIELD content ON TABLE {index} TYPE string;
             DEFINE FIELD embedding ON TABLE {index} TYPE array<float>;"
        );
        for (field, value) in additional_metadata {
            let field_type = infer_field_type(value).surreal_type();
            ddl.push_str(&format!(
                "DEFINE FIELD {field} ON TABLE {index} FLEXIBLE TYPE option<{field_type}>;"
            ));
        }
        ddl.push_str(&format!(
            "DEFINE INDEX idx_embedding_{index} ON TABLE {index} \
             FIELDS embedding HNSW DIMENSION {dimension} {HNSW_OPTIONS};"
        ));
        ddl.push_str(&format!(
            "DEFINE INDEX idx_content_{index} ON TABLE {index} \
             FIELDS content SEARCH ANALYZER {FTS_ANALYZER_NAME} BM25;"
        ));

        self.db.client.query(ddl).await?.check()?;

        info!(
            index = %index,
            dimension,
            mapped_fields = additional_metadata.len(),
            "search index recreated"
        );
        Ok(())
    }

    async fn store_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> Result<(), AppError> {
        for document in documents {
            let id = document.id.clone();
            let _upserted: Option<SearchDocument> = self
                .db
                .client
                .upsert((index, id.as_str()))
                .content(document)
                .await?;
            debug!(index = %index, document_id = %id, "chunk document upserted");
        }
        Ok(())
    }

    async fn document_count(&self, index: &str) -> Result<usize, AppError> {
        let query = format!("SELECT count() AS count FROM {index} GROUP ALL;");
        let mut response = self.db.client.query(query).await?;
        let rows: Vec<CountRow> = response
            .take(0)
            .map_err(|e| AppError::Indexing(format!("failed to read count response: {e}")))?;
        Ok(rows.first().map_or(0, |row| row.count))
    }

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<SearchDocument>, AppError> {
        let document: Option<SearchDocument> = self.db.client.select((index, id)).await?;
        Ok(document)
    }
}

#[derive(Debug, serde::Deserialize)]
struct CountRow {
    count: usize,
}
