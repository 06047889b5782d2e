use std::collections::HashMap;

use async_trait::async_trait;
use common::{error::AppError, search_document::SearchDocument};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{infer_field_type, FieldType, SearchBackend};

/// In-process backend used by tests and the development profile. Upserts are
/// keyed by document id, matching the idempotency contract of the real
/// backends.
#[derive(Default)]
pub struct MemorySearchBackend {
    indexes: RwLock<HashMap<String, IndexState>>,
}

struct IndexState {
    schema: HashMap<String, FieldType>,
    dimension: usize,
    documents: HashMap<String, SearchDocument>,
}

impl MemorySearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dimension(&self, index: &str) -> Option<usize> {
        self.indexes.read().await.get(index).map(|i| i.dimension)
    }

    pub async fn all_documents(&self, index: &str) -> Vec<SearchDocument> {
        self.indexes
            .read()
            .await
            .get(index)
            .map(|state| state.documents.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for MemorySearchBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_index(
        &self,
        index: &str,
        additional_metadata: &Map<String, Value>,
        dimension: usize,
    ) -> Result<(), AppError> {
        let schema = additional_metadata
            .iter()
            .map(|(key, value)| (key.clone(), infer_field_type(value)))
            .collect();

        // Drop-and-recreate: existing documents under the same name are gone.
        self.indexes.write().await.insert(
            index.to_string(),
            IndexState {
                schema,
                dimension,
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn store_documents(
        &self,
        index: &str,
        documents: Vec<SearchDocument>,
    ) -> Result<(), AppError> {
        let mut indexes = self.indexes.write().await;
        let state = indexes.entry(index.to_string()).or_insert(IndexState {
            schema: HashMap::new(),
            dimension: 0,
            documents: HashMap::new(),
        });

        for document in documents {
            state.documents.insert(document.id.clone(), document);
        }
        Ok(())
    }

    async fn document_count(&self, index: &str) -> Result<usize, AppError> {
        Ok(self
            .indexes
            .read()
            .await
            .get(index)
            .map_or(0, |state| state.documents.len()))
    }

    async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<SearchDocument>, AppError> {
        Ok(self
            .indexes
            .read()
            .await
            .get(index)
            .and_then(|state| state.documents.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, content: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            content: content.to_string(),
            embedding: vec![0.1, 0.2],
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn upserting_the_same_id_twice_keeps_the_second_write() {
        let backend = MemorySearchBackend::new();
        backend
            .store_documents("docs", vec![doc("d1", "first")])
            .await
            .expect("first upsert");
        backend
            .store_documents("docs", vec![doc("d1", "second")])
            .await
            .expect("second upsert");

        assert_eq!(backend.document_count("docs").await.expect("count"), 1);
        let stored = backend
            .get_document("docs", "d1")
            .await
            .expect("lookup")
            .expect("document present");
        assert_eq!(stored.content, "second");
    }

    #[tokio::test]
    async fn create_index_drops_existing_documents() {
        let backend = MemorySearchBackend::new();
        backend
            .store_documents("docs", vec![doc("d1", "old")])
            .await
            .expect("upsert");

        let mut metadata = Map::new();
        metadata.insert("url".into(), json!("https://example.com"));
        metadata.insert("pages".into(), json!(4));
        backend
            .create_index("docs", &metadata, 1536)
            .await
            .expect("recreate");

        assert_eq!(backend.document_count("docs").await.expect("count"), 0);
        assert_eq!(backend.dimension("docs").await, Some(1536));
    }
}
