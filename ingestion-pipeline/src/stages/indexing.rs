use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError, field_mapping::FieldMapping, record::Record,
    search_document::SearchDocument,
};
use tracing::{debug, instrument};

use super::{Stage, StageKind};
use crate::search::SearchBackend;

/// Persists one search document per `(chunk, embedding)` pair. Mapped fields
/// are resolved once per record and copied unchanged onto every
/// chunk-document; each document gets a fresh unique id.
pub struct IndexingStage {
    backend: Arc<dyn SearchBackend>,
    index: String,
    mapping: FieldMapping,
    expected_dimension: usize,
}

impl IndexingStage {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index: String,
        mapping: FieldMapping,
        expected_dimension: usize,
    ) -> Self {
        Self {
            backend,
            index,
            mapping,
            expected_dimension,
        }
    }
}

#[async_trait]
impl Stage for IndexingStage {
    fn kind(&self) -> StageKind {
        StageKind::Indexing
    }

    #[instrument(level = "trace", skip_all)]
    async fn process(&self, record: Record) -> Result<Record, AppError> {
        record.ensure_aligned()?;
        if record.chunks.is_empty() {
            return Err(AppError::Indexing(format!(
                "record '{}' reached indexing without chunks",
                record.display_name()
            )));
        }

        let mapped = self.mapping.project(&record);

        let mut documents = Vec::with_capacity(record.chunks.len());
        for (chunk, embedding) in record.chunks.iter().zip(&record.embeddings) {
            if embedding.len() != self.expected_dimension {
                return Err(AppError::Indexing(format!(
                    "embedding dimension {} does not match index schema dimension {}",
                    embedding.len(),
                    self.expected_dimension
                )));
            }
            documents.push(SearchDocument::new(
                chunk.clone(),
                embedding.clone(),
                mapped.clone(),
            ));
        }

        let document_count = documents.len();
        self.backend.store_documents(&self.index, documents).await?;

        debug!(
            record = %record.display_name(),
            backend = self.backend.name(),
            index = %self.index,
            document_count,
            "chunk documents upserted"
        );

        Ok(record)
    }
}
