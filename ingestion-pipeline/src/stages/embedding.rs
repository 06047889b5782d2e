use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError,
    record::Record,
    utils::embedding::{split_for_embedding, EmbeddingProvider},
};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{debug, instrument};

use super::{Stage, StageKind};

/// Maps every chunk to a fixed-dimension vector. Chunks longer than the
/// provider's character budget are split first and the split replaces the
/// original entry in `record.chunks`, so every sub-chunk is embedded and the
/// chunk/embedding alignment invariant holds.
pub struct EmbeddingStage {
    provider: Arc<EmbeddingProvider>,
    char_budget: usize,
    retry_attempts: usize,
    retry_base_ms: u64,
}

impl EmbeddingStage {
    pub fn new(
        provider: Arc<EmbeddingProvider>,
        char_budget: usize,
        retry_attempts: usize,
        retry_base_ms: u64,
    ) -> Self {
        Self {
            provider,
            char_budget,
            retry_attempts,
            retry_base_ms,
        }
    }

    async fn embed_with_retry(&self, chunks: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.retry_base_ms)
            .map(jitter)
            .take(self.retry_attempts);

        Retry::spawn(retry_strategy, || self.provider.embed_batch(chunks.clone()))
            .await
            .map_err(|e| AppError::Embedding(e.to_string()))
    }
}

#[async_trait]
impl Stage for EmbeddingStage {
    fn kind(&self) -> StageKind {
        StageKind::Embedding
    }

    #[instrument(level = "trace", skip_all)]
    async fn process(&self, mut record: Record) -> Result<Record, AppError> {
        if record.chunks.is_empty() {
            return Err(AppError::Embedding(format!(
                "record '{}' reached embedding without chunks",
                record.display_name()
            )));
        }

        let mut sized_chunks = Vec::with_capacity(record.chunks.len());
        for chunk in record.chunks.drain(..) {
            sized_chunks.extend(split_for_embedding(&chunk, self.char_budget));
        }

        let embeddings = self.embed_with_retry(sized_chunks.clone()).await?;

        if embeddings.len() != sized_chunks.len() {
            return Err(AppError::Embedding(format!(
                "backend '{}' returned {} vectors for {} chunks",
                self.provider.backend_label(),
                embeddings.len(),
                sized_chunks.len()
            )));
        }

        let expected_dim = self.provider.dimension();
        if let Some(vector) = embeddings.iter().find(|v| v.len() != expected_dim) {
            return Err(AppError::Embedding(format!(
                "backend '{}' produced a {}-dimension vector, expected {}",
                self.provider.backend_label(),
                vector.len(),
                expected_dim
            )));
        }

        debug!(
            record = %record.display_name(),
            backend = self.provider.backend_label(),
            chunk_count = sized_chunks.len(),
            dimension = expected_dim,
            "chunks embedded"
        );

        record.chunks = sized_chunks;
        record.embeddings = embeddings;
        record.ensure_aligned()?;
        Ok(record)
    }
}
