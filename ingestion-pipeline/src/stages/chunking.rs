use async_trait::async_trait;
use chunking::Chunker;
use common::{error::AppError, record::Record};
use tracing::{debug, instrument};

use super::{Stage, StageKind};

/// Splits extracted text into ordered chunks with the configured strategy.
pub struct ChunkingStage {
    chunker: Box<dyn Chunker>,
}

impl ChunkingStage {
    pub fn new(chunker: Box<dyn Chunker>) -> Self {
        Self { chunker }
    }
}

#[async_trait]
impl Stage for ChunkingStage {
    fn kind(&self) -> StageKind {
        StageKind::Chunking
    }

    #[instrument(level = "trace", skip_all)]
    async fn process(&self, mut record: Record) -> Result<Record, AppError> {
        let text = record.text.as_deref().ok_or_else(|| {
            AppError::Processing(format!(
                "record '{}' reached chunking without extracted text",
                record.display_name()
            ))
        })?;

        let chunks = self.chunker.chunk(text)?;

        debug!(
            record = %record.display_name(),
            strategy = self.chunker.name(),
            chunk_count = chunks.len(),
            "text chunked"
        );

        record.chunks = chunks;
        Ok(record)
    }
}
