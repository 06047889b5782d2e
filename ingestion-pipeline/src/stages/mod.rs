//! The stage contract every pipeline step implements.

mod chunking;
mod embedding;
mod extraction;
mod indexing;

pub use self::chunking::ChunkingStage;
pub use self::embedding::EmbeddingStage;
pub use self::extraction::ExtractionStage;
pub use self::indexing::IndexingStage;

use async_trait::async_trait;
use common::{error::AppError, record::Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    TextExtraction,
    Chunking,
    Embedding,
    Indexing,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextExtraction => "text_extraction",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Indexing => "indexing",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pipeline step. `process` consumes the record and returns the mutated
/// record on success. Ownership transfers stage to stage, so there is a
/// single writer at any time. On failure the orchestrator drops the record
/// and moves on; stages never propagate errors across records.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn process(&self, record: Record) -> Result<Record, AppError>;
}
