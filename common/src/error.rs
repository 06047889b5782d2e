use async_openai::error::OpenAIError;
use chunking::ChunkingError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Configuration error: {0}")]
    Validation(String),
    #[error("Extraction error: {0}")]
    Extraction(String),
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Indexing error: {0}")]
    Indexing(String),
    #[error("Stage timed out after {0}s")]
    Timeout(u64),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Processing error: {0}")]
    Processing(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Configuration errors are fatal to pipeline startup; everything else is
    /// local to the record that triggered it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
