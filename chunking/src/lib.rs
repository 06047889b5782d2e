//! Text chunking strategies for the ingestion pipeline.
//!
//! Every strategy implements [`Chunker`]: a pure, deterministic function from
//! text to an ordered list of chunks. Strategies are selected by name (from
//! pipeline configuration or the `CHUNKING_STRATEGY` environment variable)
//! and validated when the pipeline is built, not per call.

use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

mod sentence;
mod strategies;

pub use sentence::split_sentences;
pub use strategies::{
    content_aware::ContentAwareChunker, entity::EntityChunker, hierarchical::HierarchicalChunker,
    keyword::KeywordChunker, page::PageChunker, paragraph::ParagraphChunker,
    semantic::SemanticChunker, sentence::SentenceChunker, token::OverlappingTokenChunker,
    token::SpecificTokenChunker, topic::TopicChunker,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunking received empty or whitespace-only input")]
    EmptyInput,
    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),
}

/// A chunking strategy. Implementations must be deterministic for identical
/// input and configuration, and must reject empty or whitespace-only input
/// with [`ChunkingError::EmptyInput`].
pub trait Chunker: Send + Sync {
    fn name(&self) -> &'static str;

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError>;
}

/// Guard shared by every strategy: empty input is a chunking error, never a
/// silent empty result.
pub(crate) fn require_input(text: &str) -> Result<(), ChunkingError> {
    if text.trim().is_empty() {
        return Err(ChunkingError::EmptyInput);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    Paragraph,
    Page,
    Sentence,
    SpecificToken,
    OverlappingToken,
    Entity,
    Semantic,
    ContentAware,
    Topic,
    Keyword,
    Hierarchical,
}

impl FromStr for ChunkingStrategy {
    type Err = ChunkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paragraph" => Ok(Self::Paragraph),
            "page" => Ok(Self::Page),
            "sentence" => Ok(Self::Sentence),
            "specific_token" | "token" | "fixed_token" => Ok(Self::SpecificToken),
            "overlapping_token" | "overlap" => Ok(Self::OverlappingToken),
            "entity" => Ok(Self::Entity),
            "semantic" => Ok(Self::Semantic),
            "content_aware" | "content-aware" => Ok(Self::ContentAware),
            "topic" | "lda" => Ok(Self::Topic),
            "keyword" => Ok(Self::Keyword),
            "hierarchical" => Ok(Self::Hierarchical),
            other => Err(ChunkingError::InvalidConfig(format!(
                "unknown chunking strategy '{other}'"
            ))),
        }
    }
}

impl ChunkingStrategy {
    /// Resolves the strategy into a chunker, validating `params` up front so
    /// configuration errors surface at pipeline-build time.
    pub fn build(self, params: &Map<String, Value>) -> Result<Box<dyn Chunker>, ChunkingError> {
        match self {
            Self::Paragraph => Ok(Box::new(ParagraphChunker)),
            Self::Sentence => Ok(Box::new(SentenceChunker)),
            Self::ContentAware => Ok(Box::new(ContentAwareChunker)),
            Self::Entity => Ok(Box::new(EntityChunker)),
            Self::Page => {
                let tokens = string_list(params, "page_tokens")?
                    .unwrap_or_else(|| vec!["\u{000C}".to_string()]);
                PageChunker::new(tokens).map(|c| Box::new(c) as Box<dyn Chunker>)
            }
            Self::SpecificToken => {
                let max_tokens = usize_param(params, "max_tokens")?.unwrap_or(256);
                SpecificTokenChunker::new(max_tokens).map(|c| Box::new(c) as Box<dyn Chunker>)
            }
            Self::OverlappingToken => {
                let max_tokens = usize_param(params, "max_tokens")?.unwrap_or(256);
                let overlap_tokens = usize_param(params, "overlap_tokens")?.unwrap_or(32);
                OverlappingTokenChunker::new(max_tokens, overlap_tokens)
                    .map(|c| Box::new(c) as Box<dyn Chunker>)
            }
            Self::Semantic => {
                let max_len = usize_param(params, "max_len")?.unwrap_or(1_000);
                SemanticChunker::new(max_len).map(|c| Box::new(c) as Box<dyn Chunker>)
            }
            Self::Topic => {
                let num_topics = usize_param(params, "num_topics")?.unwrap_or(3);
                let seed = usize_param(params, "seed")?.unwrap_or(42) as u64;
                TopicChunker::new(num_topics, seed).map(|c| Box::new(c) as Box<dyn Chunker>)
            }
            Self::Keyword => {
                let keywords = string_list(params, "keywords")?.ok_or_else(|| {
                    ChunkingError::InvalidConfig(
                        "keyword chunking requires a 'keywords' list".into(),
                    )
                })?;
                KeywordChunker::new(keywords).map(|c| Box::new(c) as Box<dyn Chunker>)
            }
            Self::Hierarchical => {
                let keywords = string_list(params, "keywords")?.ok_or_else(|| {
                    ChunkingError::InvalidConfig(
                        "hierarchical chunking requires a 'keywords' list".into(),
                    )
                })?;
                HierarchicalChunker::new(keywords).map(|c| Box::new(c) as Box<dyn Chunker>)
            }
        }
    }
}

fn usize_param(params: &Map<String, Value>, key: &str) -> Result<Option<usize>, ChunkingError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| Some(v as usize))
            .ok_or_else(|| non_negative_error(key)),
        Some(Value::String(s)) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| non_negative_error(key)),
        Some(_) => Err(non_negative_error(key)),
    }
}

fn non_negative_error(key: &str) -> ChunkingError {
    ChunkingError::InvalidConfig(format!("'{key}' must be a non-negative integer"))
}

fn string_list(
    params: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ChunkingError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) if !s.is_empty() => out.push(s.to_string()),
                    _ => {
                        return Err(ChunkingError::InvalidConfig(format!(
                            "'{key}' must be a list of non-empty strings"
                        )))
                    }
                }
            }
            Ok(Some(out))
        }
        // Comma-separated form, as supplied through environment variables.
        Some(Value::String(s)) => {
            let out: Vec<String> = s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();
            Ok(Some(out))
        }
        Some(_) => Err(ChunkingError::InvalidConfig(format!(
            "'{key}' must be a list of strings"
        ))),
    }
}
