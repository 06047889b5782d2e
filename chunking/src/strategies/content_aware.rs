use crate::{require_input, strategies::semantic::accumulate_sentences, Chunker, ChunkingError};

/// Simplified always-on variant of the semantic strategy: `". "`-delimited
/// sentence accumulation with a fixed 200-character flush threshold.
pub struct ContentAwareChunker;

const FLUSH_THRESHOLD: usize = 200;

impl Chunker for ContentAwareChunker {
    fn name(&self) -> &'static str {
        "content_aware"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let sentences: Vec<String> = text
            .split(". ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(accumulate_sentences(sentences, FLUSH_THRESHOLD))
    }
}
