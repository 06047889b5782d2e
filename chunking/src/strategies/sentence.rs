use crate::{require_input, sentence::split_sentences, Chunker, ChunkingError};

/// One chunk per detected sentence.
pub struct SentenceChunker;

impl Chunker for SentenceChunker {
    fn name(&self) -> &'static str {
        "sentence"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;
        Ok(split_sentences(text))
    }
}
