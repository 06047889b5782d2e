use crate::{require_input, Chunker, ChunkingError};

/// Consecutive windows of `max_tokens` whitespace-separated words with no
/// overlap; the last window may be shorter.
pub struct SpecificTokenChunker {
    max_tokens: usize,
}

impl SpecificTokenChunker {
    pub fn new(max_tokens: usize) -> Result<Self, ChunkingError> {
        if max_tokens == 0 {
            return Err(ChunkingError::InvalidConfig(
                "max_tokens must be greater than zero".into(),
            ));
        }
        Ok(Self { max_tokens })
    }
}

impl Chunker for SpecificTokenChunker {
    fn name(&self) -> &'static str {
        "specific_token"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let words: Vec<&str> = text.split_whitespace().collect();
        Ok(words
            .chunks(self.max_tokens)
            .map(|window| window.join(" "))
            .collect())
    }
}

/// Windows of `max_tokens` words advancing by
/// `step = max(max_tokens - overlap_tokens, 1)`, so consecutive chunks share
/// `overlap_tokens` words of context. If `overlap_tokens >= max_tokens` the
/// step floors to 1 to keep the scan terminating.
pub struct OverlappingTokenChunker {
    max_tokens: usize,
    step: usize,
}

impl OverlappingTokenChunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self, ChunkingError> {
        if max_tokens == 0 {
            return Err(ChunkingError::InvalidConfig(
                "max_tokens must be greater than zero".into(),
            ));
        }
        let step = max_tokens.saturating_sub(overlap_tokens).max(1);
        Ok(Self { max_tokens, step })
    }
}

impl Chunker for OverlappingTokenChunker {
    fn name(&self) -> &'static str {
        "overlapping_token"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.max_tokens).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += self.step;
        }

        Ok(chunks)
    }
}
