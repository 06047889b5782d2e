use crate::{require_input, sentence::split_sentences, Chunker, ChunkingError};

/// Sentences accumulate into a buffer; once the buffer's character length
/// exceeds `max_len` it is flushed as one chunk. Grouping is by length
/// budget, not embedding similarity.
pub struct SemanticChunker {
    max_len: usize,
}

impl SemanticChunker {
    pub fn new(max_len: usize) -> Result<Self, ChunkingError> {
        if max_len == 0 {
            return Err(ChunkingError::InvalidConfig(
                "max_len must be greater than zero".into(),
            ));
        }
        Ok(Self { max_len })
    }
}

impl Chunker for SemanticChunker {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;
        Ok(accumulate_sentences(split_sentences(text), self.max_len))
    }
}

/// Shared flush policy for the semantic and content-aware strategies.
pub(crate) fn accumulate_sentences(sentences: Vec<String>, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for sentence in sentences {
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(&sentence);
        if buffer.chars().count() > max_len {
            chunks.push(std::mem::take(&mut buffer));
        }
    }
    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_once_budget_is_exceeded() {
        let chunker = SemanticChunker::new(30).expect("chunker");
        let chunks = chunker
            .chunk("Short one. Another short one. A third sentence arrives here. Tail.")
            .expect("chunks");
        // The buffer is flushed after the sentence that pushes it past the
        // budget, so the third sentence still lands in the first chunk.
        assert_eq!(
            chunks,
            vec![
                "Short one. Another short one. A third sentence arrives here.",
                "Tail."
            ]
        );
    }

    #[test]
    fn single_short_sentence_is_one_chunk() {
        let chunker = SemanticChunker::new(1_000).expect("chunker");
        let chunks = chunker.chunk("Just one sentence.").expect("chunks");
        assert_eq!(chunks, vec!["Just one sentence."]);
    }
}
