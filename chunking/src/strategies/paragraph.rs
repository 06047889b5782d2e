use crate::{require_input, Chunker, ChunkingError};

/// Sentence-boundary segmentation with paragraph flushing: characters
/// accumulate into a buffer that is flushed on a line break or on terminal
/// punctuation followed by whitespace.
pub struct ParagraphChunker;

impl Chunker for ParagraphChunker {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\n' {
                flush(&mut buffer, &mut chunks);
                continue;
            }
            buffer.push(c);
            if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
                flush(&mut buffer, &mut chunks);
            }
        }
        flush(&mut buffer, &mut chunks);

        Ok(chunks)
    }
}

fn flush(buffer: &mut String, chunks: &mut Vec<String>) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_on_terminal_punctuation() {
        let chunks = ParagraphChunker
            .chunk("One sentence here. Another follows.")
            .expect("chunks");
        assert_eq!(chunks, vec!["One sentence here.", "Another follows."]);
    }

    #[test]
    fn flushes_on_line_breaks() {
        let chunks = ParagraphChunker
            .chunk("a heading without punctuation\nbody text follows")
            .expect("chunks");
        assert_eq!(
            chunks,
            vec!["a heading without punctuation", "body text follows"]
        );
    }
}
