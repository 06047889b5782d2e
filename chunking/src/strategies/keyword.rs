use crate::{require_input, Chunker, ChunkingError};

/// Line-oriented chunking keyed on configured keywords: a new chunk starts at
/// every keyword-bearing line and accumulates the following non-keyword lines
/// until the next keyword line. Lines before the first keyword line are
/// dropped so every emitted chunk begins with a keyword-bearing line.
pub struct KeywordChunker {
    keywords: Vec<String>,
}

impl KeywordChunker {
    pub fn new(keywords: Vec<String>) -> Result<Self, ChunkingError> {
        if keywords.is_empty() {
            return Err(ChunkingError::InvalidConfig(
                "keyword chunking requires at least one keyword".into(),
            ));
        }
        Ok(Self { keywords })
    }

    fn has_keyword(&self, line: &str) -> bool {
        self.keywords.iter().any(|kw| line.contains(kw.as_str()))
    }
}

impl Chunker for KeywordChunker {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let mut chunks = Vec::new();
        let mut current: Option<Vec<&str>> = None;

        for line in text.lines() {
            if self.has_keyword(line) {
                if let Some(lines) = current.take() {
                    chunks.push(lines.join("\n"));
                }
                current = Some(vec![line]);
            } else if let Some(lines) = current.as_mut() {
                lines.push(line);
            }
        }
        if let Some(lines) = current {
            chunks.push(lines.join("\n"));
        }

        Ok(chunks)
    }
}
