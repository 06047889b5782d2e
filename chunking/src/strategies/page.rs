use crate::{require_input, Chunker, ChunkingError};

/// Splits on configured literal page-separator tokens, applied in sequence
/// across all configured tokens.
pub struct PageChunker {
    tokens: Vec<String>,
}

impl PageChunker {
    pub fn new(tokens: Vec<String>) -> Result<Self, ChunkingError> {
        if tokens.is_empty() {
            return Err(ChunkingError::InvalidConfig(
                "page chunking requires at least one separator token".into(),
            ));
        }
        Ok(Self { tokens })
    }
}

impl Chunker for PageChunker {
    fn name(&self) -> &'static str {
        "page"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let mut pages = vec![text.to_string()];
        for token in &self.tokens {
            pages = pages
                .iter()
                .flat_map(|page| page.split(token.as_str()))
                .map(str::to_string)
                .collect();
        }

        Ok(pages
            .iter()
            .map(|page| page.trim())
            .filter(|page| !page.is_empty())
            .map(str::to_string)
            .collect())
    }
}
