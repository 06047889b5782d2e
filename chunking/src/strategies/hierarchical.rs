use crate::{require_input, Chunker, ChunkingError};

/// Section-heading chunking: for each configured keyword present in the text,
/// everything after the keyword's first occurrence becomes one chunk. Chunks
/// from different keywords may overlap; they are not merged.
pub struct HierarchicalChunker {
    keywords: Vec<String>,
}

impl HierarchicalChunker {
    pub fn new(keywords: Vec<String>) -> Result<Self, ChunkingError> {
        if keywords.is_empty() {
            return Err(ChunkingError::InvalidConfig(
                "hierarchical chunking requires at least one section keyword".into(),
            ));
        }
        Ok(Self { keywords })
    }
}

impl Chunker for HierarchicalChunker {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let mut chunks = Vec::new();
        for keyword in &self.keywords {
            if let Some(idx) = text.find(keyword.as_str()) {
                let after = text[idx + keyword.len()..].trim();
                if !after.is_empty() {
                    chunks.push(after.to_string());
                }
            }
        }

        Ok(chunks)
    }
}
