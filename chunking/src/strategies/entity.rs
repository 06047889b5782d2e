use crate::{require_input, Chunker, ChunkingError};

/// One chunk per named-entity span. Spans are detected with a deterministic
/// rule: maximal runs of capitalized words (leading punctuation stripped)
/// form one span each, in document order.
pub struct EntityChunker;

impl Chunker for EntityChunker {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkingError> {
        require_input(text)?;

        let mut spans = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for raw in text.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if is_capitalized(word) {
                current.push(word.to_string());
            } else if !current.is_empty() {
                spans.push(current.join(" "));
                current.clear();
            }
        }
        if !current.is_empty() {
            spans.push(current.join(" "));
        }

        Ok(spans)
    }
}

fn is_capitalized(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| c.is_alphanumeric()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_consecutive_capitalized_words() {
        let chunks = EntityChunker
            .chunk("yesterday Ada Lovelace met with Charles Babbage in london")
            .expect("chunks");
        assert_eq!(chunks, vec!["Ada Lovelace", "Charles Babbage"]);
    }

    #[test]
    fn strips_edge_punctuation() {
        let chunks = EntityChunker
            .chunk("we visited Paris, then flew home")
            .expect("chunks");
        assert_eq!(chunks, vec!["Paris"]);
    }

    #[test]
    fn no_entities_yields_no_chunks() {
        let chunks = EntityChunker
            .chunk("nothing here is capitalized at all")
            .expect("chunks");
        assert!(chunks.is_empty());
    }
}
