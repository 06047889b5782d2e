//! Shared sentence segmentation used by several strategies.

/// Splits text into sentences on terminal punctuation (`.`, `!`, `?`)
/// followed by whitespace or end of input. Punctuation stays attached to the
/// sentence; surrounding whitespace is trimmed.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut buffer = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        buffer.push(c);
        if is_terminal(c) {
            let at_boundary = chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                flush(&mut buffer, &mut sentences);
            }
        }
    }
    flush(&mut buffer, &mut sentences);

    sentences
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn flush(buffer: &mut String, sentences: &mut Vec<String>) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    buffer.clear();
}
