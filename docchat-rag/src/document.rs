//! Data types for passages, index entries, and search results.

use serde::{Deserialize, Serialize};

/// A chunk of source text plus the metadata needed to cite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// Unique identifier within an index build.
    pub id: String,
    /// The chunk content.
    pub text: String,
    /// The originating document, used verbatim as the citation label.
    pub source: String,
    /// 0-based position of this chunk within its source document.
    pub sequence: usize,
}

impl Passage {
    /// Create a passage with a freshly generated identifier.
    pub fn new(source: impl Into<String>, sequence: usize, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            source: source.into(),
            sequence,
        }
    }
}

/// A [`Passage`] paired with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorEntry {
    /// The indexed passage.
    pub passage: Passage,
    /// The embedding of the passage text.
    pub vector: Vec<f32>,
}

/// A retrieved [`Passage`] with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved passage.
    pub passage: Passage,
    /// Cosine similarity (higher is more relevant).
    pub score: f32,
    /// 0-based position among the results of one query.
    pub rank: usize,
}

impl SearchResult {
    /// A shortened copy of the passage text for display.
    pub fn preview(&self, max_chars: usize) -> String {
        preview(&self.passage.text, max_chars)
    }
}

/// Return at most `max_chars` characters of `text`, cut on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Shorten `text` to `max_chars` characters, appending `...` when anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let head = truncate_chars(text, max_chars);
    if head.len() < text.len() { format!("{head}...") } else { head.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_multibyte_characters() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn preview_marks_truncation() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn passages_get_distinct_ids() {
        let a = Passage::new("a.txt", 0, "x");
        let b = Passage::new("a.txt", 0, "x");
        assert_ne!(a.id, b.id);
    }
}
