//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: fixed character windows with a configurable overlap
//! - [`RecursiveChunker`]: windows that prefer to end on paragraph, line, then word breaks
//!
//! Both count Unicode scalar values, never cut inside a code point, and share exactly
//! `chunk_overlap` characters between consecutive chunks, so a document is recovered by
//! concatenating its chunks with the first `chunk_overlap` characters of every chunk
//! after the first removed.

use crate::config::validate_chunking;
use crate::error::Result;

/// A strategy for splitting raw text into overlapping passages.
pub trait Chunker: Send + Sync {
    /// Split `text` into ordered chunks.
    ///
    /// Returns an empty `Vec` for empty text and a single chunk for text no longer
    /// than the chunk size.
    fn split(&self, text: &str) -> Vec<String>;

    /// Maximum characters per chunk.
    fn chunk_size(&self) -> usize;

    /// Characters shared between consecutive chunks.
    fn chunk_overlap(&self) -> usize;
}

/// Split `text` with a [`FixedSizeChunker`].
///
/// # Errors
///
/// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if `chunk_size == 0`
/// or `overlap >= chunk_size`.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(FixedSizeChunker::new(chunk_size, overlap)?.split(text))
}

/// Byte offsets of every character boundary in `text`, including `text.len()`.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Windows advance by `chunk_size - chunk_overlap` characters. The final window ends
/// at the end of the text, so it may be shorter than `chunk_size`.
///
/// # Example
///
/// ```rust
/// use docchat_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1).unwrap();
/// assert_eq!(chunker.split("abcdefg"), vec!["abcd", "defg"]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if `chunk_size == 0`
    /// or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let bounds = char_boundaries(text);
        let len = bounds.len() - 1;
        if len == 0 {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(len);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == len {
                break;
            }
            start += step;
        }

        chunks
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

/// Splits text into windows that prefer natural break points.
///
/// Each window ends, in order of preference, right after a paragraph separator
/// (`\n\n`), a line break, or any other whitespace found in the back half of the window.
/// A single unbroken token longer than the window is cut hard at `chunk_size`. The next
/// window starts `chunk_overlap` characters before the previous end; a break is only
/// accepted past `start + chunk_overlap`, so every window starts strictly after the one
/// before it.
///
/// # Example
///
/// ```rust
/// use docchat_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(12, 0).unwrap();
/// assert_eq!(chunker.split("alpha beta gamma"), vec!["alpha beta ", "gamma"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if `chunk_size == 0`
    /// or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

/// Find the best window end in `floor..=ceiling`, scanning backwards from `ceiling`.
///
/// An end `e` means the chunk is `chars[start..e]`, so the separator stays attached to
/// the preceding chunk.
fn find_break(chars: &[char], floor: usize, ceiling: usize) -> Option<usize> {
    let candidates = || (floor.max(1)..=ceiling).rev();

    let paragraph = candidates().find(|&e| e >= 2 && chars[e - 2] == '\n' && chars[e - 1] == '\n');
    if paragraph.is_some() {
        return paragraph;
    }
    let line = candidates().find(|&e| chars[e - 1] == '\n');
    if line.is_some() {
        return line;
    }
    candidates().find(|&e| chars[e - 1].is_whitespace())
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }

        let bounds = char_boundaries(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let hard_end = (start + self.chunk_size).min(len);
            if hard_end == len {
                chunks.push(text[bounds[start]..bounds[len]].to_string());
                break;
            }

            let floor = (start + self.chunk_overlap + 1).max(start + self.chunk_size / 2);
            let end = find_break(&chars, floor, hard_end).unwrap_or(hard_end);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            start = end - self.chunk_overlap;
        }

        chunks
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split("", 10, 2).unwrap().is_empty());
        assert!(RecursiveChunker::new(10, 2).unwrap().split("").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split("hello", 10, 2).unwrap(), vec!["hello"]);
        assert_eq!(split("0123456789", 10, 2).unwrap(), vec!["0123456789"]);
    }

    #[test]
    fn invalid_windows_are_config_errors() {
        assert!(matches!(split("abc", 0, 0), Err(RagError::ConfigError(_))));
        assert!(matches!(split("abc", 5, 5), Err(RagError::ConfigError(_))));
        assert!(matches!(RecursiveChunker::new(5, 7), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn fixed_windows_step_by_size_minus_overlap() {
        let chunks = split("abcdefghij", 4, 2).unwrap();
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn last_window_ends_at_text_end() {
        // 2500 characters, 1000/200: windows start at 0, 800 and 1600.
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = split(&text, 1000, 200).unwrap();
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![1000, 1000, 900]);
        assert_eq!(&chunks[0][800..], &chunks[1][..200]);
        assert_eq!(&chunks[1][800..], &chunks[2][..200]);
    }

    #[test]
    fn multibyte_text_is_split_on_characters() {
        let chunks = split("ααββγγ", 4, 1).unwrap();
        assert_eq!(chunks, vec!["ααββ", "βγγ"]);
    }

    #[test]
    fn recursive_prefers_paragraph_breaks() {
        let text = "first para here\n\nsecond para text";
        let chunks = RecursiveChunker::new(24, 0).unwrap().split(text);
        assert_eq!(chunks[0], "first para here\n\n");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn recursive_hard_cuts_unbroken_tokens() {
        let text = "x".repeat(25);
        let chunks = RecursiveChunker::new(10, 3).unwrap().split(&text);
        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks.len(), 4);
    }
}
