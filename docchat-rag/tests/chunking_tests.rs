//! Property tests for chunk size, overlap and coverage.

use docchat_rag::{Chunker, FixedSizeChunker, RecursiveChunker};
use proptest::prelude::*;

/// Text mixing words, line breaks, paragraph breaks and multibyte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-z]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
            1 => "[αβγé]{1,3}",
        ],
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

/// Window size and a strictly smaller overlap.
fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn head(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn tail(s: &str, n: usize) -> String {
    let len = char_len(s);
    s.chars().skip(len - n).collect()
}

fn drop_head(s: &str, n: usize) -> String {
    s.chars().skip(n).collect()
}

fn check_chunks(text: &str, chunks: &[String], size: usize, overlap: usize) -> Result<(), TestCaseError> {
    if text.is_empty() {
        prop_assert!(chunks.is_empty());
        return Ok(());
    }
    prop_assert!(!chunks.is_empty());

    for chunk in chunks {
        prop_assert!(!chunk.is_empty());
        prop_assert!(char_len(chunk) <= size, "chunk longer than {size}: {chunk:?}");
    }

    for pair in chunks.windows(2) {
        prop_assert!(char_len(&pair[0]) > overlap);
        prop_assert_eq!(tail(&pair[0], overlap), head(&pair[1], overlap));
    }

    let mut rebuilt = chunks[0].clone();
    for chunk in &chunks[1..] {
        rebuilt.push_str(&drop_head(chunk, overlap));
    }
    prop_assert_eq!(rebuilt, text);
    Ok(())
}

/// **Property: chunks are bounded, overlap exactly, and cover the text without gaps.**
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn fixed_chunks_cover_text(text in arb_text(), (size, overlap) in arb_window()) {
            let chunks = FixedSizeChunker::new(size, overlap).unwrap().split(&text);
            check_chunks(&text, &chunks, size, overlap)?;

            // Every chunk but the last is exactly `size` characters.
            for chunk in &chunks[..chunks.len().saturating_sub(1)] {
                prop_assert_eq!(char_len(chunk), size);
            }
        }

        #[test]
        fn recursive_chunks_cover_text(text in arb_text(), (size, overlap) in arb_window()) {
            let chunks = RecursiveChunker::new(size, overlap).unwrap().split(&text);
            check_chunks(&text, &chunks, size, overlap)?;
        }

        #[test]
        fn short_text_is_one_chunk(text in "[a-z ]{1,20}") {
            let chunks = FixedSizeChunker::new(20, 5).unwrap().split(&text);
            prop_assert_eq!(chunks, vec![text]);
        }
    }
}
