//! Reading source documents from disk.
//!
//! Text extraction from binary formats (PDF and friends) lives outside this crate:
//! callers plug it in through the [`TextExtractor`] trait. [`PlainTextExtractor`]
//! covers UTF-8 text files.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RagError, Result};

/// Turns the raw bytes of a file into plain text.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles `path`.
    fn accepts(&self, path: &Path) -> bool;

    /// Extract the text content of `bytes`, read from `path`.
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String>;
}

/// Extracts UTF-8 text from files with a known text extension.
#[derive(Debug, Clone)]
pub struct PlainTextExtractor {
    extensions: Vec<String>,
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::with_extensions(["txt", "md", "markdown", "rst", "csv", "json", "html", "log"])
    }
}

impl PlainTextExtractor {
    /// Accept files whose extension (case-insensitive) is one of `extensions`.
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions.into_iter().map(|e| e.as_ref().to_ascii_lowercase()).collect(),
        }
    }
}

impl TextExtractor for PlainTextExtractor {
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| RagError::ExtractionError {
            path: path.to_path_buf(),
            message: format!("not valid UTF-8: {e}"),
        })
    }
}

/// Read every extractable file under `root` as `(path, text)` pairs in sorted order.
pub(crate) async fn read_documents(
    root: &Path,
    extractors: &[Arc<dyn TextExtractor>],
) -> Result<Vec<(String, String)>> {
    if !root.is_dir() {
        return Err(RagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let files = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let Some(extractor) = extractors.iter().find(|x| x.accepts(&path)) else {
            debug!(path = %path.display(), "no extractor for file; skipping");
            continue;
        };
        let bytes = tokio::fs::read(&path).await?;
        let text = extractor.extract(&path, &bytes)?;
        documents.push((path.display().to_string(), text));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn plain_text_matches_extensions_case_insensitively() {
        let extractor = PlainTextExtractor::default();
        assert!(extractor.accepts(Path::new("notes/README.MD")));
        assert!(extractor.accepts(Path::new("a.txt")));
        assert!(!extractor.accepts(Path::new("scan.pdf")));
        assert!(!extractor.accepts(Path::new("Makefile")));
    }

    #[test]
    fn invalid_utf8_is_an_extraction_error() {
        let err = PlainTextExtractor::default()
            .extract(Path::new("bad.txt"), &[0xff, 0xfe, 0x00])
            .unwrap_err();
        assert!(matches!(err, RagError::ExtractionError { .. }));
    }

    #[tokio::test]
    async fn reads_nested_files_in_sorted_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("b/two.txt"), "two").unwrap();
        fs::write(root.join("a.txt"), "one").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();

        let extractors: Vec<Arc<dyn TextExtractor>> = vec![Arc::new(PlainTextExtractor::default())];
        let docs = read_documents(root, &extractors).await.unwrap();

        let texts: Vec<&str> = docs.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(docs[1].0.ends_with("two.txt"));
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = read_documents(&temp.path().join("absent"), &[]).await.unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
    }
}
