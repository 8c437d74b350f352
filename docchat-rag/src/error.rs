//! Error types for the `docchat-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting, indexing, or retrieving documents.
///
/// Generation failures travel inside a [`Generation`](crate::generation::Generation)
/// instead; see [`GenerationError`](crate::generation::GenerationError).
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid parameters. Raised before any work is done.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An index build was attempted with no passages.
    #[error("Cannot build an index from an empty corpus; ingest documents first")]
    EmptyCorpus,

    /// No index is resident and no persisted artifact exists.
    #[error("Index not found at {}", path.display())]
    IndexNotFound {
        /// The artifact path that was probed.
        path: PathBuf,
    },

    /// The persisted artifact could not be decoded or does not match the embedder.
    #[error("Index at {} is corrupt: {message}", path.display())]
    IndexCorrupt {
        /// The artifact path that was read.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A source file could not be turned into text.
    #[error("Extraction error ({}): {message}", path.display())]
    ExtractionError {
        /// The file that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
