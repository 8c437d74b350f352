//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::index::is_finite;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async interface.
/// Embeddings must be deterministic for a fixed model version: rebuilding an index from
/// the same passages has to reproduce the same query results.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support native
/// batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, one per input, in order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model, recorded in persisted indexes.
    fn model_id(&self) -> &str;
}

/// Verify that a batch response lines up with its request.
///
/// A short batch, a vector of the wrong size, and a NaN or infinite component are all
/// errors. `serde_json` cannot persist non-finite floats.
pub(crate) fn check_batch(
    provider: &str,
    expected_len: usize,
    dimensions: usize,
    vectors: &[Vec<f32>],
) -> Result<()> {
    if vectors.len() != expected_len {
        return Err(RagError::embedding(
            provider,
            format!("expected {expected_len} embeddings, got {}", vectors.len()),
        ));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(RagError::embedding(
            provider,
            format!("expected {dimensions}-dimensional embeddings, got {}", bad.len()),
        ));
    }
    if let Some(position) = vectors.iter().position(|v| !is_finite(v)) {
        return Err(RagError::embedding(
            provider,
            format!("embedding {position} has a non-finite component"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_batch_rejects_short_mis_sized_and_non_finite_batches() {
        let ok = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(check_batch("p", 2, 2, &ok).is_ok());
        assert!(check_batch("p", 3, 2, &ok).is_err());
        assert!(check_batch("p", 2, 3, &ok).is_err());

        let nan = vec![vec![1.0, 0.0], vec![f32::NAN, 1.0]];
        let err = check_batch("p", 2, 2, &nan).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { ref message, .. } if message.contains("embedding 1")));

        let inf = vec![vec![f32::NEG_INFINITY, 0.0]];
        assert!(matches!(check_batch("p", 1, 2, &inf), Err(RagError::EmbeddingError { .. })));
    }
}
