//! Flat vector index with exact cosine search and atomic persistence.
//!
//! [`VectorIndex`] keeps every [`VectorEntry`] in memory and scores a query against all
//! of them. Results are sorted by descending cosine similarity, ties broken by ascending
//! `sequence`, then `source`, then insertion order.
//!
//! The persisted form is a single JSON artifact. [`VectorIndex::save`] writes it to a
//! sibling `*.tmp` file and renames it into place, so a reader never sees a partial file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::document::{SearchResult, VectorEntry};
use crate::error::{RagError, Result};

/// Version of the persisted artifact layout.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    model_id: &'a str,
    dimensions: usize,
    entries: &'a [VectorEntry],
}

#[derive(Deserialize)]
struct Artifact {
    version: u32,
    model_id: String,
    dimensions: usize,
    entries: Vec<VectorEntry>,
}

/// An immutable, fully built vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model_id: String,
    dimensions: usize,
    entries: Vec<VectorEntry>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Whether every component of `vector` is finite.
pub(crate) fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

/// Map a similarity onto a key that `f32::total_cmp` orders sensibly.
///
/// Overflow in the dot product or norms can still yield NaN for finite inputs; such
/// scores sort last. `-0.0` folds into `0.0` so equal scores stay tied.
fn ranking_score(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score + 0.0 }
}

impl VectorIndex {
    /// Build a complete index from `entries`.
    ///
    /// Every call produces an independent index; nothing is merged from earlier builds.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if `entries` is empty.
    /// - [`RagError::ConfigError`] if vectors are zero-length, disagree on dimensionality,
    ///   or contain NaN or infinite components.
    pub fn build(model_id: impl Into<String>, entries: Vec<VectorEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Err(RagError::EmptyCorpus);
        };
        let dimensions = first.vector.len();
        if dimensions == 0 {
            return Err(RagError::ConfigError("embedding vectors must not be empty".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return Err(RagError::ConfigError(format!(
                "passage '{}' has a {}-dimensional vector, expected {dimensions}",
                bad.passage.id,
                bad.vector.len()
            )));
        }
        if let Some(bad) = entries.iter().find(|e| !is_finite(&e.vector)) {
            return Err(RagError::ConfigError(format!(
                "passage '{}' has a non-finite vector component",
                bad.passage.id
            )));
        }

        Ok(Self { model_id: model_id.into(), dimensions, entries })
    }

    /// Return the `k` entries most similar to `vector`, best first.
    ///
    /// Returns `min(k, self.len())` results with 0-based ranks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `k == 0`, or if `vector` has the wrong
    /// dimensionality or a non-finite component.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        if vector.len() != self.dimensions {
            return Err(RagError::ConfigError(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                self.dimensions
            )));
        }
        if !is_finite(vector) {
            return Err(RagError::ConfigError("query vector has a non-finite component".to_string()));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, ranking_score(cosine_similarity(&entry.vector, vector))))
            .collect();

        // Stable sort: equal keys keep insertion order.
        scored.sort_by(|(ia, sa), (ib, sb)| {
            let a = &self.entries[*ia].passage;
            let b = &self.entries[*ib].passage;
            sb.total_cmp(sa)
                .then_with(|| a.sequence.cmp(&b.sequence))
                .then_with(|| a.source.cmp(&b.source))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, score))| SearchResult {
                passage: self.entries[i].passage.clone(),
                score,
                rank,
            })
            .collect())
    }

    /// Serialize the index to `path`, replacing any existing artifact atomically.
    ///
    /// Parent directories are created as needed.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(&ArtifactRef {
            version: FORMAT_VERSION,
            model_id: &self.model_id,
            dimensions: self.dimensions,
            entries: &self.entries,
        })?;

        write_atomic(path, &bytes).await?;
        info!(path = %path.display(), entries = self.entries.len(), "saved vector index");
        Ok(())
    }

    /// Load an index previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if no artifact exists at `path`.
    /// - [`RagError::IndexCorrupt`] if the artifact cannot be decoded, is empty, has an
    ///   unknown version, or its dimensionality differs from `expected_dimensions`.
    pub async fn load(path: &Path, expected_dimensions: usize) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound { path: path.to_path_buf() });
            }
            Err(e) => return Err(e.into()),
        };

        let corrupt =
            |message: String| RagError::IndexCorrupt { path: path.to_path_buf(), message };

        let artifact: Artifact = serde_json::from_slice(&bytes)
            .map_err(|e| corrupt(format!("failed to decode artifact: {e}")))?;

        if artifact.version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported artifact version {}", artifact.version)));
        }
        if artifact.dimensions != expected_dimensions {
            return Err(corrupt(format!(
                "artifact holds {}-dimensional vectors but the embedder produces {expected_dimensions}",
                artifact.dimensions
            )));
        }
        if artifact.entries.is_empty() {
            return Err(corrupt("artifact has no entries".to_string()));
        }
        if artifact.entries.iter().any(|e| e.vector.len() != artifact.dimensions) {
            return Err(corrupt("entries disagree on vector dimensionality".to_string()));
        }

        debug!(path = %path.display(), entries = artifact.entries.len(), "loaded vector index");
        Ok(Self {
            model_id: artifact.model_id,
            dimensions: artifact.dimensions,
            entries: artifact.entries,
        })
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no passages. Always `false` for a built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by every vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embedding model the index was built with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` to a temporary sibling of `path`, sync it, and rename it over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path(path);

    let written = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}
