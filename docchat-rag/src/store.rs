//! Document store: ingestion, index building, and retrieval.
//!
//! The [`DocumentStore`] accumulates [`Passage`]s from any number of
//! [`ingest`](DocumentStore::ingest) calls, turns them into a [`VectorIndex`] on
//! [`build_index`](DocumentStore::build_index), and answers
//! [`retrieve`](DocumentStore::retrieve) queries against the resident index, loading
//! the persisted artifact on first use.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::{DocumentStore, RagConfig};
//!
//! let store = DocumentStore::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! store.ingest("handbook.txt", &text).await;
//! store.build_index().await?;
//! let results = store.retrieve("how do I reset my password?", 4).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Passage, SearchResult, VectorEntry};
use crate::embedding::{EmbeddingProvider, check_batch};
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, is_finite};
use crate::loader::{TextExtractor, read_documents};

/// Owns the ingestion pipeline and the resident vector index.
///
/// Passages and the resident index sit behind async locks; index builds are serialized
/// so a build never races another build against the same artifact.
pub struct DocumentStore {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    index_path: PathBuf,
    embed_batch_size: usize,
    passages: RwLock<Vec<Passage>>,
    index: RwLock<Option<Arc<VectorIndex>>>,
    build_lock: Mutex<()>,
}

impl DocumentStore {
    /// Create a new [`DocumentStoreBuilder`].
    pub fn builder() -> DocumentStoreBuilder {
        DocumentStoreBuilder::default()
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Path of the persisted index artifact.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Chunk `raw_text` and append the passages under `source_name`.
    ///
    /// Sequences restart at 0 for every call. Ingesting the same source twice appends a
    /// second copy of its passages; nothing is deduplicated. The index is not touched
    /// until the next [`build_index`](Self::build_index).
    ///
    /// Returns the number of passages added.
    pub async fn ingest(&self, source_name: &str, raw_text: &str) -> usize {
        let passages: Vec<Passage> = self
            .chunker
            .split(raw_text)
            .into_iter()
            .enumerate()
            .map(|(sequence, text)| Passage::new(source_name, sequence, text))
            .collect();

        let count = passages.len();
        let mut all = self.passages.write().await;
        if all.iter().any(|p| p.source == source_name) {
            warn!(source = source_name, "source ingested again; passages will be duplicated");
        }
        all.extend(passages);
        info!(source = source_name, passage_count = count, total = all.len(), "ingested document");
        count
    }

    /// Ingest several `(source_name, raw_text)` documents in order.
    pub async fn ingest_documents<I, S, T>(&self, documents: I) -> usize
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut total = 0;
        for (name, text) in documents {
            total += self.ingest(name.as_ref(), text.as_ref()).await;
        }
        total
    }

    /// Replace the accumulated passages with the contents of a directory tree.
    ///
    /// Files are visited in sorted path order and named by their path. Files that no
    /// extractor accepts are skipped. Returns the number of passages ingested.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if `root` cannot be read and
    /// [`RagError::ExtractionError`] if an accepted file fails to extract. On error the
    /// previously accumulated passages are left untouched.
    pub async fn load_dir(
        &self,
        root: impl AsRef<Path>,
        extractors: &[Arc<dyn TextExtractor>],
    ) -> Result<usize> {
        let documents = read_documents(root.as_ref(), extractors).await?;
        self.clear().await;
        let total = self.ingest_documents(documents).await;
        info!(root = %root.as_ref().display(), passage_count = total, "loaded directory");
        Ok(total)
    }

    /// Embed every accumulated passage, build a fresh index, persist it, and make it
    /// resident.
    ///
    /// Any previously persisted or resident index is replaced.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if nothing has been ingested.
    /// - [`RagError::EmbeddingError`] if the embedder fails or returns a batch that does
    ///   not match its input.
    /// - [`RagError::Io`] / [`RagError::Serialization`] if the artifact cannot be written.
    pub async fn build_index(&self) -> Result<()> {
        let _build = self.build_lock.lock().await;

        let passages = self.passages.read().await.clone();
        if passages.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let provider = self.embedding_provider.model_id().to_string();
        let dimensions = self.embedding_provider.dimensions();
        let mut entries = Vec::with_capacity(passages.len());

        for batch in passages.chunks(self.embed_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|p| p.text.as_str()).collect();
            let vectors = self.embedding_provider.embed_batch(&texts).await?;
            check_batch(&provider, texts.len(), dimensions, &vectors)?;
            debug!(batch_size = texts.len(), "embedded batch");

            entries.extend(
                batch.iter().cloned().zip(vectors).map(|(passage, vector)| VectorEntry { passage, vector }),
            );
        }

        let index = VectorIndex::build(provider, entries)?;
        index.save(&self.index_path).await?;

        let passage_count = index.len();
        *self.index.write().await = Some(Arc::new(index));
        info!(passage_count, path = %self.index_path.display(), "built index");
        Ok(())
    }

    /// Return the resident index, loading the persisted artifact if none is resident.
    ///
    /// # Errors
    ///
    /// [`RagError::IndexNotFound`] or [`RagError::IndexCorrupt`] from
    /// [`VectorIndex::load`].
    pub async fn ensure_loaded(&self) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.index.read().await.as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut slot = self.index.write().await;
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }

        let index =
            VectorIndex::load(&self.index_path, self.embedding_provider.dimensions()).await?;
        if index.model_id() != self.embedding_provider.model_id() {
            warn!(
                index_model = index.model_id(),
                embedder_model = self.embedding_provider.model_id(),
                "index was built with a different embedding model"
            );
        }
        info!(path = %self.index_path.display(), passage_count = index.len(), "loaded index");

        let index = Arc::new(index);
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Drop the resident index and load the persisted artifact again.
    pub async fn reload(&self) -> Result<Arc<VectorIndex>> {
        self.index.write().await.take();
        self.ensure_loaded().await
    }

    /// Return the `k` passages most similar to `query`, best first.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `k == 0`.
    /// - [`RagError::IndexNotFound`] if no index was ever built or persisted.
    /// - [`RagError::EmbeddingError`] if the query cannot be embedded or its embedding
    ///   has the wrong size or a non-finite component.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }

        let index = self.ensure_loaded().await?;
        let vector = self.embedding_provider.embed(query).await?;
        if vector.len() != index.dimensions() {
            return Err(RagError::embedding(
                self.embedding_provider.model_id(),
                format!(
                    "query embedding has {} dimensions, index has {}",
                    vector.len(),
                    index.dimensions()
                ),
            ));
        }

        if !is_finite(&vector) {
            return Err(RagError::embedding(
                self.embedding_provider.model_id(),
                "query embedding has a non-finite component",
            ));
        }

        let results = index.query(&vector, k)?;
        debug!(k, result_count = results.len(), "retrieved passages");
        Ok(results)
    }

    /// A snapshot of the accumulated passages in ingestion order.
    pub async fn passages(&self) -> Vec<Passage> {
        self.passages.read().await.clone()
    }

    /// Number of accumulated passages.
    pub async fn passage_count(&self) -> usize {
        self.passages.read().await.len()
    }

    /// Discard all accumulated passages. The resident and persisted index are kept.
    pub async fn clear(&self) {
        self.passages.write().await.clear();
    }
}

/// Builder for constructing a [`DocumentStore`].
///
/// `config` and `embedding_provider` are required. The chunker defaults to the one
/// selected by [`RagConfig::chunk_strategy`].
#[derive(Default)]
pub struct DocumentStoreBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl DocumentStoreBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`DocumentStore`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing, the embedder
    /// reports zero dimensions, or the configured chunker is invalid.
    pub fn build(self) -> Result<DocumentStore> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        if embedding_provider.dimensions() == 0 {
            return Err(RagError::ConfigError(
                "embedding provider must report a non-zero dimensionality".to_string(),
            ));
        }
        if embedding_provider.model_id() != config.embedding_model_id {
            debug!(
                configured = %config.embedding_model_id,
                provider = embedding_provider.model_id(),
                "embedding provider model differs from configured model id"
            );
        }
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => config.chunker()?,
        };

        Ok(DocumentStore {
            embedding_provider,
            chunker,
            index_path: config.index_path,
            embed_batch_size: config.embed_batch_size.max(1),
            passages: RwLock::new(Vec::new()),
            index: RwLock::new(None),
            build_lock: Mutex::new(()),
        })
    }
}
