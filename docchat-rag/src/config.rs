//! Configuration for ingestion, retrieval and prompt assembly.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use crate::error::{RagError, Result};

/// Default embedding model identifier, recorded in every persisted index.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default location of the persisted index artifact.
pub const DEFAULT_INDEX_PATH: &str = "docchat_index.json";

/// How documents are cut into passages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed-width character windows ([`FixedSizeChunker`]).
    #[default]
    Fixed,
    /// Windows that prefer to end on paragraph, line or word breaks ([`RecursiveChunker`]).
    Recursive,
}

impl FromStr for ChunkStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "recursive" => Ok(Self::Recursive),
            other => Err(RagError::ConfigError(format!(
                "unknown chunk strategy '{other}' (expected 'fixed' or 'recursive')"
            ))),
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Recursive => f.write_str("recursive"),
        }
    }
}

/// Configuration parameters for the document chat pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Chunking strategy.
    pub chunk_strategy: ChunkStrategy,
    /// Identifier of the embedding model the index is built with.
    pub embedding_model_id: String,
    /// Path of the persisted index artifact.
    pub index_path: PathBuf,
    /// Number of most recent conversation turns included in a prompt.
    pub history_window: usize,
    /// Maximum characters of each passage quoted in a prompt.
    pub excerpt_chars: usize,
    /// Token budget passed to the generator.
    pub max_tokens: u32,
    /// Sampling temperature passed to the generator.
    pub temperature: f32,
    /// Number of passages sent to the embedder per request during a build.
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            chunk_strategy: ChunkStrategy::Fixed,
            embedding_model_id: DEFAULT_EMBEDDING_MODEL.to_string(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            history_window: 10,
            excerpt_chars: 1500,
            max_tokens: 512,
            temperature: 0.0,
            embed_batch_size: 64,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a validated config from process environment variables.
    ///
    /// Unset variables keep their defaults. See [`RagConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a validated config from a key lookup function.
    ///
    /// Recognized keys: `CHUNK_SIZE`, `CHUNK_OVERLAP`, `TOP_K`, `CHUNK_STRATEGY`,
    /// `EMBEDDING_MODEL`, `INDEX_PATH`, `HISTORY_WINDOW`, `EXCERPT_CHARS`, `MAX_TOKENS`,
    /// `TEMPERATURE`, `EMBED_BATCH_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a value does not parse or the resulting
    /// combination is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(v) = parse_var(&lookup, "CHUNK_SIZE")? {
            builder = builder.chunk_size(v);
        }
        if let Some(v) = parse_var(&lookup, "CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(v);
        }
        if let Some(v) = parse_var(&lookup, "TOP_K")? {
            builder = builder.top_k(v);
        }
        if let Some(v) = parse_var(&lookup, "CHUNK_STRATEGY")? {
            builder = builder.chunk_strategy(v);
        }
        if let Some(v) = non_empty(&lookup, "EMBEDDING_MODEL") {
            builder = builder.embedding_model_id(v);
        }
        if let Some(v) = non_empty(&lookup, "INDEX_PATH") {
            builder = builder.index_path(v);
        }
        if let Some(v) = parse_var(&lookup, "HISTORY_WINDOW")? {
            builder = builder.history_window(v);
        }
        if let Some(v) = parse_var(&lookup, "EXCERPT_CHARS")? {
            builder = builder.excerpt_chars(v);
        }
        if let Some(v) = parse_var(&lookup, "MAX_TOKENS")? {
            builder = builder.max_tokens(v);
        }
        if let Some(v) = parse_var(&lookup, "TEMPERATURE")? {
            builder = builder.temperature(v);
        }
        if let Some(v) = parse_var(&lookup, "EMBED_BATCH_SIZE")? {
            builder = builder.embed_batch_size(v);
        }

        builder.build()
    }

    /// Construct the chunker selected by [`chunk_strategy`](Self::chunk_strategy).
    pub fn chunker(&self) -> Result<Arc<dyn Chunker>> {
        Ok(match self.chunk_strategy {
            ChunkStrategy::Fixed => {
                Arc::new(FixedSizeChunker::new(self.chunk_size, self.chunk_overlap)?)
            }
            ChunkStrategy::Recursive => {
                Arc::new(RecursiveChunker::new(self.chunk_size, self.chunk_overlap)?)
            }
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty(lookup, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| RagError::ConfigError(format!("invalid value for {key} ('{raw}'): {e}"))),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of passages retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the chunking strategy.
    pub fn chunk_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.config.chunk_strategy = strategy;
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model_id(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model_id = model.into();
        self
    }

    /// Set the persisted index path.
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    /// Set how many recent turns are included in a prompt.
    pub fn history_window(mut self, turns: usize) -> Self {
        self.config.history_window = turns;
        self
    }

    /// Set the per-passage excerpt cap in characters.
    pub fn excerpt_chars(mut self, chars: usize) -> Self {
        self.config.excerpt_chars = chars;
        self
    }

    /// Set the generation token budget.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the embedding batch size used during builds.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `excerpt_chars`, `max_tokens` or `embed_batch_size` is zero
    /// - `temperature` is outside `0.0..=2.0`
    /// - `embedding_model_id` is empty
    pub fn build(self) -> Result<RagConfig> {
        let c = &self.config;
        validate_chunking(c.chunk_size, c.chunk_overlap)?;
        if c.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if c.excerpt_chars == 0 {
            return Err(RagError::ConfigError(
                "excerpt_chars must be greater than zero".to_string(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(RagError::ConfigError("max_tokens must be greater than zero".to_string()));
        }
        if c.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                c.temperature
            )));
        }
        if c.embedding_model_id.trim().is_empty() {
            return Err(RagError::ConfigError("embedding_model_id must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

/// Check the chunk window parameters shared by every chunker.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}
