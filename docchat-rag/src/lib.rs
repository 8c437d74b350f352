//! # docchat-rag
//!
//! Retrieval-augmented question answering over a local document corpus.
//!
//! ## Overview
//!
//! - [`Chunker`]: splits text into overlapping passages ([`FixedSizeChunker`],
//!   [`RecursiveChunker`])
//! - [`EmbeddingProvider`]: text → vector contract ([`openai::OpenAIEmbeddingProvider`]
//!   behind the `openai` feature)
//! - [`VectorIndex`]: exact cosine search with atomic JSON persistence
//! - [`DocumentStore`]: ingestion, index builds, lazy loading and retrieval
//! - [`PromptAssembler`]: system instruction + windowed history + cited passages
//! - [`Generator`]: the language-model boundary ([`groq::GroqClient`] behind the
//!   `groq` feature)
//! - [`ConversationOrchestrator`] / [`ChatSession`]: retrieve → assemble → generate
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_rag::{ChatSession, ConversationOrchestrator, DocumentStore, RagConfig};
//!
//! let config = RagConfig::from_env()?;
//! let store = Arc::new(
//!     DocumentStore::builder()
//!         .config(config.clone())
//!         .embedding_provider(Arc::new(embedder))
//!         .build()?,
//! );
//! store.ingest("guide.txt", &text).await;
//! store.build_index().await?;
//!
//! let orchestrator = Arc::new(ConversationOrchestrator::new(&config, store, Arc::new(generator)));
//! let mut session = ChatSession::new(orchestrator);
//! let answer = session.send("How do I get started?").await?;
//! ```
//!
//! ## Similarity
//!
//! Scores are cosine similarities: higher means more relevant, everywhere.

pub mod chat_log;
pub mod chunking;
pub mod config;
pub mod conversation;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
#[cfg(feature = "groq")]
pub mod groq;
pub mod index;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompt;
pub mod store;

pub use chat_log::{ChatLogEntry, append_chat_log, read_chat_log};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split};
pub use config::{ChunkStrategy, RagConfig, RagConfigBuilder};
pub use conversation::{
    Answer, ChatSession, ConversationOrchestrator, SOURCE_EXCERPT_CHARS, SourceRef,
};
pub use document::{Passage, SearchResult, VectorEntry, preview, truncate_chars};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{Generation, GenerationError, GenerationRequest, Generator};
pub use index::{VectorIndex, cosine_similarity};
pub use loader::{PlainTextExtractor, TextExtractor};
pub use prompt::{ConversationTurn, Message, PromptAssembler, Role, Speaker};
pub use store::{DocumentStore, DocumentStoreBuilder};
