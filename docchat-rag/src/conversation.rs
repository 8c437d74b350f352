//! Conversation orchestration: retrieve → assemble → generate → cite.
//!
//! [`ConversationOrchestrator::ask`] answers a single question against a
//! [`DocumentStore`]. [`ChatSession`] wraps it with an append-only history and the turn
//! lifecycle: the user turn is recorded on submission, the assistant turn only once
//! generation has finished (with the error text standing in for a failed answer), and a
//! failed retrieval leaves no assistant turn at all.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::RagConfig;
use crate::document::{SearchResult, preview};
use crate::error::Result;
use crate::generation::{GenerationError, GenerationRequest, Generator};
use crate::prompt::{ConversationTurn, Message, PromptAssembler};
use crate::store::DocumentStore;

/// Characters of passage text kept in [`SourceRef::excerpt`].
pub const SOURCE_EXCERPT_CHARS: usize = 400;

/// A citation for one retrieved passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub source: String,
    pub sequence: usize,
    /// Cosine similarity (higher is more relevant).
    pub score: f32,
    /// Start of the passage text, `...`-terminated when shortened.
    pub excerpt: String,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        Self {
            source: result.passage.source.clone(),
            sequence: result.passage.sequence,
            score: result.score,
            excerpt: preview(&result.passage.text, SOURCE_EXCERPT_CHARS),
        }
    }
}

/// The result of one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Answer text, or the error description when generation failed.
    pub text: String,
    /// Citations with excerpts in retrieval rank order, present whether or not
    /// generation succeeded. Full passages are available from
    /// [`ConversationOrchestrator::last_retrieved`].
    pub sources: Vec<SourceRef>,
    /// Raw generator response.
    pub raw: Value,
    /// Set when generation failed.
    pub error: Option<GenerationError>,
}

/// Answers questions from a [`DocumentStore`] through a [`Generator`].
pub struct ConversationOrchestrator {
    store: Arc<DocumentStore>,
    generator: Arc<dyn Generator>,
    assembler: PromptAssembler,
    top_k: usize,
    max_tokens: u32,
    temperature: f32,
    stop: Option<Vec<String>>,
    last_retrieved: RwLock<Vec<SearchResult>>,
}

impl ConversationOrchestrator {
    /// Create an orchestrator using `top_k`, generation and prompt settings from `config`.
    pub fn new(config: &RagConfig, store: Arc<DocumentStore>, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            generator,
            assembler: PromptAssembler::from_config(config),
            top_k: config.top_k,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stop: None,
            last_retrieved: RwLock::new(Vec::new()),
        }
    }

    /// Replace the prompt assembler.
    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Pass stop sequences to every generation call.
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// The underlying document store.
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Answer `query` given the conversation so far.
    ///
    /// An empty answer from the generator is logged and returned as-is.
    ///
    /// # Errors
    ///
    /// Any retrieval error is returned unchanged. Generation failures are not errors;
    /// they are reported through [`Answer::error`].
    pub async fn ask(&self, query: &str, history: &[ConversationTurn]) -> Result<Answer> {
        let retrieved = self.store.retrieve(query, self.top_k).await?;
        *self.last_retrieved.write().await = retrieved.clone();

        let request = GenerationRequest {
            messages: self.assembler.assemble(query, history, &retrieved),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop: self.stop.clone(),
        };
        let generation = self.generator.generate(&request).await;

        if let Some(error) = &generation.error {
            warn!(model = self.generator.name(), %error, "generation failed");
        } else if generation.text.is_empty() {
            warn!(model = self.generator.name(), raw = %generation.raw, "generator returned an empty answer");
        }

        let sources: Vec<SourceRef> = retrieved.iter().map(SourceRef::from).collect();
        info!(
            model = self.generator.name(),
            source_count = sources.len(),
            answer_len = generation.text.len(),
            "answered question"
        );

        Ok(Answer { text: generation.text, sources, raw: generation.raw, error: generation.error })
    }

    /// The results recorded by the most recent [`ask`](Self::ask).
    pub async fn last_retrieved(&self) -> Vec<SearchResult> {
        self.last_retrieved.read().await.clone()
    }
}

/// One chat session: an orchestrator plus the session's history.
pub struct ChatSession {
    orchestrator: Arc<ConversationOrchestrator>,
    history: Vec<ConversationTurn>,
}

impl ChatSession {
    /// Start a session with an empty history.
    pub fn new(orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self { orchestrator, history: Vec::new() }
    }

    /// Submit a question.
    ///
    /// The question is appended to the history before retrieval and is therefore also
    /// part of the history window sent to the generator.
    ///
    /// # Errors
    ///
    /// Retrieval errors are returned and no assistant turn is appended.
    pub async fn send(&mut self, query: &str) -> Result<Answer> {
        self.history.push(ConversationTurn::user(query));
        let answer = self.orchestrator.ask(query, &self.history).await?;
        self.history.push(ConversationTurn::assistant(answer.text.clone()));
        Ok(answer)
    }

    /// The history so far, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The history as chat messages, for logging.
    pub fn transcript(&self) -> Vec<Message> {
        self.history.iter().map(Message::from).collect()
    }

    /// The orchestrator behind this session.
    pub fn orchestrator(&self) -> &Arc<ConversationOrchestrator> {
        &self.orchestrator
    }
}
