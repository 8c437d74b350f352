//! Prompt assembly from conversation history and retrieved passages.

use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::document::{SearchResult, truncate_chars};

/// Default grounding instruction sent as the system message.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Use the provided \
documents to answer the user's question. If the documents do not contain the answer, say you \
don't know and provide best-effort reasoning.";

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message in OpenAI wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Who spoke a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry of a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, text: text.into() }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.speaker {
            Speaker::User => Role::User,
            Speaker::Assistant => Role::Assistant,
        };
        Self { role, content: turn.text.clone() }
    }
}

/// Builds the message sequence sent to the generator.
///
/// The output is always: one system message, the last `history_window` turns in
/// chronological order, and one user message carrying the retrieved passages followed
/// by the question. Turns outside the window are dropped, not summarized.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_instruction: String,
    history_window: usize,
    excerpt_chars: usize,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            history_window: 10,
            excerpt_chars: 1500,
        }
    }
}

impl PromptAssembler {
    /// Create an assembler with the window and excerpt cap from `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            history_window: config.history_window,
            excerpt_chars: config.excerpt_chars,
            ..Self::default()
        }
    }

    /// Replace the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Set the number of history turns kept.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Set the per-passage excerpt cap in characters.
    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Assemble the messages for one question.
    pub fn assemble(
        &self,
        query: &str,
        history: &[ConversationTurn],
        retrieved: &[SearchResult],
    ) -> Vec<Message> {
        let window_start = history.len().saturating_sub(self.history_window);
        let recent = &history[window_start..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Message::system(self.system_instruction.clone()));
        messages.extend(recent.iter().map(Message::from));
        messages.push(Message::user(self.context_message(query, retrieved)));
        messages
    }

    fn context_message(&self, query: &str, retrieved: &[SearchResult]) -> String {
        let mut context = String::new();
        for result in retrieved {
            context.push_str("Source: ");
            context.push_str(&result.passage.source);
            context.push('\n');
            context.push_str(truncate_chars(&result.passage.text, self.excerpt_chars));
            context.push_str("\n---\n");
        }

        format!("Use the documents below to answer the question.\n\n{context}\nQuestion: {query}")
    }
}
