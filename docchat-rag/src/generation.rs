//! The language-model boundary.
//!
//! A [`Generator`] never fails by signature: transport errors, non-2xx responses and
//! undecodable bodies come back as a [`Generation`] whose `text` describes the failure
//! and whose `error` carries the typed cause. A conversation turn therefore always has
//! something to show.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::prompt::Message;

/// Why a generation call produced no answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The request never completed (connect failure, timeout, ...).
    #[error("Request Error: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The API answered 2xx but the body was not valid JSON.
    #[error("Error decoding API response: {0}")]
    Decode(String),
}

/// Parameters of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// The outcome of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// The answer text, or the error description when `error` is set.
    pub text: String,
    /// The decoded response body, or `Value::Null` when there was none.
    pub raw: Value,
    /// Set when the call failed.
    pub error: Option<GenerationError>,
}

impl Generation {
    /// A successful generation. `text` may legitimately be empty.
    pub fn answered(text: impl Into<String>, raw: Value) -> Self {
        Self { text: text.into(), raw, error: None }
    }

    /// A failed generation whose text is the error's description.
    pub fn failed(error: GenerationError, raw: Value) -> Self {
        Self { text: error.to_string(), raw, error: Some(error) }
    }

    /// Whether the call failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model name, for logging.
    fn name(&self) -> &str;

    /// Run one completion. Implementations must bound the call with a timeout.
    async fn generate(&self, request: &GenerationRequest) -> Generation;
}
