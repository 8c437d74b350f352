//! Chat-completion client for Groq and other OpenAI-compatible endpoints.
//!
//! This module is only available when the `groq` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::generation::{Generation, GenerationError, GenerationRequest, Generator};
use crate::prompt::Message;

/// Groq's OpenAI-compatible chat completions endpoint.
pub const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default Groq model.
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A [`Generator`] that POSTs to an OpenAI-compatible `/chat/completions` URL.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::groq::GroqClient;
///
/// let client = GroqClient::new(std::env::var("GROQ_API_KEY")?, "llama-3.1-8b-instant")?;
/// ```
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

impl GroqClient {
    /// Create a client for the Groq API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::compatible(api_key, GROQ_CHAT_COMPLETIONS_URL, model)
    }

    /// Create a client for any OpenAI-compatible chat completions URL.
    pub fn compatible(
        api_key: impl Into<String>,
        url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?,
            api_key: api_key.into(),
            url: url.into(),
            model: model.into(),
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, reqwest::Error> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }
}

/// Pull `choices[0].message.content` out of a completion body.
fn answer_text(raw: &Value) -> &str {
    raw.pointer("/choices/0/message/content").and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl Generator for GroqClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Generation {
        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stop: request.stop.as_deref().filter(|s| !s.is_empty()),
        };

        debug!(model = %self.model, messages = request.messages.len(), "sending chat completion");

        let response =
            match self.client.post(&self.url).bearer_auth(&self.api_key).json(&body).send().await {
                Ok(response) => response,
                Err(e) => {
                    error!(model = %self.model, error = %e, "chat completion request failed");
                    return Generation::failed(GenerationError::Transport(e.to_string()), Value::Null);
                }
            };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!(model = %self.model, error = %e, "failed to read response body");
                return Generation::failed(GenerationError::Transport(e.to_string()), Value::Null);
            }
        };

        if !status.is_success() {
            error!(model = %self.model, %status, "chat completion API error");
            let raw = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Generation::failed(
                GenerationError::Status { status: status.as_u16(), body: text },
                raw,
            );
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(raw) => {
                let answer = answer_text(&raw).to_string();
                Generation::answered(answer, raw)
            }
            Err(_) => {
                error!(model = %self.model, "chat completion body is not JSON");
                Generation::failed(GenerationError::Decode(text), Value::Null)
            }
        }
    }
}
