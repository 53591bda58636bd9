//! Chat-completion client for the auditor model.
//!
//! Talks to a DeepSeek-compatible `POST /chat/completions` endpoint. One
//! request per audit, no retries; the only protection against a hung call is
//! the client-side timeout.
//!
//! ## Model Differences
//!
//! | Model | Temperature | Reasoning trace |
//! |-------|-------------|-----------------|
//! | `deepseek-chat` | 0.1 | never |
//! | `deepseek-reasoner` | omitted | `reasoning_content` |
//!
//! Both use `max_tokens` = [`MAX_OUTPUT_TOKENS`].

// Clippy pedantic allows:
// - Latency in milliseconds fits in u64
#![allow(clippy::cast_possible_truncation)]

use crate::error::{AuditError, Result};
use crate::prompt::AuditPrompt;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Output token cap sent with every request.
pub const MAX_OUTPUT_TOKENS: u32 = 4000;

/// Sampling temperature for the fast model.
pub const CHAT_TEMPERATURE: f64 = 0.1;

/// Default wall-clock limit for one request. Reasoning runs are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Auditor model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuditModel {
    /// `deepseek-chat` - fast, low temperature
    #[default]
    Chat,
    /// `deepseek-reasoner` - slower, returns a reasoning trace
    Reasoner,
}

impl AuditModel {
    /// API model identifier.
    #[inline]
    #[must_use]
    pub const fn model_id(&self) -> &'static str {
        match self {
            Self::Chat => "deepseek-chat",
            Self::Reasoner => "deepseek-reasoner",
        }
    }

    /// Temperature to send, if any. The reasoning model takes none.
    #[inline]
    #[must_use]
    pub const fn temperature(&self) -> Option<f64> {
        match self {
            Self::Chat => Some(CHAT_TEMPERATURE),
            Self::Reasoner => None,
        }
    }

    /// Whether the model may return a separate reasoning trace.
    #[inline]
    #[must_use]
    pub const fn is_reasoning(&self) -> bool {
        matches!(self, Self::Reasoner)
    }
}

impl std::fmt::Display for AuditModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.model_id())
    }
}

impl std::str::FromStr for AuditModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deepseek-chat" | "chat" | "fast" => Ok(Self::Chat),
            "deepseek-reasoner" | "reasoner" | "reasoning" | "r1" => Ok(Self::Reasoner),
            _ => Err(format!(
                "unknown model '{s}'. Valid options: chat, deepseek-chat, reasoner, deepseek-reasoner, r1"
            )),
        }
    }
}

/// Answer returned by the auditor model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditResult {
    /// Final protocol text, possibly empty
    pub answer: String,
    /// Reasoning trace, only from reasoning models
    pub reasoning: Option<String>,
}

impl AuditResult {
    /// Build a result; a blank reasoning trace is dropped.
    pub fn new(answer: impl Into<String>, reasoning: Option<String>) -> Self {
        Self {
            answer: answer.into(),
            reasoning: reasoning.filter(|r| !r.trim().is_empty()),
        }
    }

    /// The model produced a protocol.
    #[must_use]
    pub fn has_answer(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    /// The model only "thought" and never wrote the protocol.
    #[must_use]
    pub fn is_reasoning_only(&self) -> bool {
        !self.has_answer() && self.reasoning.is_some()
    }

    /// Neither an answer nor a reasoning trace.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_answer() && self.reasoning.is_none()
    }
}

/// Anything that can answer an audit prompt.
///
/// The pipeline only depends on this trait, so runs can be exercised
/// without a network.
pub trait ChatBackend {
    /// Send one prompt and return the model's answer.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::RemoteService`] on transport or API failure.
    fn complete(&self, model: AuditModel, prompt: &AuditPrompt) -> Result<AuditResult>;
}

impl<T: ChatBackend + ?Sized> ChatBackend for &T {
    fn complete(&self, model: AuditModel, prompt: &AuditPrompt) -> Result<AuditResult> {
        (**self).complete(model, prompt)
    }
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'static str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: AuditModel, prompt: &'a AuditPrompt) -> Self {
        Self {
            model: model.model_id(),
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system_instruction,
                },
                Message {
                    role: "user",
                    content: &prompt.user_content,
                },
            ],
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: model.temperature(),
        }
    }
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Blocking HTTP client for the chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ChatCompletionClient {
    /// Create a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuditError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl ChatBackend for ChatCompletionClient {
    fn complete(&self, model: AuditModel, prompt: &AuditPrompt) -> Result<AuditResult> {
        let start = Instant::now();
        let url = self.endpoint();
        let request = ChatRequest::new(model, prompt);

        tracing::info!("Sending audit request to {} ({})", url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| AuditError::RemoteService(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(AuditError::RemoteService(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .map_err(|e| AuditError::RemoteService(format!("failed to parse response: {e}")))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        match &chat_response.usage {
            Some(usage) => tracing::info!(
                "{} answered in {:.1}s ({} prompt / {} completion tokens)",
                model,
                latency_ms as f64 / 1000.0,
                usage.prompt_tokens,
                usage.completion_tokens
            ),
            None => tracing::info!("{} answered in {:.1}s", model, latency_ms as f64 / 1000.0),
        }

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AuditError::RemoteService("response contained no choices".to_string()))?;

        Ok(AuditResult::new(
            choice.message.content.unwrap_or_default(),
            choice.message.reasoning_content,
        ))
    }
}
