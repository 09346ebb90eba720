//! Model providers.
//!
//! Every model-backed step in a conversation is a single-turn prompt: a
//! system prompt, one candidate-facing input, optionally a set of scheduling
//! tools. [`LlmProvider`] is the seam; [`openai::OpenAiProvider`] and
//! [`ollama::OllamaProvider`] speak the two supported chat APIs.
//!
//! [`router::ModelRouter`] picks the provider for each conversational role
//! (intent, registration, scheduling, info, exit).

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod ollama;
pub mod openai;
pub mod router;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A function the model may call instead of answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name.
    pub name: String,
    /// What the function does, for the model.
    pub description: String,
    /// JSON Schema of the arguments.
    pub input_schema: Value,
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt.
    pub system: Option<String>,
    /// The single user turn.
    pub user: String,
    /// Tools offered for this call.
    pub tools: Vec<ToolDefinition>,
    /// Response token limit.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A system prompt plus one user message.
    pub fn prompt(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the token limit.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offer tools to the model.
    #[must_use]
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Tools in the `{"type": "function", ...}` shape both chat APIs accept.
    pub fn function_tools(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One piece of a model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Text.
    Text {
        /// The text.
        text: String,
    },
    /// A tool call.
    ToolUse {
        /// Call id.
        id: String,
        /// Tool name.
        name: String,
        /// Parsed arguments.
        input: Value,
    },
}

/// Why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model finished its answer.
    EndTurn,
    /// The model called a tool.
    ToolUse,
    /// The token limit was hit.
    MaxTokens,
    /// The provider filtered the answer.
    Filtered,
    /// Anything else the provider reported.
    Other(String),
}

/// Token accounting for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Generated tokens.
    pub output_tokens: u32,
}

/// A model answer.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text and tool calls in order.
    pub content: Vec<ContentPart>,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Token usage.
    pub usage: UsageStats,
    /// Model that served the call.
    pub model: String,
}

impl CompletionResponse {
    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ToolUse { .. } => None,
            })
            .collect()
    }

    /// The first tool call, if the model made one.
    pub fn first_tool_use(&self) -> Option<(&str, &Value)> {
        self.content.iter().find_map(|p| match p {
            ContentPart::ToolUse { name, input, .. } => Some((name.as_str(), input)),
            ContentPart::Text { .. } => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match the expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream returned a non-2xx status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// No provider can serve the call.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

const MAX_ERROR_BODY_CHARS: usize = 256;

/// Return the body of a 2xx response, or a sanitized [`ProviderError::HttpStatus`].
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure and
/// `ProviderError::HttpStatus` on a non-2xx status.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact API keys, and truncate an error body.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for pattern in [r"sk-proj-[A-Za-z0-9_\-]{10,}", r"sk-[A-Za-z0-9]{32,}"] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened: String = sanitized.chars().take(MAX_ERROR_BODY_CHARS).collect();
        return format!("{shortened}...[truncated]");
    }
    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A chat model.
///
/// Implementations are shared across conversations, hence `Send + Sync`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, status, or parse failure.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// The `<provider>/<model>` spec this instance serves.
    fn model_id(&self) -> &str;
}

/// Run a single-turn prompt and return the trimmed text answer.
///
/// # Errors
///
/// Returns the provider error, or [`ProviderError::Parse`] when the model
/// produced no text.
pub async fn complete_text(
    provider: &dyn LlmProvider,
    system: &str,
    user: &str,
    max_tokens: u32,
    temperature: f32,
) -> Result<String, ProviderError> {
    let request = CompletionRequest::prompt(system, user)
        .max_tokens(max_tokens)
        .temperature(temperature);
    let response = provider.complete(request).await?;
    let text = response.text().trim().to_owned();
    if text.is_empty() {
        return Err(ProviderError::Parse("empty completion".to_owned()));
    }
    Ok(text)
}
