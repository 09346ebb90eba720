//! Ollama `/api/chat` provider for locally served models.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    check_http_response, CompletionRequest, CompletionResponse, ContentPart, LlmProvider,
    ProviderError, StopReason, UsageStats,
};

/// Where a local Ollama daemon listens by default.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

// Local models can be slow on first load.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    /// Local model tag.
    pub model: String,
    /// System message first, then the prompt.
    pub messages: Vec<OllamaMessage>,
    /// Always `false`.
    pub stream: bool,
    /// Function tools.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    /// Sampling options, sent only when the request sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Request message.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaMessage {
    /// `system` or `user`.
    pub role: String,
    /// Text.
    pub content: String,
}

/// Sampling options.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    /// Response token limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    /// Answer message.
    pub message: OllamaAnswer,
    /// Model that answered.
    #[serde(default)]
    pub model: String,
    /// Prompt tokens.
    pub prompt_eval_count: Option<u32>,
    /// Generated tokens.
    pub eval_count: Option<u32>,
}

/// Answer message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OllamaAnswer {
    /// Text.
    #[serde(default)]
    pub content: String,
    /// Tool calls.
    #[serde(default)]
    pub tool_calls: Vec<OllamaToolCall>,
}

/// A tool call. Ollama assigns no id.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OllamaToolCall {
    /// Called function.
    pub function: OllamaFunctionCall,
}

/// Called function.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OllamaFunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments, already structured.
    pub arguments: Value,
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build the request body.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> OllamaRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system {
        messages.push(OllamaMessage {
            role: "system".to_owned(),
            content: system.clone(),
        });
    }
    messages.push(OllamaMessage {
        role: "user".to_owned(),
        content: request.user.clone(),
    });

    let options = (request.max_tokens.is_some() || request.temperature.is_some()).then(|| {
        OllamaOptions {
            num_predict: request.max_tokens,
            temperature: request.temperature,
        }
    });

    OllamaRequest {
        model: model.to_owned(),
        messages,
        stream: false,
        tools: request.function_tools(),
        options,
    }
}

/// Parse a response body. Tool calls get a fresh uuid as their id.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body does not deserialize.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: OllamaResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let stop_reason = if resp.message.tool_calls.is_empty() {
        StopReason::EndTurn
    } else {
        StopReason::ToolUse
    };

    let mut content = Vec::new();
    if !resp.message.content.is_empty() {
        content.push(ContentPart::Text {
            text: resp.message.content,
        });
    }
    content.extend(resp.message.tool_calls.into_iter().map(|call| {
        ContentPart::ToolUse {
            id: uuid::Uuid::new_v4().to_string(),
            name: call.function.name,
            input: call.function.arguments,
        }
    }));

    Ok(CompletionResponse {
        content,
        stop_reason,
        usage: UsageStats {
            input_tokens: resp.prompt_eval_count.unwrap_or(0),
            output_tokens: resp.eval_count.unwrap_or(0),
        },
        model: resp.model,
    })
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Ollama chat client.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    model_spec: String,
    /// Local model tag.
    #[doc(hidden)]
    pub model: String,
    /// Server URL without a trailing slash.
    #[doc(hidden)]
    pub base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a client for one local model on the default server.
    pub fn new(model_spec: String, model_name: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            model_spec,
            model: model_name,
            base_url: DEFAULT_OLLAMA_URL.to_owned(),
            client,
        }
    }

    /// Use another server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = build_request(&self.model, &request);
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;
        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
