//! OpenAI `/chat/completions` provider.
//!
//! Also works against OpenAI-compatible servers via `OPENAI_BASE_URL`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::OpenAiAuth;

use super::{
    check_http_response, CompletionRequest, CompletionResponse, ContentPart, LlmProvider,
    ProviderError, StopReason, UsageStats,
};

const DEFAULT_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model name without the provider prefix.
    pub model: String,
    /// System message first, then the prompt.
    pub messages: Vec<OpenAiMessage>,
    /// Function tools.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    /// Response token limit.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Request message.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// `system` or `user`.
    pub role: String,
    /// Text.
    pub content: String,
}

/// Response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Candidate answers; only the first is used.
    pub choices: Vec<OpenAiChoice>,
    /// Model that answered.
    #[serde(default)]
    pub model: String,
    /// Token usage.
    pub usage: Option<OpenAiUsage>,
}

/// One answer.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Answer message.
    pub message: OpenAiAnswer,
    /// `stop`, `length`, `tool_calls` or `content_filter`.
    pub finish_reason: Option<String>,
}

/// Answer message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiAnswer {
    /// Text, absent on pure tool calls.
    pub content: Option<String>,
    /// Tool calls.
    #[serde(default)]
    pub tool_calls: Vec<OpenAiToolCall>,
}

/// A tool call.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiToolCall {
    /// Call id.
    pub id: String,
    /// Called function.
    pub function: OpenAiFunctionCall,
}

/// Called function.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiFunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as a JSON string.
    pub arguments: String,
}

/// Token usage.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiUsage {
    /// Prompt tokens.
    pub prompt_tokens: Option<u32>,
    /// Completion tokens.
    pub completion_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build the request body.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> OpenAiRequest {
    let system = request.system.iter().map(|s| OpenAiMessage {
        role: "system".to_owned(),
        content: s.clone(),
    });
    let prompt = OpenAiMessage {
        role: "user".to_owned(),
        content: request.user.clone(),
    };

    OpenAiRequest {
        model: model.to_owned(),
        messages: system.chain(std::iter::once(prompt)).collect(),
        tools: request.function_tools(),
        max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        temperature: request.temperature,
    }
}

/// Parse a response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body does not deserialize, has no
/// choices, or carries tool arguments that are not JSON.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let usage = resp
        .usage
        .map(|u| UsageStats {
            input_tokens: u.prompt_tokens.unwrap_or(0),
            output_tokens: u.completion_tokens.unwrap_or(0),
        })
        .unwrap_or_default();
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    let mut content = Vec::new();
    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        content.push(ContentPart::Text { text });
    }
    for call in choice.message.tool_calls {
        let input = serde_json::from_str(&call.function.arguments).map_err(|e| {
            ProviderError::Parse(format!(
                "invalid arguments for tool '{}': {e}",
                call.function.name
            ))
        })?;
        content.push(ContentPart::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        None | Some("stop") => StopReason::EndTurn,
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::Filtered,
        Some(other) => StopReason::Other(other.to_owned()),
    };

    Ok(CompletionResponse {
        content,
        stop_reason,
        usage,
        model: resp.model,
    })
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenAI chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    model_spec: String,
    model_name: String,
    auth: OpenAiAuth,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a client for one model.
    pub fn new(model_spec: String, model_name: String, auth: OpenAiAuth) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            model_spec,
            model_name,
            auth,
            client,
        }
    }

    /// Chat completions URL.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.auth.base_url)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = build_request(&self.model_name, &request);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.auth.api_key)
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
