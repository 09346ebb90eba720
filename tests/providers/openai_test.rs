//! OpenAI provider wire format tests.

use serde_json::json;
use hirebot::credentials::OpenAiAuth;
use hirebot::providers::openai::{build_request, parse_response, OpenAiProvider};
use hirebot::providers::{
    CompletionRequest, ContentPart, LlmProvider, ProviderError, StopReason, ToolDefinition,
};

#[test]
fn build_request_sets_model_system_and_sampling() {
    let request = CompletionRequest::prompt("You route messages.", "I want an interview")
        .max_tokens(10)
        .temperature(0.1);
    let req = build_request("gpt-4o-mini", &request);
    assert_eq!(req.model, "gpt-4o-mini");
    assert_eq!(req.max_tokens, Some(10));
    assert_eq!(req.temperature, Some(0.1));
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.messages[0].role, "system");
    assert_eq!(req.messages[0].content, "You route messages.");
    assert_eq!(req.messages[1].role, "user");
    assert!(req.tools.is_empty());
}

#[test]
fn build_request_defaults_max_tokens_and_wraps_tools() {
    let request = CompletionRequest::prompt("sys", "hi").tools(vec![ToolDefinition {
        name: "get_schedule".to_owned(),
        description: "Look up the booking".to_owned(),
        input_schema: json!({"type": "object", "properties": {}}),
    }]);
    let req = build_request("gpt-4o-mini", &request);
    assert_eq!(req.max_tokens, Some(1024));
    assert_eq!(req.temperature, None);
    assert_eq!(req.tools.len(), 1);
    assert_eq!(req.tools[0]["type"], "function");
    assert_eq!(req.tools[0]["function"]["name"], "get_schedule");

    let serialized = serde_json::to_value(&req).expect("serialize");
    assert!(serialized.get("temperature").is_none());
}

#[test]
fn parse_response_reads_text_and_usage() {
    let body = json!({
        "model": "gpt-4o-mini",
        "choices": [{"message": {"content": "schedule"}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 40, "completion_tokens": 1}
    })
    .to_string();
    let response = parse_response(&body).expect("should parse");
    assert_eq!(response.text(), "schedule");
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.input_tokens, 40);
    assert_eq!(response.usage.output_tokens, 1);
}

#[test]
fn parse_response_reads_tool_calls() {
    let body = json!({
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_9",
                    "type": "function",
                    "function": {
                        "name": "set_schedule",
                        "arguments": "{\"slot\":\"2025-09-10 10:00\"}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
    .to_string();
    let response = parse_response(&body).expect("should parse");
    assert_eq!(response.stop_reason, StopReason::ToolUse);
    let (name, input) = response.first_tool_use().expect("tool call");
    assert_eq!(name, "set_schedule");
    assert_eq!(input["slot"], "2025-09-10 10:00");
    assert!(matches!(response.content[0], ContentPart::ToolUse { .. }));
}

#[test]
fn parse_response_rejects_bad_tool_arguments_and_empty_choices() {
    let bad_args = json!({
        "model": "m",
        "choices": [{
            "message": {"tool_calls": [{
                "id": "c", "type": "function",
                "function": {"name": "get_schedule", "arguments": "{not json"}
            }]},
            "finish_reason": "tool_calls"
        }]
    })
    .to_string();
    assert!(matches!(parse_response(&bad_args), Err(ProviderError::Parse(_))));

    let empty = json!({"model": "m", "choices": []}).to_string();
    assert!(matches!(parse_response(&empty), Err(ProviderError::Parse(_))));
}

#[test]
fn content_filter_maps_to_filtered() {
    let body = json!({
        "model": "m",
        "choices": [{"message": {"content": ""}, "finish_reason": "content_filter"}]
    })
    .to_string();
    let response = parse_response(&body).expect("should parse");
    assert_eq!(response.stop_reason, StopReason::Filtered);
    assert!(response.content.is_empty());
}

#[test]
fn provider_reports_model_and_endpoint() {
    let provider = OpenAiProvider::new(
        "openai/gpt-4o-mini".to_owned(),
        "gpt-4o-mini".to_owned(),
        OpenAiAuth {
            api_key: "sk-test".to_owned(),
            base_url: "http://localhost:8080/v1".to_owned(),
        },
    );
    assert_eq!(provider.model_id(), "openai/gpt-4o-mini");
    assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
}
