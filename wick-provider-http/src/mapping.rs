//! Translation between [`wick_provider::types`] and the Anthropic
//! Messages API's wire JSON.
//!
//! The Messages API has no `tool` role — tool results are carried as
//! `user`-role messages whose content is `tool_result` blocks. Mapping
//! folds [`Role::Tool`] into `"user"` on the way out.

use rust_decimal::Decimal;
use serde_json::{json, Value};
use wick_provider::{ContentPart, ImageSource, ProviderError, ProviderRequest, ProviderResponse, Role, StopReason, TokenUsage};

fn role_to_wire(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User | Role::Tool => "user",
        Role::Assistant => "assistant",
    }
}

fn content_part_to_wire(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({"type": "text", "text": text}),
        ContentPart::ToolUse { id, name, input } => json!({"type": "tool_use", "id": id, "name": name, "input": input}),
        ContentPart::ToolResult { tool_use_id, content, is_error } => {
            json!({"type": "tool_result", "tool_use_id": tool_use_id, "content": content, "is_error": is_error})
        }
        ContentPart::Image { source, media_type } => {
            let source_json = match source {
                ImageSource::Base64 { data } => json!({"type": "base64", "media_type": media_type, "data": data}),
                ImageSource::Url { url } => json!({"type": "url", "url": url}),
            };
            json!({"type": "image", "source": source_json})
        }
    }
}

/// Build an Anthropic Messages API request body.
pub fn to_api_request(request: &ProviderRequest, default_model: &str) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            json!({
                "role": role_to_wire(&m.role),
                "content": m.content.iter().map(content_part_to_wire).collect::<Vec<_>>(),
            })
        })
        .collect();

    let system = request.system.clone().or_else(|| {
        request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(|m| m.content.first())
            .and_then(|part| match part {
                ContentPart::Text { text } => Some(text.clone()),
                _ => None,
            })
    });

    let mut body = json!({
        "model": request.model.clone().unwrap_or_else(|| default_model.to_string()),
        "max_tokens": request.max_tokens.unwrap_or(4096),
        "messages": messages,
    });

    if let Some(system) = system {
        body["system"] = json!(system);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }
    if !request.tools.is_empty() {
        body["tools"] = json!(request
            .tools
            .iter()
            .map(|t| json!({"name": t.name, "description": t.description, "input_schema": t.input_schema}))
            .collect::<Vec<_>>());
    }
    body
}

fn wire_to_content_part(value: &Value) -> Option<ContentPart> {
    match value.get("type").and_then(Value::as_str)? {
        "text" => Some(ContentPart::Text {
            text: value.get("text")?.as_str()?.to_string(),
        }),
        "tool_use" => Some(ContentPart::ToolUse {
            id: value.get("id")?.as_str()?.to_string(),
            name: value.get("name")?.as_str()?.to_string(),
            input: value.get("input").cloned().unwrap_or(Value::Null),
        }),
        _ => None,
    }
}

fn wire_stop_reason(s: &str) -> StopReason {
    match s {
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" | "end_turn" => StopReason::EndTurn,
        _ => StopReason::EndTurn,
    }
}

/// Parse an Anthropic Messages API response body.
pub fn from_api_response(json: &Value) -> Result<ProviderResponse, ProviderError> {
    let content: Vec<ContentPart> = json
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing content array".into()))?
        .iter()
        .filter_map(wire_to_content_part)
        .collect();

    let stop_reason = json
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(wire_stop_reason)
        .unwrap_or(StopReason::EndTurn);

    let model = json
        .get("model")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::InvalidResponse("missing model".into()))?
        .to_string();

    let usage_json = json.get("usage");
    let usage = TokenUsage {
        input_tokens: usage_json.and_then(|u| u.get("input_tokens")).and_then(Value::as_u64).unwrap_or(0),
        output_tokens: usage_json.and_then(|u| u.get("output_tokens")).and_then(Value::as_u64).unwrap_or(0),
        cache_read_tokens: usage_json.and_then(|u| u.get("cache_read_input_tokens")).and_then(Value::as_u64),
        cache_creation_tokens: usage_json.and_then(|u| u.get("cache_creation_input_tokens")).and_then(Value::as_u64),
    };

    Ok(ProviderResponse {
        content,
        stop_reason,
        usage,
        model,
        cost: None::<Decimal>,
    })
}
