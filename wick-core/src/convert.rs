//! Maps the event log's derived conversation history onto the
//! provider wire format.

use wick_event_log::{Message, Role as HistoryRole};
use wick_provider::{ContentPart, ProviderMessage, Role as WireRole};

/// Convert derived history messages into provider wire messages.
/// System messages are dropped — the caller sends the system prompt
/// via `ProviderRequest::system` instead, matching every provider
/// contract in this workspace.
pub fn to_provider_messages(history: &[Message]) -> Vec<ProviderMessage> {
    history
        .iter()
        .filter(|m| m.role != HistoryRole::System)
        .map(to_provider_message)
        .collect()
}

fn to_provider_message(message: &Message) -> ProviderMessage {
    let role = match message.role {
        HistoryRole::System => WireRole::System,
        HistoryRole::User => WireRole::User,
        HistoryRole::Assistant => WireRole::Assistant,
        HistoryRole::Tool => WireRole::Tool,
    };

    let mut content = Vec::new();
    if message.role == HistoryRole::Tool {
        content.push(ContentPart::ToolResult {
            tool_use_id: message.call_id.clone().unwrap_or_default(),
            content: message.content.clone().unwrap_or_default(),
            is_error: false,
        });
        return ProviderMessage { role, content };
    }

    if let Some(text) = &message.content {
        if !text.is_empty() {
            content.push(ContentPart::Text { text: text.clone() });
        }
    }
    for call in &message.tool_calls {
        content.push(ContentPart::ToolUse {
            id: call.call_id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        });
    }
    ProviderMessage { role, content }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wick_event_log::ToolCallStub;

    #[test]
    fn system_messages_are_dropped() {
        let history = vec![Message {
            role: HistoryRole::System,
            content: Some("be helpful".to_string()),
            tool_calls: vec![],
            call_id: None,
        }];
        assert!(to_provider_messages(&history).is_empty());
    }

    #[test]
    fn assistant_message_carries_tool_calls() {
        let history = vec![Message {
            role: HistoryRole::Assistant,
            content: Some("checking".to_string()),
            tool_calls: vec![ToolCallStub {
                call_id: "t1".to_string(),
                name: "echo".to_string(),
                arguments: serde_json::json!({"text": "x"}),
            }],
            call_id: None,
        }];
        let messages = to_provider_messages(&history);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.len(), 2);
    }

    #[test]
    fn tool_message_becomes_tool_result_part() {
        let history = vec![Message {
            role: HistoryRole::Tool,
            content: Some(r#"{"success":true}"#.to_string()),
            tool_calls: vec![],
            call_id: Some("t1".to_string()),
        }];
        let messages = to_provider_messages(&history);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].content[0], ContentPart::ToolResult { .. }));
    }
}
