//! Context compaction: when the estimated token count crosses a
//! threshold, collapse everything but the system message and the most
//! recent messages into a single synthetic summary exchange.

use crate::token_counter::TokenCounter;
use wick_provider::{ContentPart, Provider, ProviderMessage, ProviderRequest, Role};

/// How many of the most recent messages compaction always preserves
/// verbatim, alongside the system message.
pub const DEFAULT_KEEP_LAST: usize = 10;

/// Default token threshold that triggers compaction.
pub const DEFAULT_THRESHOLD: usize = 12_000;

/// Per-message snippet budget when building the summarization prompt.
const SNIPPET_CHARS: usize = 500;

/// Outcome of a [`compact`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionResult {
    /// The (possibly unchanged) message list.
    pub messages: Vec<ProviderMessage>,
    /// Whether compaction actually ran.
    pub compacted: bool,
    /// Whether the heuristic fallback was used because the
    /// summarization provider call failed.
    pub used_fallback: bool,
}

fn first_text(msg: &ProviderMessage) -> Option<&str> {
    msg.content.iter().find_map(|part| match part {
        ContentPart::Text { text } => Some(text.as_str()),
        _ => None,
    })
}

fn snippet(msg: &ProviderMessage) -> String {
    let text: String = msg
        .content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            ContentPart::ToolUse { name, .. } => Some(name.as_str()),
            ContentPart::ToolResult { content, .. } => Some(content.as_str()),
            ContentPart::Image { .. } => Some("[image]"),
        })
        .collect::<Vec<_>>()
        .join(" ");
    text.chars().take(SNIPPET_CHARS).collect()
}

fn role_label(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn heuristic_summary(older: &[ProviderMessage]) -> String {
    let snippets: Vec<String> = older
        .iter()
        .filter(|m| m.role == Role::User)
        .take(3)
        .filter_map(|m| first_text(m))
        .map(|text| text.lines().next().unwrap_or("").to_string())
        .collect();
    format!("Earlier conversation covered: {}", snippets.join("; "))
}

/// Compact `messages` if their estimated token count exceeds
/// `threshold`. The system message (if `messages[0]` has role
/// `System`) and the last `keep_last` messages are always preserved
/// verbatim; everything between is collapsed into one synthetic
/// `user` message carrying a summary and one acknowledging
/// `assistant` message.
///
/// The summary is produced by one `provider` call; if that call
/// fails, falls back to a heuristic summary built from the first-line
/// snippets of the first three older user messages.
pub async fn compact<P: Provider>(
    messages: Vec<ProviderMessage>,
    provider: &P,
    model: Option<&str>,
    threshold: usize,
    keep_last: usize,
) -> CompactionResult {
    let counter = TokenCounter::new();
    if counter.estimate(&messages) <= threshold {
        return CompactionResult {
            messages,
            compacted: false,
            used_fallback: false,
        };
    }

    let has_system = messages.first().map(|m| m.role == Role::System).unwrap_or(false);
    let system = if has_system { Some(messages[0].clone()) } else { None };
    let rest = if has_system { &messages[1..] } else { &messages[..] };

    if rest.len() <= keep_last {
        return CompactionResult {
            messages,
            compacted: false,
            used_fallback: false,
        };
    }

    let split = rest.len() - keep_last;
    let older = &rest[..split];
    let recent = &rest[split..];

    let transcript: String = older
        .iter()
        .map(|m| format!("{}: {}", role_label(&m.role), snippet(m)))
        .collect::<Vec<_>>()
        .join("\n");

    let summary_request = ProviderRequest {
        model: model.map(|s| s.to_string()),
        messages: vec![ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text {
                text: format!(
                    "Summarize the following conversation excerpt compactly, preserving decisions and open threads:\n\n{transcript}"
                ),
            }],
        }],
        tools: vec![],
        max_tokens: Some(512),
        temperature: None,
        system: Some("You produce compact, faithful summaries of conversation history.".to_string()),
        extra: serde_json::Value::Null,
    };

    let (summary, used_fallback) = match provider.complete(summary_request).await {
        Ok(response) => (response.text(), false),
        Err(err) => {
            tracing::warn!(error = %err, "compaction summarization call failed, using heuristic fallback");
            (heuristic_summary(older), true)
        }
    };

    let synthetic_user = ProviderMessage {
        role: Role::User,
        content: vec![ContentPart::Text {
            text: format!("[Earlier conversation summary]\n{summary}"),
        }],
    };
    let synthetic_ack = ProviderMessage {
        role: Role::Assistant,
        content: vec![ContentPart::Text {
            text: "Understood, continuing from the summary above.".to_string(),
        }],
    };

    let mut result = Vec::with_capacity(2 + recent.len() + 2);
    if let Some(system) = system {
        result.push(system);
    }
    result.push(synthetic_user);
    result.push(synthetic_ack);
    result.extend(recent.iter().cloned());

    CompactionResult {
        messages: result,
        compacted: true,
        used_fallback,
    }
}
