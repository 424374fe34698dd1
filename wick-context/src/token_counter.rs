//! Rough token estimation used to decide when to compact.

use wick_provider::{ContentPart, ProviderMessage};

/// Estimates token counts from message content. The estimate is
/// deliberately crude — `ceil(chars / chars_per_token)` — because the
/// agent core needs a cheap, provider-agnostic signal for "are we
/// getting close to the context limit," not an exact tokenizer match.
pub struct TokenCounter {
    chars_per_token: usize,
}

impl TokenCounter {
    /// Create a counter with the default ratio (4 chars per token).
    pub fn new() -> Self {
        Self { chars_per_token: 4 }
    }

    /// Create a counter with a custom chars-per-token ratio.
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    fn ceil_div(&self, chars: usize) -> usize {
        chars.div_ceil(self.chars_per_token)
    }

    fn estimate_message_tokens(&self, msg: &ProviderMessage) -> usize {
        msg.content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => self.ceil_div(text.len()),
                ContentPart::ToolUse { input, .. } => self.ceil_div(input.to_string().len()),
                ContentPart::ToolResult { content, .. } => self.ceil_div(content.len()),
                ContentPart::Image { .. } => 1000,
            })
            .sum()
    }

    /// Estimate total tokens across all messages.
    pub fn estimate(&self, messages: &[ProviderMessage]) -> usize {
        messages.iter().map(|m| self.estimate_message_tokens(m)).sum()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wick_provider::Role;

    fn text_message(role: Role, text: &str) -> ProviderMessage {
        ProviderMessage {
            role,
            content: vec![ContentPart::Text { text: text.to_string() }],
        }
    }

    #[test]
    fn estimate_rounds_up() {
        let counter = TokenCounter::new();
        // 401 chars / 4 = 100.25 -> ceil = 101
        let messages = vec![text_message(Role::User, &"a".repeat(401))];
        assert_eq!(counter.estimate(&messages), 101);
    }

    #[test]
    fn estimate_sums_across_messages() {
        let counter = TokenCounter::new();
        let messages = vec![
            text_message(Role::User, &"a".repeat(400)),
            text_message(Role::Assistant, &"b".repeat(400)),
        ];
        assert_eq!(counter.estimate(&messages), 200);
    }

    #[test]
    fn estimate_includes_tool_call_arguments() {
        let counter = TokenCounter::new();
        let messages = vec![ProviderMessage {
            role: Role::Assistant,
            content: vec![ContentPart::ToolUse {
                id: "tu_1".into(),
                name: "bash".into(),
                input: serde_json::json!({"command": "a".repeat(40)}),
            }],
        }];
        assert!(counter.estimate(&messages) > 0);
    }
}
