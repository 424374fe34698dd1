//! Optional response cache consulted before every provider call.
//!
//! Keyed on the exact request shape so a repeated prompt (a retried
//! scheduled job, a deterministic eval harness) can be served without
//! spending a model call. Not wired in by default — an [`crate::Agent`]
//! without a configured cache just always calls the provider.

use std::collections::HashMap;
use std::sync::Mutex;
use wick_provider::{ProviderMessage, ProviderResponse};

/// A cache of provider responses keyed by request shape.
pub trait ResponseCache: Send + Sync {
    /// Compute a cache key for a request. Implementations are free to
    /// hash however they like; the default in-memory cache uses the
    /// serialized messages plus model name.
    fn cache_key(&self, messages: &[ProviderMessage], model: Option<&str>) -> String;

    /// Look up a previously stored response.
    fn get(&self, key: &str) -> Option<ProviderResponse>;

    /// Store a response under a key.
    fn put(&self, key: String, response: ProviderResponse);
}

/// An in-process, unbounded response cache. Fine for tests and
/// single-session deterministic replay; a production deployment would
/// back this with a shared store instead.
#[derive(Default)]
pub struct InMemoryResponseCache {
    entries: Mutex<HashMap<String, ProviderResponse>>,
}

impl InMemoryResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn cache_key(&self, messages: &[ProviderMessage], model: Option<&str>) -> String {
        let body = serde_json::to_string(messages).unwrap_or_default();
        format!("{}:{body}", model.unwrap_or("default"))
    }

    fn get(&self, key: &str) -> Option<ProviderResponse> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    fn put(&self, key: String, response: ProviderResponse) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(key, response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use wick_provider::{Role, StopReason, TokenUsage};

    fn response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![wick_provider::ContentPart::Text { text: text.to_string() }],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage { input_tokens: 1, output_tokens: 1, cache_read_tokens: None, cache_creation_tokens: None },
            model: "test-model".to_string(),
            cost: Some(Decimal::ZERO),
        }
    }

    #[test]
    fn stores_and_retrieves_by_key() {
        let cache = InMemoryResponseCache::new();
        let messages = vec![ProviderMessage {
            role: Role::User,
            content: vec![wick_provider::ContentPart::Text { text: "hi".to_string() }],
        }];
        let key = cache.cache_key(&messages, Some("test-model"));
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), response("hello"));
        assert_eq!(cache.get(&key).unwrap().text(), "hello");
    }
}
