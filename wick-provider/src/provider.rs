//! Provider trait for LLM backends.
//!
//! [`Provider`] uses RPITIT (return-position `impl Trait` in traits)
//! and is intentionally NOT object-safe. The object-safe boundary is
//! `wick_proto::Turn` — `wick-core`'s turn implementation is generic
//! over `P: Provider`.

use crate::types::{ProviderRequest, ProviderResponse, StreamChunk};
use std::future::Future;
use thiserror::Error;

/// Errors from LLM providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// Could not parse the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited | ProviderError::RequestFailed(_))
    }
}

/// LLM provider interface.
///
/// Each concrete provider (Anthropic-shaped HTTP, OpenAI-shaped HTTP,
/// a local model) implements this trait. Provider-native features
/// (prompt caching, thinking blocks, truncation telemetry) are handled
/// by the implementation using `ProviderRequest.extra`.
pub trait Provider: Send + Sync {
    /// Whether this provider accepts a native `tools` field on the
    /// request. When false, the agent core injects a tool-calling
    /// prompt into the system message and relies on the
    /// code-execution fallback to interpret the response instead.
    fn supports_native_tools(&self) -> bool;

    /// Whether this provider implements [`Provider::stream`].
    fn supports_streaming(&self) -> bool;

    /// Send a completion request to the provider.
    fn complete(&self, request: ProviderRequest) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send;

    /// Send a streaming completion request. Implementations that
    /// report `supports_streaming() == false` may panic or return an
    /// immediate `Error` chunk; callers must check the flag first.
    fn stream(
        &self,
        request: ProviderRequest,
    ) -> impl Future<Output = Result<Vec<StreamChunk>, ProviderError>> + Send {
        let _ = request;
        async { Ok(vec![]) }
    }
}
