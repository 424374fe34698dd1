#![deny(missing_docs)]
//! Provider contract for the wick agent core — the LLM backend
//! abstraction `wick-core`'s turn loop is generic over.

pub mod provider;
pub mod types;

pub use provider::{Provider, ProviderError};
pub use types::{
    ContentPart, ImageSource, ProviderMessage, ProviderRequest, ProviderResponse, Role, StopReason, StreamChunk,
    TokenUsage, ToolSchema,
};
