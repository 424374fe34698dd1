#![deny(missing_docs)]
//! # wick — umbrella crate
//!
//! Single import surface for the wick agent runtime. Re-exports the
//! protocol and component crates behind feature flags, plus a
//! `prelude` for the happy path of building and driving an [`Agent`].
//!
//! [`Agent`]: wick_core::Agent

#[cfg(feature = "core")]
pub use wick_autonomy;
#[cfg(feature = "agent")]
pub use wick_core;
#[cfg(feature = "core")]
pub use wick_context;
#[cfg(feature = "core")]
pub use wick_event_log;
#[cfg(feature = "core")]
pub use wick_hooks;
#[cfg(feature = "core")]
pub use wick_memory;
#[cfg(feature = "core")]
pub use wick_proto;
#[cfg(feature = "core")]
pub use wick_provider;
#[cfg(feature = "provider-http")]
pub use wick_provider_http;
#[cfg(feature = "core")]
pub use wick_safety;
#[cfg(feature = "core")]
pub use wick_scheduler;
#[cfg(feature = "core")]
pub use wick_tool;

/// Happy-path imports for composing a wick agent.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use wick_proto::{
        AgentId, Content, ContentBlock, Hook, HookContext, HookPoint, HookResult, SessionId,
        WorkflowId,
    };

    #[cfg(feature = "core")]
    pub use wick_hooks::HookRegistry;

    #[cfg(feature = "core")]
    pub use wick_tool::{ToolDyn, ToolError, ToolRegistry};

    #[cfg(feature = "core")]
    pub use wick_provider::{Provider, ProviderError};

    #[cfg(feature = "agent")]
    pub use wick_core::{Agent, AgentConfig, AgentConfigBuilder};

    #[cfg(feature = "provider-http")]
    pub use wick_provider_http::HttpProvider;
}
