#![deny(missing_docs)]
//! # wick-core — the agent turn loop
//!
//! Wires every other `wick-*` crate together into a single stateful
//! [`Agent`]: an event log as the source of truth, a hook pipeline run
//! at the inbound/tool/outbound/transform checkpoints, autonomy and
//! safety gates around every tool call, memory recall, scheduler
//! ticking, and checkpoint/restore.
//!
//! `Agent` is generic over [`wick_provider::Provider`] rather than
//! boxing it — the same pattern the turn loop here is grounded on uses
//! for its model client.

mod activation_gate;
mod agent;
mod config;
mod convert;
mod error;
mod persistence;
mod response_cache;
mod sandbox;

pub use activation_gate::ActivationGate;
pub use agent::{Agent, RunOutcome, StreamOptions};
pub use config::{AgentConfig, AgentConfigBuilder};
pub use error::AgentError;
pub use persistence::{
    BlobStore, ConversationMeta, InMemoryBlobStore, InMemoryKvStore, KvStore, PersistenceError,
};
pub use response_cache::{InMemoryResponseCache, ResponseCache};
pub use sandbox::{CodeBlockExtractor, NullSandbox, Sandbox, SandboxResult};
