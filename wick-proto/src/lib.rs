//! # wick-proto — protocol types for the wick agent core
//!
//! This crate defines the wire vocabulary and trait boundary shared by
//! every other `wick-*` crate: typed ids, universal content, the event
//! vocabulary, and the hook interface.
//!
//! ## Design principle
//!
//! Every trait here is operation-defined, not mechanism-defined. This
//! is what lets `wick-core`'s turn loop, a test harness, and a future
//! execution environment all share the same boundary.

#![deny(missing_docs)]

pub mod content;
pub mod duration;
pub mod error;
pub mod event;
pub mod hook;
pub mod id;

pub use content::{Content, ContentBlock, ImageSource};
pub use duration::DurationMs;
pub use error::{AutonomyError, HookError, MemoryError, SafetyError, SchedulerError};
pub use event::{Event, EventSource, EventType};
pub use hook::{Hook, HookContext, HookPoint, HookResult};
pub use id::{AgentId, EventId, JobId, MemoryId, ScopeId, SessionId, WorkflowId};
