#![deny(missing_docs)]
//! The append-only event log and its pure derivations.
//!
//! [`EventLog`] is the sole source of truth from which conversation
//! history, the goal list, and the tool-call view are derived — see
//! [`derive`] for those derivations. Durability is a plain JSONL
//! round-trip ([`EventLog::to_jsonl`]/[`EventLog::from_jsonl`]).

pub mod derive;
pub mod error;
pub mod log;

pub use derive::{derive_goals, derive_session_history, derive_tool_call_log, slice_to_turn_end, Goal, GoalStatus, Message, Role, ToolCallEntry, ToolCallStub};
pub use error::EventLogError;
pub use log::EventLog;
