#![deny(missing_docs)]
//! Token estimation and context compaction for the wick agent core.
//!
//! [`token_counter`] gives the turn loop a cheap, provider-agnostic signal
//! for "are we close to the context limit"; [`compaction`] collapses
//! everything but the system message and the most recent messages into a
//! single synthetic summary exchange once that signal crosses a threshold.

pub mod compaction;
pub mod token_counter;

pub use compaction::{compact, CompactionResult, DEFAULT_KEEP_LAST, DEFAULT_THRESHOLD};
pub use token_counter::TokenCounter;
