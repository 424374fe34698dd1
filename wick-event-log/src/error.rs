//! Errors from event-log encode/decode.

use thiserror::Error;

/// Errors from serializing or deserializing an event log.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventLogError {
    /// A JSONL line failed to decode. The whole decode fails — the log is
    /// never partially materialized from a corrupt archive.
    #[error("malformed event log line {line}: {source}")]
    DecodeFailed {
        /// 1-indexed line number that failed to parse.
        line: usize,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
