//! Top-level error type for agent-core operations that don't already
//! have a home in a collaborator crate's error enum.

use thiserror::Error;

/// Errors from [`crate::Agent`] operations that span more than one
/// collaborator crate (persistence, sandbox execution, the provider
/// turn loop) or that don't fit a single collaborator's error enum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// `run` was called with no pending user message.
    #[error("no pending message: call send_message before run")]
    NoPendingMessage,

    /// Checkpoint/restore or conversation-archive failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] crate::persistence::PersistenceError),

    /// Anything else.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
