//! Error types for each protocol/component.

use thiserror::Error;

/// Hook errors. These are logged but do NOT halt the turn — only
/// `HookResult::Block` halts it.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook execution failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Autonomy-controller errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AutonomyError {
    /// The tool's permission class is not allowed at the current autonomy level.
    #[error("blocked: agent is in {level} mode")]
    LevelDenied {
        /// The current autonomy level.
        level: String,
    },

    /// An hourly or daily rate/cost limit has been reached.
    #[error("rate limited: {0}")]
    LimitReached(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Safety-pipeline errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SafetyError {
    /// A tool-argument validation issue was critical or high severity.
    #[error("safety: {0}")]
    ValidationFailed(String),

    /// The pipeline was asked to disable without a prior confirmation call.
    #[error("cannot disable safety pipeline without confirmDisable()")]
    DisableNotConfirmed,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Semantic-memory errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The referenced memory entry does not exist.
    #[error("memory entry not found: {0}")]
    NotFound(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Scheduler errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression failed to parse.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// The referenced job does not exist.
    #[error("job not found: {0}")]
    NotFound(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
