//! Scheduled job definitions.

use crate::cron::CronExpr;
use serde::{Deserialize, Serialize};
use wick_proto::JobId;

/// What a firing job does. Only `AgentPrompt` is defined — a fired
/// job injects a user message into the conversation for the next
/// `run`/`run_stream` call to pick up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobAction {
    /// Append this content as a user message when the job fires.
    AgentPrompt {
        /// The message content to inject.
        content: String,
    },
}

/// When a job fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSchedule {
    /// Fires once, at or after `fire_at_ms`.
    Once {
        /// Epoch milliseconds the job becomes eligible to fire.
        fire_at_ms: i64,
        /// Whether this job has already fired.
        fired: bool,
    },
    /// Fires every `interval_ms`, starting from the job's creation time.
    Interval {
        /// Period between firings, in milliseconds.
        interval_ms: i64,
        /// The last time this job fired (or its creation time, if never).
        last_fired_ms: i64,
    },
    /// Fires on cron-expression matches, at most once per matching minute.
    Cron {
        /// The parsed cron expression.
        expr: CronExpr,
        /// The epoch-minute this job last fired in, if ever.
        last_fired_minute: Option<i64>,
    },
}

/// A single scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Unique id, of the form `job_<n>`.
    pub id: JobId,
    /// When this job fires.
    pub schedule: JobSchedule,
    /// What happens when it fires.
    pub action: JobAction,
    /// Paused jobs are skipped entirely by `tick`.
    pub paused: bool,
}
