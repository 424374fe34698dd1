#![deny(missing_docs)]
//! Once/interval/cron job scheduling for the wick agent core.
//!
//! A [`Scheduler`] holds a flat table of [`ScheduledJob`]s and decides on
//! each [`Scheduler::tick`] which are due. Firing a job doesn't touch the
//! event log or conversation directly — it hands back a [`SchedulerFiring`]
//! for the caller (the agent core's turn loop) to act on, so this crate
//! has no dependency on the conversation or event-log types.

mod cron;
mod job;
mod scheduler;

pub use cron::CronExpr;
pub use job::{JobAction, JobSchedule, ScheduledJob};
pub use scheduler::{Scheduler, SchedulerFiring};
pub use wick_proto::SchedulerError;
