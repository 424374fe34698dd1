//! The in-memory job table and its `tick` firing loop.

use crate::cron::CronExpr;
use crate::job::{JobAction, JobSchedule, ScheduledJob};
use tracing::debug;
use wick_proto::{JobId, SchedulerError};

/// One job firing produced by a `tick` call.
#[derive(Debug, Clone)]
pub struct SchedulerFiring {
    /// The job that fired.
    pub job_id: JobId,
    /// What it fired with.
    pub action: JobAction,
}

/// Holds the scheduled jobs for one agent and decides, on each `tick`,
/// which of them fire.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    next_id: u64,
}

impl Scheduler {
    /// An empty scheduler.
    pub fn new() -> Self {
        Self { jobs: Vec::new(), next_id: 0 }
    }

    /// Restore a scheduler from a checkpointed job list, picking up the
    /// id counter from the highest existing `job_<n>` id.
    pub fn from_jobs(jobs: Vec<ScheduledJob>) -> Self {
        let next_id = jobs
            .iter()
            .filter_map(|j| j.id.as_str().strip_prefix("job_"))
            .filter_map(|n| n.parse::<u64>().ok())
            .map(|n| n + 1)
            .max()
            .unwrap_or(0);
        Self { jobs, next_id }
    }

    /// Schedule a new job, returning its id.
    pub fn add_job(&mut self, schedule: JobSchedule, action: JobAction) -> JobId {
        let id = JobId::new(format!("job_{}", self.next_id));
        self.next_id += 1;
        self.jobs.push(ScheduledJob { id: id.clone(), schedule, action, paused: false });
        id
    }

    /// Add a job from a raw cron string, returning `SchedulerError::InvalidCron`
    /// if the expression doesn't parse.
    pub fn add_cron_job(&mut self, expr: &str, action: JobAction) -> Result<JobId, SchedulerError> {
        let expr = CronExpr::parse(expr).ok_or_else(|| SchedulerError::InvalidCron(expr.to_string()))?;
        Ok(self.add_job(JobSchedule::Cron { expr, last_fired_minute: None }, action))
    }

    /// All currently scheduled jobs, in creation order.
    pub fn list_jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Remove a job by id. Returns `true` if a job was removed.
    pub fn remove_job(&mut self, id: &JobId) -> bool {
        let len_before = self.jobs.len();
        self.jobs.retain(|j| &j.id != id);
        self.jobs.len() != len_before
    }

    /// Pause a job so `tick` skips it entirely. Returns `false` if no
    /// such job exists.
    pub fn pause_job(&mut self, id: &JobId) -> bool {
        self.set_paused(id, true)
    }

    /// Resume a paused job. Returns `false` if no such job exists.
    pub fn resume_job(&mut self, id: &JobId) -> bool {
        self.set_paused(id, false)
    }

    fn set_paused(&mut self, id: &JobId, paused: bool) -> bool {
        if let Some(job) = self.jobs.iter_mut().find(|j| &j.id == id) {
            job.paused = paused;
            true
        } else {
            false
        }
    }

    /// Snapshot the job table for checkpointing.
    pub fn snapshot(&self) -> Vec<ScheduledJob> {
        self.jobs.clone()
    }

    /// Evaluate every job against `now_ms` (epoch milliseconds) and fire
    /// whichever are due. Firing a job updates its schedule state in
    /// place so repeated `tick` calls don't double-fire.
    pub fn tick(&mut self, now_ms: i64) -> Vec<SchedulerFiring> {
        let mut firings = Vec::new();

        for job in &mut self.jobs {
            if job.paused {
                continue;
            }

            let fires = match &mut job.schedule {
                JobSchedule::Once { fire_at_ms, fired } => {
                    if !*fired && now_ms >= *fire_at_ms {
                        *fired = true;
                        true
                    } else {
                        false
                    }
                }
                JobSchedule::Interval { interval_ms, last_fired_ms } => {
                    if now_ms >= *last_fired_ms + *interval_ms {
                        *last_fired_ms = now_ms;
                        true
                    } else {
                        false
                    }
                }
                JobSchedule::Cron { expr, last_fired_minute } => {
                    let minute = now_ms.div_euclid(60_000);
                    if Some(minute) != *last_fired_minute && expr.matches(now_ms) {
                        *last_fired_minute = Some(minute);
                        true
                    } else {
                        false
                    }
                }
            };

            if fires {
                debug!(job_id = %job.id, "scheduled job fired");
                firings.push(SchedulerFiring { job_id: job.id.clone(), action: job.action.clone() });
            }
        }

        firings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(content: &str) -> JobAction {
        JobAction::AgentPrompt { content: content.to_string() }
    }

    #[test]
    fn once_fires_at_or_after_target_and_not_again() {
        let mut s = Scheduler::new();
        s.add_job(JobSchedule::Once { fire_at_ms: 1_000, fired: false }, prompt("hi"));

        assert!(s.tick(500).is_empty());
        assert_eq!(s.tick(1_000).len(), 1);
        assert!(s.tick(2_000).is_empty());
    }

    #[test]
    fn interval_refires_after_each_period() {
        let mut s = Scheduler::new();
        s.add_job(JobSchedule::Interval { interval_ms: 1_000, last_fired_ms: 0 }, prompt("tick"));

        assert!(s.tick(500).is_empty());
        assert_eq!(s.tick(1_000).len(), 1);
        assert!(s.tick(1_500).is_empty());
        assert_eq!(s.tick(2_000).len(), 1);
    }

    #[test]
    fn cron_fires_once_per_matching_minute() {
        let mut s = Scheduler::new();
        let id = s.add_cron_job("* * * * *", prompt("cron")).unwrap();
        assert_eq!(id.as_str(), "job_0");

        let minute_start_ms = 1_000 * 60_000;
        assert_eq!(s.tick(minute_start_ms).len(), 1);
        // Still within the same minute: no re-fire.
        assert!(s.tick(minute_start_ms + 30_000).is_empty());
        // Next minute: fires again.
        assert_eq!(s.tick(minute_start_ms + 60_000).len(), 1);
    }

    #[test]
    fn invalid_cron_expression_is_rejected() {
        let mut s = Scheduler::new();
        assert!(matches!(
            s.add_cron_job("bad expr", prompt("x")),
            Err(SchedulerError::InvalidCron(_))
        ));
    }

    #[test]
    fn paused_jobs_are_skipped() {
        let mut s = Scheduler::new();
        let id = s.add_job(JobSchedule::Once { fire_at_ms: 0, fired: false }, prompt("hi"));
        s.pause_job(&id);
        assert!(s.tick(1_000).is_empty());

        s.resume_job(&id);
        assert_eq!(s.tick(1_000).len(), 1);
    }

    #[test]
    fn remove_job_drops_it_from_future_ticks() {
        let mut s = Scheduler::new();
        let id = s.add_job(JobSchedule::Interval { interval_ms: 1, last_fired_ms: 0 }, prompt("x"));
        assert!(s.remove_job(&id));
        assert!(!s.remove_job(&id));
        assert!(s.tick(1_000).is_empty());
    }

    #[test]
    fn from_jobs_resumes_id_counter() {
        let mut s = Scheduler::new();
        s.add_job(JobSchedule::Once { fire_at_ms: 0, fired: false }, prompt("a"));
        s.add_job(JobSchedule::Once { fire_at_ms: 0, fired: false }, prompt("b"));
        let snapshot = s.snapshot();

        let mut restored = Scheduler::from_jobs(snapshot);
        let new_id = restored.add_job(JobSchedule::Once { fire_at_ms: 0, fired: false }, prompt("c"));
        assert_eq!(new_id.as_str(), "job_2");
    }
}
