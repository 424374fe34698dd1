//! The autonomy controller: permission gating plus rolling hourly and
//! daily rate/cost windows.

use crate::cost::estimate_cost;
use crate::level::{is_read_set, AutonomyLevel};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use wick_provider::TokenUsage;
use wick_tool::PermissionClass;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// Result of a [`AutonomyController::check_limits`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitStatus {
    /// No limit reached; execution may proceed.
    Allowed,
    /// A limit was reached. `reason` includes the remaining wait.
    Blocked {
        /// Human-readable reason, including the remaining wait.
        reason: String,
    },
}

/// Static budget configuration for an [`AutonomyController`].
#[derive(Debug, Clone)]
pub struct AutonomyBudget {
    /// Maximum tool invocations per rolling hour.
    pub max_actions_per_hour: u32,
    /// Maximum USD spend per rolling day.
    pub max_cost_per_day: Decimal,
}

impl Default for AutonomyBudget {
    fn default() -> Self {
        Self {
            max_actions_per_hour: 100,
            max_cost_per_day: Decimal::from(20),
        }
    }
}

/// Gates tool execution by permission class and by rolling hourly
/// action / daily cost budgets.
///
/// The hourly window resets when more than an hour has elapsed since
/// `hour_start`; the daily window resets when more than a day has
/// elapsed since `day_start`, advancing to the start of the local day
/// rather than simply adding 24h, so a short clock skew cannot shift
/// the reset boundary away from midnight. Both resets happen lazily,
/// only inside [`AutonomyController::check_limits`] — there is no
/// background timer.
#[derive(Debug, Clone)]
pub struct AutonomyController {
    level: AutonomyLevel,
    budget: AutonomyBudget,
    hour_start: i64,
    hour_count: u32,
    day_start: i64,
    day_cost: Decimal,
}

impl AutonomyController {
    /// Construct a controller at the given level and budget, with
    /// both windows starting at `now_ms`.
    pub fn new(level: AutonomyLevel, budget: AutonomyBudget, now_ms: i64) -> Self {
        Self {
            level,
            budget,
            hour_start: now_ms,
            hour_count: 0,
            day_start: start_of_local_day(now_ms),
            day_cost: Decimal::ZERO,
        }
    }

    /// Current autonomy level.
    pub fn level(&self) -> AutonomyLevel {
        self.level
    }

    /// Change the autonomy level (e.g. a host-initiated escalation or
    /// de-escalation). Does not reset either window.
    pub fn set_level(&mut self, level: AutonomyLevel) {
        self.level = level;
    }

    /// At `ReadOnly`, only read-set tools pass; at `Supervised` and
    /// `Full`, all tools pass.
    pub fn can_execute_tool(&self, class: PermissionClass) -> bool {
        match self.level {
            AutonomyLevel::ReadOnly => is_read_set(class),
            AutonomyLevel::Supervised | AutonomyLevel::Full => true,
        }
    }

    /// True only when the level is `Supervised` and the tool is
    /// non-read — `ReadOnly` already rejects non-read tools outright,
    /// and `Full` never requires approval.
    pub fn needs_approval(&self, class: PermissionClass) -> bool {
        self.level == AutonomyLevel::Supervised && !is_read_set(class)
    }

    /// Roll the hourly/daily windows forward if they've expired, then
    /// report whether either budget has been exhausted.
    pub fn check_limits(&mut self, now_ms: i64) -> LimitStatus {
        if now_ms - self.hour_start > HOUR_MS {
            tracing::info!("autonomy hourly window reset");
            self.hour_start = now_ms;
            self.hour_count = 0;
        }
        if now_ms - self.day_start > DAY_MS {
            tracing::info!("autonomy daily window reset");
            self.day_start = start_of_local_day(now_ms);
            self.day_cost = Decimal::ZERO;
        }

        if self.hour_count >= self.budget.max_actions_per_hour {
            let remaining = (HOUR_MS - (now_ms - self.hour_start)).max(0);
            return LimitStatus::Blocked {
                reason: format!("hourly action limit of {} reached; retry in {}ms", self.budget.max_actions_per_hour, remaining),
            };
        }
        if self.day_cost >= self.budget.max_cost_per_day {
            let remaining = (DAY_MS - (now_ms - self.day_start)).max(0);
            return LimitStatus::Blocked {
                reason: format!("daily cost limit of {} reached; retry in {}ms", self.budget.max_cost_per_day, remaining),
            };
        }
        LimitStatus::Allowed
    }

    /// Record a successful tool invocation against the hourly counter.
    pub fn record_action(&mut self) {
        self.hour_count += 1;
    }

    /// Record the cost of an LLM call against the daily counter,
    /// estimated from `(model, usage)`. Returns the estimated cost.
    pub fn record_cost(&mut self, model: &str, usage: &TokenUsage) -> Decimal {
        let cost = estimate_cost(model, usage);
        self.day_cost += cost;
        cost
    }

    /// Actions recorded in the current hourly window.
    pub fn hour_count(&self) -> u32 {
        self.hour_count
    }

    /// Cost recorded in the current daily window.
    pub fn day_cost(&self) -> Decimal {
        self.day_cost
    }
}

fn start_of_local_day(now_ms: i64) -> i64 {
    let dt = Utc.timestamp_millis_opt(now_ms).single().unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap());
    dt.date_naive().and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u64, output: u64) -> TokenUsage {
        TokenUsage {
            input_tokens: input,
            output_tokens: output,
            cache_read_tokens: None,
            cache_creation_tokens: None,
        }
    }

    #[test]
    fn readonly_rejects_non_read_tools() {
        let ctl = AutonomyController::new(AutonomyLevel::ReadOnly, AutonomyBudget::default(), 0);
        assert!(ctl.can_execute_tool(PermissionClass::Read));
        assert!(ctl.can_execute_tool(PermissionClass::Internal));
        assert!(!ctl.can_execute_tool(PermissionClass::Write));
        assert!(!ctl.can_execute_tool(PermissionClass::Network));
    }

    #[test]
    fn supervised_and_full_execute_everything() {
        let supervised = AutonomyController::new(AutonomyLevel::Supervised, AutonomyBudget::default(), 0);
        let full = AutonomyController::new(AutonomyLevel::Full, AutonomyBudget::default(), 0);
        for class in [
            PermissionClass::Internal,
            PermissionClass::Read,
            PermissionClass::Write,
            PermissionClass::Approve,
            PermissionClass::Network,
            PermissionClass::Browser,
        ] {
            assert!(supervised.can_execute_tool(class));
            assert!(full.can_execute_tool(class));
        }
    }

    #[test]
    fn only_supervised_non_read_needs_approval() {
        let supervised = AutonomyController::new(AutonomyLevel::Supervised, AutonomyBudget::default(), 0);
        let full = AutonomyController::new(AutonomyLevel::Full, AutonomyBudget::default(), 0);
        let readonly = AutonomyController::new(AutonomyLevel::ReadOnly, AutonomyBudget::default(), 0);

        assert!(supervised.needs_approval(PermissionClass::Write));
        assert!(!supervised.needs_approval(PermissionClass::Read));
        assert!(!full.needs_approval(PermissionClass::Write));
        assert!(!readonly.needs_approval(PermissionClass::Write));
    }

    #[test]
    fn hourly_limit_blocks_then_resets_after_an_hour() {
        let budget = AutonomyBudget {
            max_actions_per_hour: 2,
            max_cost_per_day: Decimal::from(1000),
        };
        let mut ctl = AutonomyController::new(AutonomyLevel::Full, budget, 0);
        assert_eq!(ctl.check_limits(0), LimitStatus::Allowed);
        ctl.record_action();
        assert_eq!(ctl.check_limits(100), LimitStatus::Allowed);
        ctl.record_action();

        match ctl.check_limits(200) {
            LimitStatus::Blocked { reason } => assert!(reason.contains("hourly")),
            LimitStatus::Allowed => panic!("expected blocked"),
        }

        // past the hourly window, the counter resets
        assert_eq!(ctl.check_limits(HOUR_MS + 1), LimitStatus::Allowed);
    }

    #[test]
    fn daily_cost_limit_blocks_until_day_rolls_over() {
        let budget = AutonomyBudget {
            max_actions_per_hour: 1000,
            max_cost_per_day: Decimal::from(1),
        };
        let mut ctl = AutonomyController::new(AutonomyLevel::Full, budget, 0);
        ctl.record_cost("claude-opus-4", &usage(1_000_000, 0));

        match ctl.check_limits(1000) {
            LimitStatus::Blocked { reason } => assert!(reason.contains("daily")),
            LimitStatus::Allowed => panic!("expected blocked"),
        }

        assert_eq!(ctl.check_limits(DAY_MS + 1), LimitStatus::Allowed);
        assert_eq!(ctl.day_cost(), Decimal::ZERO);
    }

    #[test]
    fn record_action_increments_hour_count() {
        let mut ctl = AutonomyController::new(AutonomyLevel::Full, AutonomyBudget::default(), 0);
        ctl.record_action();
        ctl.record_action();
        assert_eq!(ctl.hour_count(), 2);
    }
}
