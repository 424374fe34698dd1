#![deny(missing_docs)]
//! Permission levels, rolling rate/cost budgets, and per-model cost
//! estimation for the wick agent core.
//!
//! [`AutonomyController`] is the single gate the turn loop consults
//! before every tool call and after every provider call: it decides
//! whether a tool may run at all ([`AutonomyController::can_execute_tool`]),
//! whether it needs human sign-off
//! ([`AutonomyController::needs_approval`]), and whether the rolling
//! hourly/daily budgets still have room
//! ([`AutonomyController::check_limits`]).

pub mod controller;
pub mod cost;
pub mod level;

pub use controller::{AutonomyBudget, AutonomyController, LimitStatus};
pub use cost::estimate_cost;
pub use level::{is_read_set, AutonomyLevel};
pub use wick_proto::AutonomyError;
