//! The Hook interface — observation and intervention in the turn loop.
//!
//! Six named pipeline points. A hook runs at exactly one point, carries
//! a priority (lower runs first, default 100), and returns a
//! [`HookResult`] that the pipeline folds into the next hook's context
//! or uses to short-circuit the pipeline.

use crate::{content::Content, duration::DurationMs, error::HookError, id::SessionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Where in the turn loop a hook fires.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    /// Before the user message is folded into the request — may block or
    /// rewrite the inbound content.
    BeforeInbound,
    /// Before a tool call is executed — may block, skip, or rewrite args.
    BeforeToolCall,
    /// Before the assistant response is returned to the host.
    BeforeOutbound,
    /// Given the raw provider response, before it's interpreted — may
    /// rewrite the response content wholesale.
    TransformResponse,
    /// Once, when a session/conversation starts.
    OnSessionStart,
    /// Once, when a session/conversation ends.
    OnSessionEnd,
}

/// Read-only context available to a hook at its firing point. Hooks
/// observe and decide — they don't mutate directly; mutation happens
/// via [`HookResult::Modify`] patches that the pipeline applies.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookContext {
    /// Current hook point.
    pub point: Option<HookPoint>,
    /// The inbound user message (only at `BeforeInbound`).
    pub message: Option<Content>,
    /// Current tool being called (only at `BeforeToolCall`).
    pub tool_name: Option<String>,
    /// Tool arguments (only at `BeforeToolCall`).
    pub tool_args: Option<serde_json::Value>,
    /// The outbound assistant response (at `BeforeOutbound`/`TransformResponse`).
    pub response: Option<Content>,
    /// The session this turn belongs to (at `OnSessionStart`/`OnSessionEnd`).
    pub session: Option<SessionId>,
    /// Running count of tokens used this turn.
    pub tokens_used: u64,
    /// Running cost in USD cents this turn.
    pub cost_cents: u64,
    /// Number of ReAct iterations completed so far.
    pub turns_completed: u32,
    /// Time elapsed since the turn started.
    pub elapsed: DurationMs,
}

impl HookContext {
    /// Create a new, otherwise-empty context for the given point.
    pub fn new(point: HookPoint) -> Self {
        Self {
            point: Some(point),
            ..Default::default()
        }
    }

    /// Apply a JSON patch produced by [`HookResult::Modify`] onto this
    /// context. Only known, non-null fields in `patch` overwrite the
    /// corresponding field; unknown keys are ignored.
    pub fn apply_patch(&mut self, patch: serde_json::Value) {
        let Some(obj) = patch.as_object() else {
            return;
        };
        if let Some(v) = obj.get("message") {
            if let Ok(c) = serde_json::from_value::<Content>(v.clone()) {
                self.message = Some(c);
            }
        }
        if let Some(v) = obj.get("tool_args") {
            self.tool_args = Some(v.clone());
        }
        if let Some(v) = obj.get("tool_name").and_then(|v| v.as_str()) {
            self.tool_name = Some(v.to_string());
        }
        if let Some(v) = obj.get("response") {
            if let Ok(c) = serde_json::from_value::<Content>(v.clone()) {
                self.response = Some(c);
            }
        }
    }
}

/// What a hook decides to do.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HookResult {
    /// Continue normally.
    Continue,
    /// Skip the current operation (only meaningful at `BeforeToolCall`):
    /// the tool is not executed and a synthetic result is backfilled.
    Skip,
    /// Block the pipeline. The turn halts — at `BeforeInbound` this
    /// fails the whole turn; at `BeforeToolCall` it fails only that call.
    Block {
        /// Optional human-readable reason.
        reason: Option<String>,
    },
    /// Modify the context in place for subsequent hooks and for the
    /// operation that follows the pipeline.
    Modify {
        /// Partial context patch; see [`HookContext::apply_patch`].
        data: serde_json::Value,
    },
}

/// A hook that can observe and intervene in the turn loop.
///
/// Hooks are registered externally and the turn loop calls them at
/// their declared point, in ascending priority order. Hook handlers
/// SHOULD complete quickly — an LLM-based guardrail that calls a model
/// on every tool use adds latency to every tool call.
#[async_trait]
pub trait Hook: Send + Sync {
    /// A human-readable name, used in serialization and logs.
    fn name(&self) -> &str;

    /// Which point this hook fires at.
    fn point(&self) -> HookPoint;

    /// Dispatch priority; lower runs first. Default 100.
    fn priority(&self) -> i32 {
        100
    }

    /// Whether this hook is currently active.
    fn enabled(&self) -> bool {
        true
    }

    /// Called when the pipeline reaches this hook's point.
    ///
    /// Returning an error does NOT block the turn — it is logged and
    /// treated as `Continue`. Use `HookResult::Block` to block.
    async fn execute(&self, ctx: &HookContext) -> Result<HookResult, HookError>;
}
