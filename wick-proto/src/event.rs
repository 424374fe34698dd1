//! The event log's record type. Append-only, immutable once appended —
//! the sole source of truth from which conversation history, goals,
//! and tool-call views are derived.

use crate::id::EventId;
use serde::{Deserialize, Serialize};

/// Who or what produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Produced by the human operator.
    User,
    /// Produced by the agent (provider response, tool call).
    Agent,
    /// Produced by the runtime itself (autonomy block, scheduler, error).
    System,
}

/// The closed set of event types. Closed deliberately — the log is a
/// replay source, and an open-ended type set would make derivation
/// functions unable to exhaustively match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A message submitted by the host on behalf of the user.
    UserMessage,
    /// A response produced by the agent.
    AgentMessage,
    /// A tool-call stub emitted by the provider.
    ToolCall,
    /// The result of executing a tool call.
    ToolResult,
    /// A tool result that was truncated before being stored.
    ToolResultTruncated,
    /// A goal was added to the goal list.
    GoalAdded,
    /// An existing goal's status or fields changed.
    GoalUpdated,
    /// A value was written to semantic memory.
    MemoryStored,
    /// A value was removed from semantic memory.
    MemoryForgotten,
    /// A response was served from the response cache.
    CacheHit,
    /// A streaming provider call failed mid-stream.
    StreamError,
    /// The autonomy controller blocked a turn or tool call.
    AutonomyBlocked,
    /// The context window was compacted.
    ContextCompacted,
    /// A scheduler job was added.
    SchedulerAdded,
    /// A scheduler job was removed.
    SchedulerRemoved,
    /// A scheduler job fired, injecting a user message.
    SchedulerFired,
    /// An unrecoverable error occurred.
    Error,
}

/// A single, immutable entry in the event log.
///
/// Invariants: `id` is globally unique within one log instance;
/// `seq` increases by exactly one per append; once appended, an event
/// is never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique id, of the form `evt_<ts>_<seq>`.
    pub id: EventId,
    /// Monotonic sequence number within this log instance, starting at 0.
    pub seq: u64,
    /// Wall-clock time the event was appended, in epoch milliseconds.
    pub timestamp: u64,
    /// The discriminated event type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// The typed payload. Shape depends on `event_type`; stored as JSON
    /// because the set of payload shapes is closed but heterogeneous
    /// and the log's own (de)serialization must not depend on knowing
    /// every payload shape to round-trip correctly.
    pub payload: serde_json::Value,
    /// Who or what produced this event.
    pub source: EventSource,
}

impl Event {
    /// Construct an event id of the documented `evt_<ts>_<seq>` form.
    pub fn make_id(timestamp: u64, seq: u64) -> EventId {
        EventId::new(format!("evt_{timestamp}_{seq}"))
    }

    /// Build a new event. `seq` and `timestamp` are supplied by the
    /// caller (the event log owns sequencing and clock access).
    pub fn new(
        seq: u64,
        timestamp: u64,
        event_type: EventType,
        payload: serde_json::Value,
        source: EventSource,
    ) -> Self {
        Self {
            id: Self::make_id(timestamp, seq),
            seq,
            timestamp,
            event_type,
            payload,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_has_documented_form() {
        let e = Event::new(3, 1_700_000_000_000, EventType::UserMessage, serde_json::json!({"text": "hi"}), EventSource::User);
        assert_eq!(e.id.as_str(), "evt_1700000000000_3");
        assert_eq!(e.seq, 3);
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_value(EventType::ToolResultTruncated).unwrap();
        assert_eq!(json, serde_json::json!("tool_result_truncated"));
    }

    #[test]
    fn event_roundtrips_through_json() {
        let e = Event::new(0, 1, EventType::GoalAdded, serde_json::json!({"id": "g1"}), EventSource::Agent);
        let s = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&s).unwrap();
        assert_eq!(back.seq, e.seq);
        assert_eq!(back.event_type, e.event_type);
    }
}
