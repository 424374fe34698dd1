//! The append-only event log itself: sequencing, append, and the JSONL
//! codec. Derivations (history/goals/tool-call view) live in [`crate::derive`]
//! as pure functions over `&[Event]` — they never touch `EventLog` state
//! directly, so two logs with equal event sequences always derive equal
//! results.

use crate::error::EventLogError;
use std::time::{SystemTime, UNIX_EPOCH};
use wick_proto::{Event, EventSource, EventType};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Append-only, totally-ordered sequence of [`Event`]s.
///
/// The sole source of truth from which conversation history, the goal
/// list, and the tool-call view are derived. There is no edit and no
/// delete — only [`EventLog::append`].
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new, empty log.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Construct a log directly from an existing, already-ordered event
    /// sequence (used by [`EventLog::from_jsonl`] and checkpoint restore).
    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// All events in append order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append a new event. Never fails: assigns the next sequence number
    /// and the current wall-clock timestamp, then appends.
    pub fn append(&mut self, event_type: EventType, payload: serde_json::Value, source: EventSource) -> Event {
        let seq = self.events.len() as u64;
        let timestamp = now_ms();
        let event = Event::new(seq, timestamp, event_type, payload, source);
        tracing::debug!(seq, event_type = ?event.event_type, "appended event");
        self.events.push(event.clone());
        event
    }

    /// Serialize to JSONL — one event per line, UTF-8.
    pub fn to_jsonl(&self) -> String {
        self.events
            .iter()
            .map(|e| serde_json::to_string(e).expect("Event serialization is infallible"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Decode a JSONL document into a log. Blank/whitespace-only lines
    /// are skipped; any malformed line fails the whole decode — the log
    /// is never partially materialized.
    pub fn from_jsonl(text: &str) -> Result<Self, EventLogError> {
        let mut events = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(line).map_err(|source| EventLogError::DecodeFailed { line: idx + 1, source })?;
            events.push(event);
        }
        Ok(Self { events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_assigns_sequential_seq() {
        let mut log = EventLog::new();
        let e0 = log.append(EventType::UserMessage, json!({"text": "hi"}), EventSource::User);
        let e1 = log.append(EventType::AgentMessage, json!({"text": "hello"}), EventSource::Agent);
        assert_eq!(e0.seq, 0);
        assert_eq!(e1.seq, 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn jsonl_roundtrip_is_identity() {
        let mut log = EventLog::new();
        log.append(EventType::UserMessage, json!({"text": "hi"}), EventSource::User);
        log.append(EventType::AgentMessage, json!({"text": "hello"}), EventSource::Agent);

        let encoded = log.to_jsonl();
        let decoded = EventLog::from_jsonl(&encoded).unwrap();
        assert_eq!(decoded.len(), log.len());
        for (a, b) in log.events().iter().zip(decoded.events().iter()) {
            assert_eq!(a.seq, b.seq);
            assert_eq!(a.event_type, b.event_type);
            assert_eq!(a.payload, b.payload);
        }
    }

    #[test]
    fn from_jsonl_skips_blank_lines() {
        let text = "\n   \n";
        let log = EventLog::from_jsonl(text).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn from_jsonl_fails_whole_decode_on_malformed_line() {
        let text = "{\"bad json\n{}";
        let result = EventLog::from_jsonl(text);
        assert!(result.is_err());
    }

    #[test]
    fn from_jsonl_one_malformed_line_among_valid_ones_fails() {
        let mut log = EventLog::new();
        log.append(EventType::UserMessage, json!({"text": "hi"}), EventSource::User);
        let mut text = log.to_jsonl();
        text.push_str("\nnot valid json at all {{{");
        assert!(EventLog::from_jsonl(&text).is_err());
    }
}
