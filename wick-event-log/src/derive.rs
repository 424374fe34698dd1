//! Pure derivations over an event slice: conversation history, the
//! tool-call view, the goal list, and turn slicing. None of these touch
//! `EventLog` directly — they take `&[Event]` so two logs with equal
//! event sequences always derive equal results.

use serde::{Deserialize, Serialize};
use wick_proto::{Event, EventType, EventId};

/// Who produced a derived conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Installed system prompt, if any.
    System,
    /// The human operator.
    User,
    /// The agent's own response.
    Assistant,
    /// A tool's result, tied back to its call by `call_id`.
    Tool,
}

/// A tool-call stub attached to an assistant message, as seen by the
/// derived conversation history (distinct from the richer tool-call
/// view produced by [`derive_tool_call_log`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallStub {
    /// Id correlating this call to its eventual `tool_result`.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Arguments as submitted by the provider.
    pub arguments: serde_json::Value,
}

/// One message in the derived conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// Text content, if any.
    pub content: Option<String>,
    /// Tool calls attached to this message (only ever populated on
    /// `Assistant` messages).
    pub tool_calls: Vec<ToolCallStub>,
    /// For `Tool` messages, the call this result answers.
    pub call_id: Option<String>,
}

impl Message {
    fn new(role: Role) -> Self {
        Self {
            role,
            content: None,
            tool_calls: Vec::new(),
            call_id: None,
        }
    }
}

fn payload_str(payload: &serde_json::Value, field: &str) -> Option<String> {
    payload.get(field).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Scan `events` into a conversation history, optionally prefixed with a
/// system message. `user_message` emits a user message; `agent_message`
/// emits an assistant message that becomes the current sink for
/// subsequent `tool_call` events until the next `user_message` or
/// `agent_message`; `tool_result` emits a tool message tied by
/// `call_id`. All other event types are invisible to this derivation.
pub fn derive_session_history(events: &[Event], system_prompt: Option<&str>) -> Vec<Message> {
    let mut messages = Vec::new();
    if let Some(prompt) = system_prompt {
        let mut msg = Message::new(Role::System);
        msg.content = Some(prompt.to_string());
        messages.push(msg);
    }

    let mut sink_idx: Option<usize> = None;
    for event in events {
        match event.event_type {
            EventType::UserMessage => {
                let mut msg = Message::new(Role::User);
                msg.content = payload_str(&event.payload, "content").or_else(|| payload_str(&event.payload, "text"));
                messages.push(msg);
                sink_idx = None;
            }
            EventType::AgentMessage => {
                let mut msg = Message::new(Role::Assistant);
                msg.content = payload_str(&event.payload, "content").or_else(|| payload_str(&event.payload, "text"));
                messages.push(msg);
                sink_idx = Some(messages.len() - 1);
            }
            EventType::ToolCall => {
                if let Some(idx) = sink_idx {
                    let call_id = payload_str(&event.payload, "call_id").unwrap_or_default();
                    let name = payload_str(&event.payload, "name").unwrap_or_default();
                    let arguments = event.payload.get("arguments").cloned().unwrap_or(serde_json::Value::Null);
                    messages[idx].tool_calls.push(ToolCallStub { call_id, name, arguments });
                }
            }
            EventType::ToolResult => {
                let mut msg = Message::new(Role::Tool);
                msg.content = payload_str(&event.payload, "content").or_else(|| payload_str(&event.payload, "result"));
                msg.call_id = payload_str(&event.payload, "call_id");
                messages.push(msg);
            }
            _ => {}
        }
    }

    messages
}

/// One entry in the tool-call view: a call paired with its result, if
/// the result has arrived yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEntry {
    /// Correlation id between the call and its result.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Arguments as submitted.
    pub arguments: serde_json::Value,
    /// The result payload, `None` while pending.
    pub result: Option<serde_json::Value>,
    /// Whether the result, once it arrived, marked an error.
    pub is_error: bool,
}

/// Pair each `tool_call` with its `tool_result` by `call_id`. Unpaired
/// calls appear with `result: None`, in first-appearance order.
pub fn derive_tool_call_log(events: &[Event]) -> Vec<ToolCallEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut entries: std::collections::HashMap<String, ToolCallEntry> = std::collections::HashMap::new();

    for event in events {
        match event.event_type {
            EventType::ToolCall => {
                let call_id = payload_str(&event.payload, "call_id").unwrap_or_default();
                let name = payload_str(&event.payload, "name").unwrap_or_default();
                let arguments = event.payload.get("arguments").cloned().unwrap_or(serde_json::Value::Null);
                order.push(call_id.clone());
                entries.insert(
                    call_id.clone(),
                    ToolCallEntry {
                        call_id,
                        name,
                        arguments,
                        result: None,
                        is_error: false,
                    },
                );
            }
            EventType::ToolResult => {
                let call_id = payload_str(&event.payload, "call_id").unwrap_or_default();
                if let Some(entry) = entries.get_mut(&call_id) {
                    entry.result = event.payload.get("result").cloned().or_else(|| event.payload.get("content").cloned());
                    entry.is_error = event.payload.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false);
                }
            }
            _ => {}
        }
    }

    order.into_iter().filter_map(|id| entries.remove(&id)).collect()
}

/// A goal's lifecycle state. Repeated `completeGoal`/`failGoal` calls
/// leave a goal in that status rather than flipping it — setting the
/// same status twice is a no-op, not a cycle back to `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Not yet completed or failed.
    Active,
    /// Finished successfully.
    Completed,
    /// Abandoned or unrecoverable.
    Failed,
}

/// A goal as folded from `goal_added`/`goal_updated` events, per
/// spec's `{id, description, status, created_at, updated_at,
/// sub_goals[], artifacts[]}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Goal id.
    pub id: String,
    /// Human-readable description, as set by the `goal_added` event
    /// (or the most recent update that supplied one).
    pub description: String,
    /// Current lifecycle status.
    pub status: GoalStatus,
    /// When the goal was first added, epoch milliseconds.
    pub created_at: u64,
    /// When the goal was last touched by a `goal_added`/`goal_updated`
    /// event, epoch milliseconds.
    pub updated_at: u64,
    /// Ids of subordinate goals, if this goal was decomposed.
    pub sub_goals: Vec<String>,
    /// References (paths, urls, memory keys) to artifacts produced
    /// while pursuing this goal.
    pub artifacts: Vec<String>,
}

fn payload_string_list(payload: &serde_json::Value, field: &str) -> Option<Vec<String>> {
    payload.get(field)?.as_array().map(|items| {
        items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
    })
}

fn payload_status(payload: &serde_json::Value) -> Option<GoalStatus> {
    match payload_str(payload, "status")?.as_str() {
        "active" => Some(GoalStatus::Active),
        "completed" => Some(GoalStatus::Completed),
        "failed" => Some(GoalStatus::Failed),
        _ => None,
    }
}

/// Fold `goal_added`/`goal_updated` events into a goal list keyed by
/// goal id, in first-appearance order. A goal_added event seeds
/// `description`/`created_at`/`sub_goals`/`artifacts`; goal_updated
/// events overwrite only the fields present in their payload.
pub fn derive_goals(events: &[Event]) -> Vec<Goal> {
    let mut order: Vec<String> = Vec::new();
    let mut goals: std::collections::HashMap<String, Goal> = std::collections::HashMap::new();

    for event in events {
        match event.event_type {
            EventType::GoalAdded | EventType::GoalUpdated => {
                let id = payload_str(&event.payload, "id").unwrap_or_default();
                let entry = goals.entry(id.clone()).or_insert_with(|| {
                    order.push(id.clone());
                    Goal {
                        id: id.clone(),
                        description: String::new(),
                        status: GoalStatus::Active,
                        created_at: event.timestamp,
                        updated_at: event.timestamp,
                        sub_goals: Vec::new(),
                        artifacts: Vec::new(),
                    }
                });
                if let Some(description) = payload_str(&event.payload, "description") {
                    entry.description = description;
                }
                if let Some(status) = payload_status(&event.payload) {
                    entry.status = status;
                }
                if let Some(sub_goals) = payload_string_list(&event.payload, "sub_goals") {
                    entry.sub_goals = sub_goals;
                }
                if let Some(artifacts) = payload_string_list(&event.payload, "artifacts") {
                    entry.artifacts = artifacts;
                }
                entry.updated_at = event.timestamp;
            }
            _ => {}
        }
    }

    order.into_iter().filter_map(|id| goals.remove(&id)).collect()
}

/// Return the prefix of `events` up to the end of the turn containing
/// `event_id`. A turn begins at a `user_message` and extends to (but
/// excludes) the next `user_message`. Returns `None` if `event_id` is
/// not found.
pub fn slice_to_turn_end(events: &[Event], event_id: &EventId) -> Option<Vec<Event>> {
    let target_idx = events.iter().position(|e| &e.id == event_id)?;

    let turn_start = events[..=target_idx]
        .iter()
        .rposition(|e| e.event_type == EventType::UserMessage)
        .unwrap_or(0);

    let turn_end = events[turn_start + 1..]
        .iter()
        .position(|e| e.event_type == EventType::UserMessage)
        .map(|offset| turn_start + offset)
        .unwrap_or(events.len() - 1);

    Some(events[..=turn_end].to_vec())
}
