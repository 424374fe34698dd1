//! Checkpoint/restore and conversation archival.
//!
//! `KvStore`/`BlobStore` generalize the `Arc<RwLock<HashMap<...>>>`
//! pattern `wick_memory::MemoryStore` uses for its in-process state
//! into two small async-trait collaborators a host can back with a
//! real database or object store. The in-memory implementations here
//! are test doubles, not a production persistence layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use wick_event_log::{EventLog, EventLogError};
use wick_proto::{Event, EventSource, EventType};
use wick_scheduler::ScheduledJob;

/// Errors from checkpoint/restore and conversation archive operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// No data found at the given key/path.
    #[error("not found: {0}")]
    NotFound(String),
    /// Checkpoint or archive bytes didn't parse.
    #[error("deserialization failed: {0}")]
    Deserialize(#[from] serde_json::Error),
    /// Event-log JSONL decode failed.
    #[error("event log decode failed: {0}")]
    EventLog(#[from] EventLogError),
    /// The backing store failed the operation.
    #[error("store error: {0}")]
    Store(String),
}

/// Flat key-value storage for small agent state (config overrides,
/// the last-hygiene timestamp, anything that isn't the event log).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    /// Store a value by key, overwriting any existing value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError>;
    /// Remove a value by key.
    async fn delete(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Hierarchical blob storage for conversation archives, keyed by
/// slash-separated path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob by path.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    /// Store a blob by path, overwriting any existing blob.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), PersistenceError>;
    /// List paths under a prefix (non-recursive path listing is fine;
    /// the archive layout here is always two levels deep).
    async fn list(&self, prefix: &str) -> Result<Vec<String>, PersistenceError>;
}

/// In-memory `KvStore`, for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// In-memory `BlobStore`, for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryBlobStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().await.get(path).cloned())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), PersistenceError> {
        self.entries.lock().await.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .entries
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// The full state of an [`crate::Agent`], serialized. `session_history`
/// is the raw event log — everything else (derived messages, goals,
/// tool-call log) can be recomputed from it, but `active_goals` is
/// carried alongside for convenience since it's small and cheap to
/// keep in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    /// Checkpoint identifier (`ckpt_<segment>`).
    pub id: String,
    /// When the checkpoint was taken, epoch milliseconds.
    pub timestamp: i64,
    /// Base system prompt at checkpoint time.
    pub system_prompt: String,
    /// The complete event log.
    pub session_history: Vec<Event>,
    /// Derived goal snapshot at checkpoint time.
    pub active_goals: Vec<wick_event_log::Goal>,
    /// Scheduler job table at checkpoint time.
    pub scheduler_snapshot: Vec<ScheduledJob>,
    /// Checkpoint format version.
    pub version: u32,
}

/// Current checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 2;

/// Conversation archive metadata (`meta.json` in the v2 layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMeta {
    /// Conversation identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Creation time, epoch milliseconds.
    pub created: i64,
    /// Last-used time, epoch milliseconds.
    pub last_used: i64,
    /// Archive format version.
    pub version: u32,
}

/// Save a conversation as `{id}/meta.json` + `{id}/events.jsonl`.
pub async fn save_archive(
    blob: &dyn BlobStore,
    meta: &ConversationMeta,
    log: &EventLog,
) -> Result<(), PersistenceError> {
    let base = format!("conversations/{}", meta.id);
    let meta_bytes = serde_json::to_vec(meta)?;
    blob.put(&format!("{base}/meta.json"), meta_bytes).await?;
    blob.put(&format!("{base}/events.jsonl"), log.to_jsonl().into_bytes()).await?;
    Ok(())
}

/// Load a conversation archive, transparently migrating the legacy
/// single-file v1 layout (`conversations/{id}.json`) if the v2 layout
/// isn't present.
pub async fn load_archive(
    blob: &dyn BlobStore,
    conversation_id: &str,
) -> Result<(ConversationMeta, EventLog), PersistenceError> {
    let base = format!("conversations/{conversation_id}");
    if let Some(meta_bytes) = blob.get(&format!("{base}/meta.json")).await? {
        let meta: ConversationMeta = serde_json::from_slice(&meta_bytes)?;
        let events_bytes = blob
            .get(&format!("{base}/events.jsonl"))
            .await?
            .ok_or_else(|| PersistenceError::NotFound(format!("{base}/events.jsonl")))?;
        let text = String::from_utf8_lossy(&events_bytes);
        let log = EventLog::from_jsonl(&text)?;
        return Ok((meta, log));
    }

    let legacy_path = format!("conversations/{conversation_id}.json");
    let bytes = blob
        .get(&legacy_path)
        .await?
        .ok_or_else(|| PersistenceError::NotFound(conversation_id.to_string()))?;
    let legacy: LegacyCheckpointV1 = serde_json::from_slice(&bytes)?;
    let events = synthesize_events_from_v1(&legacy);
    let meta = ConversationMeta {
        id: conversation_id.to_string(),
        name: legacy.name.clone().unwrap_or_default(),
        created: legacy.timestamp,
        last_used: legacy.timestamp,
        version: CHECKPOINT_VERSION,
    };
    Ok((meta, EventLog::from_events(events)))
}

/// Shape of the single-file checkpoint format this archive layout
/// replaced. Only used as a migration source.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCheckpointV1 {
    #[allow(dead_code)]
    id: String,
    timestamp: i64,
    name: Option<String>,
    session_history: Vec<LegacyMessage>,
    #[serde(default)]
    active_goals: Vec<LegacyGoal>,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyMessage {
    role: String,
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<LegacyToolCallStub>,
    call_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyToolCallStub {
    call_id: String,
    name: String,
    arguments: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyGoal {
    id: String,
    #[serde(flatten)]
    fields: serde_json::Value,
}

fn synthesize_events_from_v1(legacy: &LegacyCheckpointV1) -> Vec<Event> {
    let mut log = EventLog::new();
    for message in &legacy.session_history {
        match message.role.as_str() {
            "user" => {
                log.append(
                    EventType::UserMessage,
                    serde_json::json!({ "content": message.content.clone().unwrap_or_default() }),
                    EventSource::User,
                );
            }
            "assistant" => {
                log.append(
                    EventType::AgentMessage,
                    serde_json::json!({ "content": message.content.clone().unwrap_or_default() }),
                    EventSource::Agent,
                );
                for call in &message.tool_calls {
                    log.append(
                        EventType::ToolCall,
                        serde_json::json!({
                            "call_id": call.call_id,
                            "name": call.name,
                            "arguments": call.arguments,
                        }),
                        EventSource::Agent,
                    );
                }
            }
            "tool" => {
                log.append(
                    EventType::ToolResult,
                    serde_json::json!({
                        "call_id": message.call_id.clone().unwrap_or_default(),
                        "content": message.content.clone().unwrap_or_default(),
                    }),
                    EventSource::System,
                );
            }
            _ => {}
        }
    }
    for goal in &legacy.active_goals {
        log.append(
            EventType::GoalAdded,
            serde_json::json!({ "id": goal.id, "fields": goal.fields }),
            EventSource::System,
        );
    }
    log.events().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kv_store_roundtrips() {
        let store = InMemoryKvStore::new();
        assert!(store.get("k").await.unwrap().is_none());
        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archive_roundtrips_v2() {
        let blob = InMemoryBlobStore::new();
        let mut log = EventLog::new();
        log.append(EventType::UserMessage, serde_json::json!({"content": "hi"}), EventSource::User);
        let meta = ConversationMeta {
            id: "conv1".to_string(),
            name: "test".to_string(),
            created: 0,
            last_used: 0,
            version: CHECKPOINT_VERSION,
        };
        save_archive(&blob, &meta, &log).await.unwrap();
        let (loaded_meta, loaded_log) = load_archive(&blob, "conv1").await.unwrap();
        assert_eq!(loaded_meta.name, "test");
        assert_eq!(loaded_log.len(), 1);
    }

    #[tokio::test]
    async fn archive_migrates_legacy_v1() {
        let blob = InMemoryBlobStore::new();
        let legacy = serde_json::json!({
            "id": "conv1",
            "timestamp": 1000,
            "name": "legacy",
            "session_history": [
                {"role": "user", "content": "hi", "tool_calls": []},
                {"role": "assistant", "content": "hello", "tool_calls": []},
            ],
            "active_goals": [],
        });
        blob.put("conversations/conv1.json", serde_json::to_vec(&legacy).unwrap()).await.unwrap();
        let (meta, log) = load_archive(&blob, "conv1").await.unwrap();
        assert_eq!(meta.name, "legacy");
        assert_eq!(log.len(), 2);
    }
}
