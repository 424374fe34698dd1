//! Typed id wrappers for agents, sessions, events, memories, and jobs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ids prevent mixing up an event id with a memory id. They're
/// just strings underneath — no format is enforced beyond what each
/// id's constructor applies.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed id from anything that converts to `String`.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(AgentId, "Unique identifier for an agent instance.");
typed_id!(SessionId, "Unique identifier for a conversation session.");
typed_id!(WorkflowId, "Unique identifier for a workflow execution.");
typed_id!(ScopeId, "Unique identifier for a state scope.");
typed_id!(EventId, "Unique identifier for an event-log entry, of the form `evt_<ts>_<seq>`.");
typed_id!(MemoryId, "Unique identifier for a memory entry, of the form `mem_<n>`.");
typed_id!(JobId, "Unique identifier for a scheduled job, of the form `job_<n>`.");

/// Generate a random opaque id segment (used by event ids alongside the
/// timestamp/sequence parts, and by callers that need a fresh session id).
pub fn random_id_segment() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_id_roundtrip() {
        let id = AgentId::new("agent-1");
        assert_eq!(id.as_str(), "agent-1");
        assert_eq!(id.to_string(), "agent-1");
    }

    #[test]
    fn typed_ids_are_distinct_types() {
        fn takes_session(_: &SessionId) {}
        takes_session(&SessionId::new("s1"));
    }

    #[test]
    fn random_id_segment_is_nonempty() {
        assert!(!random_id_segment().is_empty());
    }
}
