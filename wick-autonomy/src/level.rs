//! Autonomy levels and the read/non-read permission split.

use serde::{Deserialize, Serialize};
use wick_tool::PermissionClass;

/// How much latitude the agent has to act without a human in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    /// Only read-set tools may execute.
    ReadOnly,
    /// All tools may execute, but non-read tools need approval.
    Supervised,
    /// All tools execute without approval.
    Full,
}

/// `internal` and `read` form the read set; every other permission
/// class is non-read.
pub fn is_read_set(class: PermissionClass) -> bool {
    matches!(class, PermissionClass::Internal | PermissionClass::Read)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_set_is_internal_and_read_only() {
        assert!(is_read_set(PermissionClass::Internal));
        assert!(is_read_set(PermissionClass::Read));
        assert!(!is_read_set(PermissionClass::Write));
        assert!(!is_read_set(PermissionClass::Approve));
        assert!(!is_read_set(PermissionClass::Network));
        assert!(!is_read_set(PermissionClass::Browser));
    }
}
