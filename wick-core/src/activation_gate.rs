//! Per-capability mutual exclusion.
//!
//! Generalizes the lock-per-key pattern `wick_memory::MemoryStore` uses
//! for its embedding cache (`Arc<RwLock<HashMap<...>>>`) to one lock
//! slot per named capability, so two concurrent turns for the same
//! agent never run the same gated capability (a sandbox, a remote tool
//! client) at once while unrelated capabilities stay independent.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serializes access to named capabilities.
///
/// Each distinct `capability` string gets its own lock, created lazily
/// on first use and kept for the life of the gate.
#[derive(Debug, Default)]
pub struct ActivationGate {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ActivationGate {
    /// Create an empty gate.
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    /// Run `f` with exclusive access to `capability`. Concurrent calls
    /// for the same capability queue; calls for different capabilities
    /// never block each other.
    pub async fn activate<F, Fut, T>(&self, capability: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(capability.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = slot.lock().await;
        f().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn serializes_same_capability() {
        let gate = ActivationGate::new();
        let in_flight = AtomicU32::new(0);
        let max_in_flight = AtomicU32::new(0);

        let run = || async {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
        };

        tokio::join!(
            gate.activate("sandbox", run),
            gate.activate("sandbox", run),
            gate.activate("sandbox", run),
        );
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn independent_capabilities_do_not_block_each_other() {
        let gate = ActivationGate::new();
        let (a, b) = tokio::join!(
            gate.activate("sandbox", || async { 1 }),
            gate.activate("remote_tool", || async { 2 }),
        );
        assert_eq!((a, b), (1, 2));
    }
}
