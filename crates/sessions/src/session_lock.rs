//! Per-session concurrency control.
//!
//! Ensures only one turn runs per session at a time. A second message
//! arriving while a turn is in-flight waits for the semaphore to free up;
//! acquisition order is first-come-first-served via `tokio::sync::Semaphore`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-session run locks.
///
/// Each session id maps to a `Semaphore(1)`. Acquiring the permit ensures
/// exclusive access for one turn at a time; it auto-releases on drop.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    /// Acquire the run lock for a session, waiting if a turn is already in
    /// flight.
    pub async fn acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| SessionBusy)
    }

    /// Number of tracked sessions (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Remove locks for sessions that aren't actively held.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

/// Error returned when a session's lock can no longer be acquired (the
/// semaphore was closed — this should not happen in normal operation).
#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy — a turn is already in progress")
    }
}

impl std::error::Error for SessionBusy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();
        let permit1 = map.acquire("s1").await.unwrap();
        drop(permit1);
        let permit2 = map.acquire("s1").await.unwrap();
        drop(permit2);
    }

    #[tokio::test]
    async fn different_sessions_concurrent() {
        let map = Arc::new(SessionLockMap::new());
        let p1 = map.acquire("s1").await.unwrap();
        let p2 = map.acquire("s2").await.unwrap();
        assert_eq!(map.session_count(), 2);
        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_session_waits_for_release() {
        let map = Arc::new(SessionLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("s1").await.unwrap();
        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("s1").await.unwrap();
            42
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(p1);

        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn prune_idle_drops_unheld_locks() {
        let map = SessionLockMap::new();
        {
            let _permit = map.acquire("s1").await.unwrap();
        }
        map.prune_idle();
        assert_eq!(map.session_count(), 0);
    }
}
