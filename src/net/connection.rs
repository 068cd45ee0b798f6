//! Session identity and lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for log correlation
//! - Count sessions in flight so stop/shutdown can report them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Relaxed ordering is enough: ids only need to be unique.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one proxied session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle of a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Selecting a backend and opening the upstream connection.
    Connecting,
    /// Forwarding bytes in both directions.
    Relaying,
    /// Both connections released.
    Closed,
}

/// Counts live sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. The returned guard decrements the count on drop.
    pub fn track(&self) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a session's lifetime.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(session_id = %self.id, "Session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("session-"));
    }

    #[tokio::test]
    async fn guard_released_when_session_task_ends() {
        let tracker = SessionTracker::new();

        let (release, wait) = tokio::sync::oneshot::channel::<()>();
        let held = tracker.track();
        let session = tokio::spawn(async move {
            let _ = wait.await;
            drop(held);
        });

        let finished = tracker.track();
        assert_eq!(tracker.active_count(), 2);
        drop(finished);
        assert_eq!(tracker.active_count(), 1);

        release.send(()).unwrap();
        session.await.unwrap();
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn guard_released_when_session_task_panics() {
        let tracker = SessionTracker::new();
        let guard = tracker.track();

        let session = tokio::spawn(async move {
            let _guard = guard;
            panic!("session failed");
        });
        assert!(session.await.is_err());
        assert_eq!(tracker.active_count(), 0);
    }
}
