//! In-memory session store with sliding expiry.

use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::session::SessionStore;

/// Random bytes per credential, hex encoded on the wire.
const SESSION_BYTES: usize = 64;

/// Thread-safe session table. Cloning shares the same table.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, Instant>>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Create an empty store whose sessions live for `ttl` after their last validation.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Number of sessions currently tracked (expired ones included until purged).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, expiry| *expiry > now);
        let removed = before.saturating_sub(self.sessions.len());
        metrics::record_active_sessions(self.sessions.len());
        removed
    }

    /// Periodically purge expired sessions until shutdown is signalled.
    pub async fn run_purge(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Purged expired ingress sessions");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Session purge task exiting");
                    return;
                }
            }
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn create_session(&self) -> String {
        let mut bytes = [0u8; SESSION_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        let mut session = String::with_capacity(SESSION_BYTES * 2);
        for byte in bytes {
            let _ = write!(session, "{:02x}", byte);
        }

        self.sessions
            .insert(session.clone(), Instant::now() + self.ttl);
        metrics::record_active_sessions(self.sessions.len());
        session
    }

    fn validate_session(&self, session: &str) -> bool {
        let now = Instant::now();
        let valid = match self.sessions.get_mut(session) {
            Some(mut expiry) if *expiry > now => {
                *expiry = now + self.ttl;
                true
            }
            Some(_) => false,
            None => return false,
        };

        if !valid {
            self.sessions.remove(session);
            metrics::record_active_sessions(self.sessions.len());
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sessions_validate() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = store.create_session();
        assert_eq!(session.len(), SESSION_BYTES * 2);
        assert!(session.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(store.validate_session(&session));
        assert!(!store.validate_session("unknown"));
    }

    #[test]
    fn sessions_are_unique() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        assert_ne!(store.create_session(), store.create_session());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn expired_sessions_are_rejected_and_evicted() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        let session = store.create_session();
        std::thread::sleep(Duration::from_millis(40));
        assert!(!store.validate_session(&session));
        assert!(store.is_empty());
    }

    #[test]
    fn validation_extends_expiry() {
        let store = MemorySessionStore::new(Duration::from_millis(200));
        let session = store.create_session();
        for _ in 0..5 {
            std::thread::sleep(Duration::from_millis(60));
            assert!(store.validate_session(&session));
        }
    }

    #[test]
    fn purge_removes_only_expired() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        store.create_session();
        std::thread::sleep(Duration::from_millis(40));
        let fresh = store.create_session();
        assert_eq!(store.purge_expired(), 1);
        assert!(store.validate_session(&fresh));
    }
}
