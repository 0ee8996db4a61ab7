//! Session registry: Start / Get / End / Sweep
//!
//! Backed by an `Arc<RwLock<HashMap<SessionId, Arc<Session>>>>`. Start and
//! End are serialized per session ID (a dedicated `tokio::sync::Mutex`
//! guards the create-or-reject race) while Get stays a lock-free read
//! against the outer map.

use crate::session::{Session, SessionId};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Owns every live [`Session`] for this process
///
/// `max_sessions` bounds concurrent occupancy; `0` means unbounded.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    start_lock: Mutex<()>,
    max_sessions: usize,
}

impl SessionRegistry {
    /// Create an empty registry with the given capacity bound
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            start_lock: Mutex::new(()),
            max_sessions,
        }
    }

    /// Start a new session
    ///
    /// Serialized against every other `start`/`end` call via
    /// `start_lock` so two concurrent `Start` calls for the same
    /// `session_id` cannot both observe an empty slot and both insert.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if `session_id` is already live,
    /// or [`Error::CapacityExceeded`] if `max_sessions` is reached.
    pub async fn start(&self, session_id: SessionId, language: Option<String>) -> Result<Arc<Session>> {
        let _guard = self.start_lock.lock().await;
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&session_id) {
            return Err(Error::AlreadyExists(session_id.to_string()));
        }
        if self.max_sessions > 0 && sessions.len() >= self.max_sessions {
            return Err(Error::CapacityExceeded(self.max_sessions));
        }

        let session = Arc::new(Session::new(session_id, language));
        sessions.insert(session_id, session.clone());
        info!(session_id = %session_id, "session started");
        Ok(session)
    }

    /// Look up a live session; lock-free beyond the shared read guard
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if `session_id` is not live.
    pub async fn get(&self, session_id: SessionId) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// End a session, removing it from the registry
    ///
    /// A no-op (not an error) if the session is already gone — repeated
    /// `session.end` messages must never fail.
    pub async fn end(&self, session_id: SessionId) -> Option<Arc<Session>> {
        let _guard = self.start_lock.lock().await;
        let removed = self.sessions.write().await.remove(&session_id);
        if removed.is_some() {
            info!(session_id = %session_id, "session ended");
        }
        removed
    }

    /// All currently live session IDs
    pub async fn live_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Number of currently live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the registry currently holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every session whose idle duration exceeds `ttl`
    ///
    /// Returns the removed sessions so the caller (the Supervisor) can
    /// emit `SessionEnded` and tear down generator/transcriber state for
    /// each before they are dropped.
    pub async fn sweep_idle(&self, ttl: std::time::Duration) -> Vec<Arc<Session>> {
        let candidates = self.live_ids().await;
        let mut expired = Vec::new();
        for id in candidates {
            if let Ok(session) = self.get(id).await {
                if session.idle_for().await >= ttl {
                    expired.push(id);
                }
            }
        }
        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(session) = self.end(id).await {
                debug!(session_id = %id, "swept idle session");
                removed.push(session);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u8) -> SessionId {
        SessionId::parse(&format!("1111111{n}-1111-1111-1111-111111111111")).unwrap()
    }

    #[tokio::test]
    async fn start_then_get_succeeds() {
        let registry = SessionRegistry::new(0);
        registry.start(sid(1), None).await.unwrap();
        assert!(registry.get(sid(1)).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_start_is_rejected() {
        let registry = SessionRegistry::new(0);
        registry.start(sid(1), None).await.unwrap();
        let err = registry.start(sid(1), None).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let registry = SessionRegistry::new(1);
        registry.start(sid(1), None).await.unwrap();
        let err = registry.start(sid(2), None).await.unwrap_err();
        assert_eq!(err.code(), "CAPACITY_EXCEEDED");
    }

    #[tokio::test]
    async fn get_missing_session_fails() {
        let registry = SessionRegistry::new(0);
        let err = registry.get(sid(9)).await.unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn end_removes_and_is_idempotent() {
        let registry = SessionRegistry::new(0);
        registry.start(sid(1), None).await.unwrap();
        assert!(registry.end(sid(1)).await.is_some());
        assert!(registry.end(sid(1)).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_removes_only_sessions_past_ttl() {
        let registry = SessionRegistry::new(0);
        registry.start(sid(1), None).await.unwrap();
        let swept = registry.sweep_idle(std::time::Duration::from_secs(3600)).await;
        assert!(swept.is_empty());
        assert_eq!(registry.len().await, 1);

        let swept = registry.sweep_idle(std::time::Duration::from_millis(0)).await;
        assert_eq!(swept.len(), 1);
        assert!(registry.is_empty().await);
    }
}
