//! Per-session state: lifecycle, activity tracking, and metrics
//!
//! `state` lives behind an `Arc<RwLock<...>>` so a spawned response task
//! can resolve it back to `Listening` on completion without routing
//! through the orchestrator's own command queue; every `set_state` call
//! logs the transition.

use crate::session::SessionId;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// The lifecycle states a session moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created, no audio yet
    Idle,
    /// Receiving audio but no speech detected yet
    Listening,
    /// VAD has detected the user speaking
    UserSpeaking,
    /// Silence detected after speech; pause classification pending commit
    AwaitingCommit,
    /// A committed turn's response is streaming
    AiResponding,
    /// Session has ended; terminal
    Closed,
}

const METRICS_LATENCY_WINDOW: usize = 5;

/// Read-only counters accumulated over a session's lifetime
///
/// Mutated only by the owning [`crate::orchestrator::Orchestrator`];
/// exposed elsewhere only as an immutable snapshot via
/// [`crate::supervisor::Supervisor`].
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    /// Total audio frames ingested
    pub frames_ingested: u64,
    /// Number of `SpeechStarted` transitions observed
    pub vad_speech_transitions: u64,
    /// Number of `SpeechEnded`/silence transitions observed
    pub vad_silence_transitions: u64,
    /// Number of turns committed
    pub commits: u64,
    /// Number of barge-ins (user speech interrupting an active response)
    pub barge_ins: u64,
    /// Total response tokens emitted across the session
    pub generator_tokens_emitted: u64,
    /// The most recent commit-to-first-token latencies, newest last
    pub recent_commit_latencies: VecDeque<Duration>,
}

impl SessionMetrics {
    /// Record a commit-to-first-token latency sample, keeping only the
    /// most recent [`METRICS_LATENCY_WINDOW`] samples
    pub fn record_commit_latency(&mut self, latency: Duration) {
        if self.recent_commit_latencies.len() == METRICS_LATENCY_WINDOW {
            self.recent_commit_latencies.pop_front();
        }
        self.recent_commit_latencies.push_back(latency);
    }
}

/// A single live session's lifecycle, activity timestamps, and metrics
///
/// Interior-mutable fields are held behind `Arc<RwLock<...>>` so a
/// snapshot (state, last activity, metrics) can be read by the
/// Supervisor's sweeper concurrently with the owning Orchestrator task
/// updating them.
pub struct Session {
    id: SessionId,
    created_at: Instant,
    last_activity: Arc<RwLock<Instant>>,
    state: Arc<RwLock<SessionState>>,
    language: Arc<RwLock<Option<String>>>,
    metrics: Arc<RwLock<SessionMetrics>>,
}

impl Session {
    /// Create a new session in the `Idle` state
    pub fn new(id: SessionId, language: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_activity: Arc::new(RwLock::new(now)),
            state: Arc::new(RwLock::new(SessionState::Idle)),
            language: Arc::new(RwLock::new(language)),
            metrics: Arc::new(RwLock::new(SessionMetrics::default())),
        }
    }

    /// This session's ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// When the session was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Transition to a new lifecycle state, logging the change
    pub async fn set_state(&self, new_state: SessionState) {
        let mut state = self.state.write().await;
        let old_state = *state;
        if old_state != new_state {
            debug!(
                session_id = %self.id,
                from = ?old_state,
                to = ?new_state,
                "session state transition"
            );
            *state = new_state;
        }
    }

    /// Refresh the idle-timeout clock; called on every inbound frame or
    /// control message
    pub async fn touch(&self) {
        *self.last_activity.write().await = Instant::now();
    }

    /// How long since the last inbound activity
    pub async fn idle_for(&self) -> Duration {
        self.last_activity.read().await.elapsed()
    }

    /// The language hint, if the client provided one at session start
    pub async fn language(&self) -> Option<String> {
        self.language.read().await.clone()
    }

    /// Apply a read-only function over the current metrics snapshot
    pub async fn metrics(&self) -> SessionMetrics {
        self.metrics.read().await.clone()
    }

    /// Mutate the metrics under the write lock
    pub async fn update_metrics(&self, f: impl FnOnce(&mut SessionMetrics)) {
        let mut metrics = self.metrics.write().await;
        f(&mut metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::parse("11111111-1111-1111-1111-111111111111").unwrap()
    }

    #[tokio::test]
    async fn new_session_starts_idle() {
        let session = Session::new(sid(), None);
        assert_eq!(session.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn state_transitions_are_observable() {
        let session = Session::new(sid(), Some("en".into()));
        session.set_state(SessionState::Listening).await;
        assert_eq!(session.state().await, SessionState::Listening);
        session.set_state(SessionState::UserSpeaking).await;
        assert_eq!(session.state().await, SessionState::UserSpeaking);
        assert_eq!(session.language().await.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn metrics_accumulate_and_window_caps_at_five() {
        let session = Session::new(sid(), None);
        for i in 0..8u64 {
            session
                .update_metrics(|m| {
                    m.commits += 1;
                    m.record_commit_latency(Duration::from_millis(100 + i));
                })
                .await;
        }
        let metrics = session.metrics().await;
        assert_eq!(metrics.commits, 8);
        assert_eq!(metrics.recent_commit_latencies.len(), 5);
        assert_eq!(
            metrics.recent_commit_latencies.back().copied(),
            Some(Duration::from_millis(107))
        );
    }

    #[tokio::test]
    async fn touch_resets_idle_clock() {
        let session = Session::new(sid(), None);
        tokio::time::sleep(Duration::from_millis(5)).await;
        session.touch().await;
        assert!(session.idle_for().await < Duration::from_millis(100));
    }
}
