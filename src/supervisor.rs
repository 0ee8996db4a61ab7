//! Process-wide supervision: session creation, idle sweeping, shutdown
//!
//! Owns a background idle-sweeper task and fans a single shutdown signal
//! out to every live [`Orchestrator`].

use crate::channel::ClientChannel;
use crate::config::OrchestratorConfig;
use crate::generator::ResponseGenerator;
use crate::orchestrator::{Orchestrator, OrchestratorHandle};
use crate::session::{SessionId, SessionMetrics, SessionRegistry};
use crate::transcriber::Transcriber;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Owns the [`SessionRegistry`] and every running [`Orchestrator`] task
///
/// Also runs a background sweeper that ends sessions idle past
/// `config.session_idle_ttl_ms`, and coordinates a graceful shutdown that
/// drains and closes every live session before returning.
pub struct Supervisor {
    config: OrchestratorConfig,
    registry: Arc<SessionRegistry>,
    handles: Mutex<HashMap<SessionId, OrchestratorHandle>>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ResponseGenerator>,
    shutdown: Notify,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Build a new supervisor and start its background sweeper task
    pub fn new(
        config: OrchestratorConfig,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Arc<Self> {
        let supervisor = Arc::new(Self {
            registry: Arc::new(SessionRegistry::new(config.max_sessions)),
            handles: Mutex::new(HashMap::new()),
            transcriber,
            generator,
            shutdown: Notify::new(),
            sweeper: Mutex::new(None),
            config,
        });

        let sweeper_handle = {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { supervisor.run_sweeper().await })
        };
        // `try_lock` is safe here: nothing else can hold this lock before
        // the constructor returns.
        if let Ok(mut slot) = supervisor.sweeper.try_lock() {
            *slot = Some(sweeper_handle);
        }

        supervisor
    }

    /// Start a new session and spawn its orchestrator task
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] or [`Error::CapacityExceeded`] per
    /// [`SessionRegistry::start`].
    pub async fn start_session(
        &self,
        session_id: SessionId,
        language: Option<String>,
        channel: Arc<dyn ClientChannel>,
    ) -> Result<OrchestratorHandle> {
        let session = self.registry.start(session_id, language).await?;
        let handle = Orchestrator::spawn(
            session,
            self.config.clone(),
            self.transcriber.clone(),
            self.generator.clone(),
            channel,
        );
        self.handles.lock().await.insert(session_id, handle.clone());
        Ok(handle)
    }

    /// Fetch the running handle for a live session
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] / [`Error::SessionNotInitialized`]
    /// if no session with this ID has been started — this is what audio
    /// arriving before `session.start` resolves to.
    pub async fn handle_for(&self, session_id: SessionId) -> Result<OrchestratorHandle> {
        self.handles
            .lock()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotInitialized(session_id.to_string()))
    }

    /// Gracefully end one session
    pub async fn end_session(&self, session_id: SessionId) {
        if let Some(handle) = self.handles.lock().await.remove(&session_id) {
            handle.end().await;
        }
        self.registry.end(session_id).await;
    }

    /// A read-only metrics snapshot for one live session
    pub async fn session_metrics(&self, session_id: SessionId) -> Result<SessionMetrics> {
        let session = self.registry.get(session_id).await?;
        Ok(session.metrics().await)
    }

    /// Number of currently live sessions
    pub async fn live_session_count(&self) -> usize {
        self.registry.len().await
    }

    async fn run_sweeper(self: Arc<Self>) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let expired = self.registry.sweep_idle(self.config.session_idle_ttl()).await;
                    for session in expired {
                        let id = session.id();
                        debug!(session_id = %id, "sweeper ending idle session");
                        if let Some(handle) = self.handles.lock().await.remove(&id) {
                            handle.end().await;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// End every live session and stop the sweeper
    ///
    /// Each orchestrator drains its own event bus and emits
    /// `SessionEnded` as part of its own shutdown path; this call only
    /// requests that shutdown and waits for the registry to empty.
    pub async fn shutdown(&self) {
        info!("supervisor shutdown requested");
        self.shutdown.notify_one();

        let ids = self.registry.live_ids().await;
        for id in ids {
            self.end_session(id).await;
        }

        if let Some(handle) = self.sweeper.lock().await.take() {
            let _ = handle.await;
        }
        info!("supervisor shutdown complete");
    }
}
