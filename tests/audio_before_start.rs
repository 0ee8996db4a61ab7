//! Audio arrives before `session.start`. Expects
//! `SESSION_NOT_INITIALIZED` and no transcript events.

mod common;

use common::{ScriptedGenerator, ScriptedTranscriber};
use duplex_orchestrator::config::OrchestratorConfig;
use duplex_orchestrator::session::SessionId;
use duplex_orchestrator::supervisor::Supervisor;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn audio_before_session_start_is_rejected() {
    let supervisor = Supervisor::new(
        OrchestratorConfig::default(),
        Arc::new(ScriptedTranscriber::always_succeeds()),
        Arc::new(ScriptedGenerator::new(Duration::from_millis(5))),
    );

    let session_id = SessionId::parse("22222222-2222-2222-2222-222222222222").unwrap();

    // no session.start was ever sent for this ID
    let err = supervisor.handle_for(session_id).await.unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_INITIALIZED");
    assert_eq!(supervisor.live_session_count().await, 0);

    supervisor.shutdown().await;
}
