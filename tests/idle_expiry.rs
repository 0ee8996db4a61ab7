//! No activity for `idleTTLMs`. Expects `session.ended`, then
//! `SESSION_NOT_INITIALIZED` for any further audio.

mod common;

use common::{ScriptedGenerator, ScriptedTranscriber};
use duplex_orchestrator::config::OrchestratorConfig;
use duplex_orchestrator::session::SessionId;
use duplex_orchestrator::supervisor::Supervisor;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn idle_session_is_swept_and_subsequent_audio_is_rejected() {
    let mut config = OrchestratorConfig::default();
    config.session_idle_ttl_ms = 50;

    let supervisor = Supervisor::new(
        config,
        Arc::new(ScriptedTranscriber::always_succeeds()),
        Arc::new(ScriptedGenerator::new(Duration::from_millis(5))),
    );

    let channel = Arc::new(common::RecordingChannel::new());
    let session_id = SessionId::parse("33333333-3333-3333-3333-333333333333").unwrap();
    supervisor
        .start_session(session_id, None, channel.clone())
        .await
        .unwrap();

    // the sweeper runs every 30s; advance well past both that and the
    // 50ms idle TTL configured above
    tokio::time::advance(Duration::from_secs(31)).await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert!(channel.event_types().await.contains(&"session.ended"));
    assert_eq!(supervisor.live_session_count().await, 0);

    let err = supervisor.handle_for(session_id).await.unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_INITIALIZED");

    supervisor.shutdown().await;
}
