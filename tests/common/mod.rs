//! Shared test doubles for the end-to-end conversation scenarios below.
//!
//! These implement the three consumed capability contracts
//! (`Transcriber`, `ResponseGenerator`, `ClientChannel`) entirely
//! in-memory so the scenarios run deterministically without a real STT
//! or LLM vendor.

#![allow(dead_code)]

use async_trait::async_trait;
use duplex_orchestrator::audio::AudioFrame;
use duplex_orchestrator::channel::ClientChannel;
use duplex_orchestrator::config::OrchestratorConfig;
use duplex_orchestrator::generator::{ResponseGenerator, ResponseToken, TokenStream};
use duplex_orchestrator::orchestrator::{Cancellation, OrchestratorHandle};
use duplex_orchestrator::protocol::EventEnvelope;
use duplex_orchestrator::session::SessionId;
use duplex_orchestrator::supervisor::Supervisor;
use duplex_orchestrator::transcriber::Transcriber;
use duplex_orchestrator::Result;
use futures::StreamExt as _;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// An amplitude comfortably above the default VAD enter threshold
pub const LOUD: i16 = (0.5 * i16::MAX as f32) as i16;
/// Full silence
pub const SILENT: i16 = 0;

/// Build one ~100ms, 16kHz mono PCM frame at a constant amplitude
pub fn tone_frame(amplitude: i16, sequence: u64) -> AudioFrame {
    let samples = vec![amplitude; 1_600];
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    AudioFrame::new(bytes, sequence).unwrap()
}

/// Records every envelope a session emits, in arrival order
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<EventEnvelope>>,
    closed: Mutex<bool>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent_events(&self) -> Vec<EventEnvelope> {
        self.sent.lock().await.clone()
    }

    pub async fn event_types(&self) -> Vec<&'static str> {
        self.sent.lock().await.iter().map(|e| e.event_type).collect()
    }

    pub async fn was_closed(&self) -> bool {
        *self.closed.lock().await
    }
}

#[async_trait]
impl ClientChannel for RecordingChannel {
    async fn send_event(&self, envelope: EventEnvelope) -> Result<()> {
        self.sent.lock().await.push(envelope);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock().await = true;
        Ok(())
    }
}

/// A `Transcriber` whose `feed_audio` fails transiently for the first
/// `fail_count` calls, then always succeeds. Accepting the frame does not
/// by itself produce a transcript; tests drive transcript delivery
/// explicitly via [`OrchestratorHandle::ingest_transcript`], standing in
/// for whatever out-of-band callback wiring a real deployment supplies.
pub struct ScriptedTranscriber {
    remaining_failures: AtomicU32,
}

impl ScriptedTranscriber {
    pub fn new(fail_count: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(fail_count),
        }
    }

    pub fn always_succeeds() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn feed_audio(&self, _session_id: SessionId, _frame: AudioFrame) -> Result<()> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(duplex_orchestrator::Error::SttUnavailable(
                "mock transcriber unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// A `ResponseGenerator` that streams a fixed script of tokens, pacing
/// each one by `delay` so barge-in tests have room to interrupt mid-stream.
pub struct ScriptedGenerator {
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn start(
        &self,
        prompt: String,
        _context: Vec<String>,
        _cancel: Cancellation,
    ) -> Result<TokenStream> {
        let delay = self.delay;
        let tokens = vec![
            ResponseToken::Delta("Hi".to_string()),
            ResponseToken::Delta(", ".to_string()),
            ResponseToken::Delta("there!".to_string()),
            ResponseToken::Done(format!("Hi, there! (re: {prompt})")),
        ];
        let stream = tokio_stream::iter(tokens).then(move |token| async move {
            tokio::time::sleep(delay).await;
            token
        });
        Ok(Box::pin(stream))
    }
}

/// Spin up a supervisor with the given capability mocks, start one
/// session, and return everything a scenario needs to drive it.
pub async fn start_test_session(
    config: OrchestratorConfig,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ResponseGenerator>,
) -> (Arc<Supervisor>, Arc<RecordingChannel>, SessionId, OrchestratorHandle) {
    let supervisor = Supervisor::new(config, transcriber, generator);
    let channel = Arc::new(RecordingChannel::new());
    let session_id = SessionId::parse("11111111-1111-1111-1111-111111111111").unwrap();
    let handle = supervisor
        .start_session(session_id, Some("en".to_string()), channel.clone())
        .await
        .unwrap();
    (supervisor, channel, session_id, handle)
}
