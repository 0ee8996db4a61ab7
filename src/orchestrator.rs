//! The per-session orchestration state machine
//!
//! One [`Orchestrator`] owns a single session's entire mutable state —
//! VAD phase, transcript buffer, lifecycle state, and the in-flight
//! response task, if any — and is driven by exactly one task via
//! `tokio::select!` over a single command channel.
//! External callers only ever touch an [`OrchestratorHandle`], which is
//! `Clone` and forwards everything through a bounded command channel so
//! the single-writer invariant holds regardless of how many producers
//! (the `ClientChannel` reader, the `Transcriber` callback, ...) a given
//! deployment wires up.

use crate::audio::AudioFrame;
use crate::channel::ClientChannel;
use crate::config::OrchestratorConfig;
use crate::error::Error;
use crate::events::{EventBus, EventPublisher, OrchestrationEvent};
use crate::generator::{ResponseGenerator, ResponseToken};
use crate::pause;
use crate::session::{Session, SessionId, SessionState};
use crate::transcriber::{Transcriber, TranscriptEvent, TranscriptKind};
use crate::transcript::TranscriptBuffer;
use crate::vad::{VadEngine, VadEvent};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// A cancellation signal threaded explicitly into one streaming
/// [`ResponseGenerator::start`] call
///
/// Cloneable and cheap; every clone observes the same cancellation.
/// Expressed directly over [`tokio::sync::watch`] rather than pulling in
/// `tokio-util` for a single bool flag.
#[derive(Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// Whether cancellation has already been requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested; resolves immediately if it
    /// already has been
    pub async fn cancelled(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
    }
}

/// The orchestrator's half of a [`Cancellation`]: fires it once
struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    fn new() -> (Self, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, Cancellation { rx })
    }

    fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Inbound work items for one session's orchestrator, processed strictly
/// in arrival order
enum Command {
    Audio(AudioFrame),
    Transcript(TranscriptEvent),
    ResponseFinished,
    End,
}

/// A handle to a running [`Orchestrator`] task
///
/// Cheap to clone; every clone shares the same bounded command channel,
/// so fan-in from multiple producers (audio reader, transcript callback)
/// still serializes through the one orchestrator task.
#[derive(Clone)]
pub struct OrchestratorHandle {
    session_id: SessionId,
    commands: mpsc::Sender<Command>,
}

impl OrchestratorHandle {
    /// This handle's session ID
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Submit one inbound audio frame
    ///
    /// # Errors
    ///
    /// Returns [`Error::IngestOverrun`] if the bounded command channel is
    /// closed (the session has already ended).
    pub async fn ingest_audio(&self, frame: AudioFrame) -> Result<()> {
        self.commands
            .send(Command::Audio(frame))
            .await
            .map_err(|_| Error::SessionNotInitialized(self.session_id.to_string()))
    }

    /// Submit one transcription result from the external `Transcriber`
    pub async fn ingest_transcript(&self, event: TranscriptEvent) -> Result<()> {
        self.commands
            .send(Command::Transcript(event))
            .await
            .map_err(|_| Error::SessionNotInitialized(self.session_id.to_string()))
    }

    /// Request a graceful end to the session
    pub async fn end(&self) {
        let _ = self.commands.send(Command::End).await;
    }
}

struct ActiveResponse {
    cancel: CancellationSource,
    handle: JoinHandle<()>,
    /// Set by the response task once it emits its first delta. Before that
    /// point a `SpeechStarted` only cancels the pending commit and the turn
    /// continues; after it, a `SpeechStarted` is a true barge-in.
    first_token_emitted: Arc<AtomicBool>,
    /// Snapshot of the transcript buffer taken just before this turn was
    /// archived, so a pre-first-token cancellation can restore it.
    pre_commit_transcript: TranscriptBuffer,
}

/// Owns one session's full mutable state; driven by a single task
pub struct Orchestrator {
    session: Arc<Session>,
    config: OrchestratorConfig,
    vad: VadEngine,
    transcript: TranscriptBuffer,
    events: EventBus,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ResponseGenerator>,
    channel: Arc<dyn ClientChannel>,
    /// Prior committed turns, oldest first, handed to the generator as context
    history: Vec<String>,
    active_response: Option<ActiveResponse>,
    commands_tx: mpsc::Sender<Command>,
}

impl Orchestrator {
    /// Spawn a new orchestrator task for `session` and return a handle to it
    ///
    /// Also spawns the event-writer task that drains the [`EventBus`] and
    /// forwards envelopes to `channel`.
    pub fn spawn(
        session: Arc<Session>,
        config: OrchestratorConfig,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
        channel: Arc<dyn ClientChannel>,
    ) -> OrchestratorHandle {
        let session_id = session.id();
        let (commands_tx, commands_rx) = mpsc::channel(config.audio_ingest_capacity);
        let mut events = EventBus::new(session_id, config.event_bus_capacity);
        let mut events_rx = events.take_receiver();

        let writer_channel = channel.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let envelope = event.into_envelope(session_id);
                if let Err(err) = writer_channel.send_event(envelope).await {
                    warn!(session_id = %session_id, error = %err, "client channel send failed");
                }
            }
        });

        let vad = VadEngine::new(config.vad);
        let orchestrator = Orchestrator {
            session,
            config,
            vad,
            transcript: TranscriptBuffer::new(),
            events,
            transcriber,
            generator,
            channel,
            history: Vec::new(),
            active_response: None,
            commands_tx: commands_tx.clone(),
        };

        tokio::spawn(orchestrator.run(commands_rx));

        OrchestratorHandle {
            session_id,
            commands: commands_tx,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.events.publish(OrchestrationEvent::SessionStarted).await;
        self.session.set_state(SessionState::Listening).await;

        const PAUSE_TICK_MS: u64 = 50;
        let mut pause_timer = tokio::time::interval(Duration::from_millis(PAUSE_TICK_MS));
        pause_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_cmd = commands.recv() => {
                    match maybe_cmd {
                        Some(Command::Audio(frame)) => self.handle_audio(frame).await,
                        Some(Command::Transcript(event)) => self.handle_transcript(event).await,
                        Some(Command::ResponseFinished) => {
                            self.active_response = None;
                        }
                        Some(Command::End) | None => {
                            self.close_session().await;
                            break;
                        }
                    }
                }
                _ = pause_timer.tick() => {
                    // advance the silence clock even if no audio frame has
                    // arrived recently, so a commit can still fire while
                    // the client has simply stopped sending frames
                    self.vad.tick_silence(PAUSE_TICK_MS);
                    self.evaluate_pause().await;
                }
            }

            if matches!(self.session.state().await, SessionState::Closed) {
                break;
            }
        }

        debug!(session_id = %self.session.id(), "orchestrator task exiting");
    }

    async fn handle_audio(&mut self, frame: AudioFrame) {
        self.session.touch().await;
        self.session.update_metrics(|m| m.frames_ingested += 1).await;

        let event = self.vad.process(&frame);
        match event {
            VadEvent::SpeechStarted => {
                self.session
                    .update_metrics(|m| m.vad_speech_transitions += 1)
                    .await;
                self.on_speech_started().await;
            }
            VadEvent::SpeechEnded { .. } => {
                self.session
                    .update_metrics(|m| m.vad_silence_transitions += 1)
                    .await;
                if matches!(self.session.state().await, SessionState::UserSpeaking) {
                    self.session.set_state(SessionState::AwaitingCommit).await;
                }
            }
            VadEvent::SpeechContinuing { .. } | VadEvent::Silence { .. } => {}
        }

        self.feed_transcriber_with_retry(frame).await;
        self.evaluate_pause().await;
    }

    async fn on_speech_started(&mut self) {
        if matches!(self.session.state().await, SessionState::AiResponding) {
            let past_first_token = self
                .active_response
                .as_ref()
                .map(|a| a.first_token_emitted.load(Ordering::SeqCst))
                .unwrap_or(false);
            if past_first_token {
                self.cancel_active_response().await;
                self.session.update_metrics(|m| m.barge_ins += 1).await;
                self.events.publish(OrchestrationEvent::AiInterrupted).await;
            } else {
                self.cancel_pending_commit().await;
            }
        }
        self.session.set_state(SessionState::UserSpeaking).await;
    }

    async fn handle_transcript(&mut self, event: TranscriptEvent) {
        let now = SystemTime::now();
        match event.kind {
            TranscriptKind::Partial => {
                self.transcript
                    .update_live(event.text, event.confidence, now, event.language);
                let text = self.transcript.turn().as_prompt_text();
                self.events
                    .publish(OrchestrationEvent::TranscriptPartial {
                        text,
                        confidence: event.confidence,
                    })
                    .await;
            }
            TranscriptKind::Final => {
                let segment =
                    self.transcript
                        .confirm_final(event.text, event.confidence, now, event.language);
                self.events
                    .publish(OrchestrationEvent::TranscriptFinal {
                        text: segment.text,
                        confidence: segment.confidence,
                    })
                    .await;
                self.evaluate_pause().await;
            }
        }
    }

    /// Re-run the pause classifier against current VAD silence and
    /// transcript state; commits the turn if the silence span has crossed
    /// a commit-eligible threshold.
    async fn evaluate_pause(&mut self) {
        if !matches!(self.session.state().await, SessionState::AwaitingCommit) {
            return;
        }
        let silence_ms = self.vad.silence_ms();
        let turn_has_text = self.transcript.turn().has_text();
        let classification = pause::classify(silence_ms, turn_has_text, &self.config.pause);
        if classification.should_commit {
            self.commit_turn().await;
        }
    }

    async fn commit_turn(&mut self) {
        let pre_commit_transcript = self.transcript.clone();
        let turn = self.transcript.archive_and_reset();
        self.session.update_metrics(|m| m.commits += 1).await;
        self.session.set_state(SessionState::AiResponding).await;

        self.events.publish(OrchestrationEvent::AiThinking).await;

        let (cancel_source, cancellation) = CancellationSource::new();
        let commit_started = Instant::now();
        let context = self.history.clone();
        let first_token_emitted = Arc::new(AtomicBool::new(false));

        match self
            .generator
            .start(turn.text.clone(), context, cancellation.clone())
            .await
        {
            Ok(stream) => {
                let handle = spawn_response_task(
                    self.session.id(),
                    stream,
                    cancellation,
                    self.events.publisher(),
                    self.session.clone(),
                    self.commands_tx.clone(),
                    commit_started,
                    first_token_emitted.clone(),
                );
                self.active_response = Some(ActiveResponse {
                    cancel: cancel_source,
                    handle,
                    first_token_emitted,
                    pre_commit_transcript,
                });
                self.history.push(turn.text);
            }
            Err(err) => {
                self.emit_error(&err).await;
                self.session.set_state(SessionState::Listening).await;
                if err.is_fatal() {
                    self.close_session().await;
                }
            }
        }
    }

    /// True barge-in: the response has already started streaming, so the
    /// turn is discarded and `AiInterrupted` is published.
    async fn cancel_active_response(&mut self) {
        if let Some(active) = self.active_response.take() {
            active.cancel.cancel();
            self.detach_response_task(active.handle).await;
        }
    }

    /// The commit is still pending its first token: cancel it silently and
    /// restore the transcript/history to their pre-commit state so the same
    /// turn continues once the user finishes speaking again.
    async fn cancel_pending_commit(&mut self) {
        if let Some(active) = self.active_response.take() {
            active.cancel.cancel();
            self.detach_response_task(active.handle).await;
            self.transcript = active.pre_commit_transcript;
            self.history.pop();
        }
    }

    /// Wait up to the barge-in cancel budget for `handle` to finish after
    /// cancellation was signaled; abort it if it hasn't by then, so it can
    /// never publish another event on this session.
    async fn detach_response_task(&self, mut handle: JoinHandle<()>) {
        let budget = self.config.barge_in_cancel_budget();
        tokio::select! {
            res = &mut handle => {
                if let Err(err) = res {
                    if !err.is_cancelled() {
                        warn!(session_id = %self.session.id(), error = %err, "response task panicked");
                    }
                }
            }
            _ = tokio::time::sleep(budget) => {
                warn!(
                    session_id = %self.session.id(),
                    "response task did not stop within the barge-in cancel budget, aborting it"
                );
                handle.abort();
            }
        }
    }

    async fn feed_transcriber_with_retry(&mut self, frame: AudioFrame) {
        let mut attempt = 0u32;
        let mut delay = Duration::from_millis(self.config.transcriber.backoff_initial_ms);
        loop {
            match self.transcriber.feed_audio(self.session.id(), frame.clone()).await {
                Ok(()) => return,
                Err(err) if err.is_retryable() && attempt < self.config.transcriber.max_retries => {
                    attempt += 1;
                    warn!(
                        session_id = %self.session.id(),
                        attempt,
                        error = %err,
                        "transcriber feed_audio failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => {
                    let fatal = err.is_fatal();
                    self.emit_error(&err).await;
                    if fatal {
                        self.close_session().await;
                    }
                    return;
                }
            }
        }
    }

    async fn emit_error(&self, err: &Error) {
        self.events
            .publish(OrchestrationEvent::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            })
            .await;
    }

    async fn close_session(&mut self) {
        if matches!(self.session.state().await, SessionState::Closed) {
            return;
        }
        self.cancel_active_response().await;
        self.session.set_state(SessionState::Closed).await;
        self.events.publish(OrchestrationEvent::SessionEnded).await;
        if let Err(err) = self.channel.close().await {
            warn!(session_id = %self.session.id(), error = %err, "error closing client channel");
        }
        info!(session_id = %self.session.id(), "session closed");
    }
}

/// Drives one committed turn's response stream to completion or
/// cancellation, publishing deltas as they arrive
fn spawn_response_task(
    session_id: SessionId,
    mut stream: crate::generator::TokenStream,
    mut cancellation: Cancellation,
    publisher: EventPublisher,
    session: Arc<Session>,
    commands: mpsc::Sender<Command>,
    commit_started: Instant,
    first_token_emitted: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut accumulated = String::new();
        let mut first_token = true;

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    debug!(session_id = %session_id, "response task observed cancellation");
                    return;
                }
                next = stream.next() => {
                    match next {
                        Some(ResponseToken::Delta(text)) => {
                            if first_token {
                                let latency = commit_started.elapsed();
                                session.update_metrics(|m| m.record_commit_latency(latency)).await;
                                first_token = false;
                                first_token_emitted.store(true, Ordering::SeqCst);
                            }
                            session.update_metrics(|m| m.generator_tokens_emitted += 1).await;
                            accumulated.push_str(&text);
                            publisher.publish(OrchestrationEvent::AiResponseDelta { text }).await;
                        }
                        Some(ResponseToken::Done(full_text)) => {
                            publisher
                                .publish(OrchestrationEvent::AiResponseDone { text: full_text })
                                .await;
                            session.set_state(SessionState::Listening).await;
                            let _ = commands.send(Command::ResponseFinished).await;
                            return;
                        }
                        Some(ResponseToken::Error(message)) => {
                            publisher
                                .publish(OrchestrationEvent::Error {
                                    code: "AI_UNAVAILABLE".to_string(),
                                    message,
                                })
                                .await;
                            session.set_state(SessionState::Listening).await;
                            let _ = commands.send(Command::ResponseFinished).await;
                            return;
                        }
                        None => {
                            // stream ended without an explicit terminal token
                            publisher
                                .publish(OrchestrationEvent::AiResponseDone {
                                    text: accumulated.clone(),
                                })
                                .await;
                            session.set_state(SessionState::Listening).await;
                            let _ = commands.send(Command::ResponseFinished).await;
                            return;
                        }
                    }
                }
            }
        }
    })
}
