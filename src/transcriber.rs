//! The `Transcriber` capability contract (external STT service)
//!
//! Consumed, not implemented, by the core: `FeedAudio` plus a callback
//! delivering `{kind, text, conf, language?}`. The contract guarantees
//! that for any finalized utterance a Final eventually arrives after zero
//! or more Partials; the core tolerates reordering of Partials but not of
//! Finals.

use crate::audio::AudioFrame;
use crate::session::SessionId;
use async_trait::async_trait;

/// Whether a recognized segment is provisional or final
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    /// Provisional; may still change
    Partial,
    /// Terminal for this utterance
    Final,
}

/// One recognition result delivered by a [`Transcriber`]
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Partial or Final
    pub kind: TranscriptKind,
    /// Recognized text
    pub text: String,
    /// Recognizer confidence in `[0, 1]`
    pub confidence: f32,
    /// BCP-47-ish language tag, if known
    pub language: Option<String>,
}

/// External speech-to-text capability consumed by the orchestrator
///
/// Implementors own their own connection management and retry semantics
/// for the underlying vendor call; the orchestrator layers its own
/// retry-with-backoff (`transcriber.max_retries`) on top for transient
/// failures of `feed_audio` itself.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Submit one audio frame for recognition
    ///
    /// Results are delivered asynchronously and out-of-band (typically
    /// via a channel the implementor threads through at construction);
    /// this call only needs to succeed in accepting the frame.
    async fn feed_audio(&self, session_id: SessionId, frame: AudioFrame) -> crate::Result<()>;
}
