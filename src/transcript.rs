//! Dual-buffer transcript manager
//!
//! Per session: exactly zero or one `Live` segment, plus an ordered
//! confirmed log. Segments are immutable values held by a single owner
//! (the [`crate::orchestrator::Orchestrator`]), not shared mutable state.

use std::time::{Duration, SystemTime};

/// Whether a segment is a provisional partial or an immutable final
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Mutable-by-replacement partial transcript
    Live,
    /// Immutable once placed in the confirmed log
    Confirmed,
}

/// A span of recognized speech
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    /// Recognized text
    pub text: String,
    /// Recognizer confidence in `[0, 1]`
    pub confidence: f32,
    /// When this segment's audio started, relative to session start
    pub start: Duration,
    /// When this segment's audio ended, relative to session start
    pub end: Duration,
    /// Whether this is a `Live` or `Confirmed` segment
    pub kind: SegmentKind,
    /// BCP-47-ish language tag, if the transcriber reported one
    pub language: Option<String>,
}

/// The prompt-building view of a turn in progress: everything confirmed
/// since the last commit, plus whatever is still live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnView {
    /// Concatenation of confirmed segment text since the last commit
    pub confirmed_concat: String,
    /// Current live segment text, if any
    pub live_suffix: String,
}

impl TurnView {
    /// Whether this turn has any recognized text at all
    pub fn has_text(&self) -> bool {
        !self.confirmed_concat.trim().is_empty() || !self.live_suffix.trim().is_empty()
    }

    /// The text to hand to the response generator as the user's message
    pub fn as_prompt_text(&self) -> String {
        let mut text = self.confirmed_concat.clone();
        if !self.live_suffix.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&self.live_suffix);
        }
        text
    }
}

/// A committed and archived turn, kept for session history / context
#[derive(Debug, Clone, Default)]
pub struct ArchivedTurn {
    /// The confirmed segments that made up this turn
    pub segments: Vec<TranscriptSegment>,
    /// The turn's prompt text at the moment of commit
    pub text: String,
}

/// Owns the dual-buffer transcript state for a single session
///
/// Not `Send`-shared: this type is meant to live exclusively inside the
/// owning [`crate::orchestrator::Orchestrator`] task.
#[derive(Debug, Clone, Default)]
pub struct TranscriptBuffer {
    live: Option<TranscriptSegment>,
    confirmed: Vec<TranscriptSegment>,
}

impl TranscriptBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the single live segment (creating one if absent)
    pub fn update_live(&mut self, text: String, confidence: f32, t: SystemTime, language: Option<String>) {
        let start = self.live.as_ref().map(|s| s.start).unwrap_or(
            t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default(),
        );
        let end = t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
        self.live = Some(TranscriptSegment {
            text,
            confidence,
            start,
            end,
            kind: SegmentKind::Live,
            language,
        });
    }

    /// Append a confirmed segment and clear the live segment
    ///
    /// Returns the newly confirmed segment. Matches the contract guarantee
    /// that a Final supersedes its preceding Partials on the same
    /// utterance: the live segment is always cleared here, never merged.
    pub fn confirm_final(
        &mut self,
        text: String,
        confidence: f32,
        t: SystemTime,
        language: Option<String>,
    ) -> TranscriptSegment {
        let start = self.live.as_ref().map(|s| s.start).unwrap_or(
            t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default(),
        );
        let end = t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
        let segment = TranscriptSegment {
            text,
            confidence,
            start,
            end,
            kind: SegmentKind::Confirmed,
            language,
        };
        self.live = None;
        self.confirmed.push(segment.clone());
        segment
    }

    /// The current live segment, if any
    pub fn current_live(&self) -> Option<&TranscriptSegment> {
        self.live.as_ref()
    }

    /// The prompt-building view: confirmed-so-far concatenation plus the
    /// live suffix
    pub fn turn(&self) -> TurnView {
        let confirmed_concat = self
            .confirmed
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let live_suffix = self.live.as_ref().map(|s| s.text.clone()).unwrap_or_default();
        TurnView {
            confirmed_concat,
            live_suffix,
        }
    }

    /// Whether the confirmed log is non-empty
    pub fn has_confirmed_text(&self) -> bool {
        !self.confirmed.is_empty()
    }

    /// Archive the current turn (confirmed segments + live suffix folded
    /// into prompt text) and reset the buffer for the next turn
    pub fn archive_and_reset(&mut self) -> ArchivedTurn {
        let turn = self.turn();
        let segments = std::mem::take(&mut self.confirmed);
        self.live = None;
        ArchivedTurn {
            segments,
            text: turn.as_prompt_text(),
        }
    }
}
