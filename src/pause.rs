//! Pause classification
//!
//! A pure mapping from accumulated silence duration (and whether the
//! current turn already has text) to a turn-taking decision. Holds no
//! state of its own; thresholds come from [`crate::config::PauseConfig`].

use crate::config::PauseConfig;

/// Silence-duration bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    /// Brief silence; the speaker is likely mid-thought
    NaturalGap,
    /// Silence long enough to plausibly be a turn boundary
    EndOfThought,
    /// Silence long enough that the turn should be committed regardless
    LongPause,
}

/// Result of classifying one silence span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseClassification {
    /// Which bucket the silence duration falls into
    pub kind: PauseKind,
    /// The silence duration that was classified, in milliseconds
    pub duration_ms: u64,
    /// Whether the orchestrator should commit the turn now
    pub should_commit: bool,
}

/// Classify a silence span given its duration and whether the turn has text
///
/// - `< pause.natural_gap_ms`: `NaturalGap`, never commits.
/// - `[natural_gap_ms, end_of_thought_ms)`: `EndOfThought`, commits iff
///   `turn_has_text`.
/// - `>= end_of_thought_ms`: `LongPause`, commits iff `turn_has_text`
///   (a long pause with no text at all has nothing to commit).
pub fn classify(silence_ms: u64, turn_has_text: bool, config: &PauseConfig) -> PauseClassification {
    let kind = if silence_ms < config.natural_gap_ms {
        PauseKind::NaturalGap
    } else if silence_ms < config.end_of_thought_ms {
        PauseKind::EndOfThought
    } else {
        PauseKind::LongPause
    };

    let should_commit = match kind {
        PauseKind::NaturalGap => false,
        PauseKind::EndOfThought | PauseKind::LongPause => turn_has_text,
    };

    PauseClassification {
        kind,
        duration_ms: silence_ms,
        should_commit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PauseConfig {
        PauseConfig::default()
    }

    #[test]
    fn natural_gap_never_commits() {
        let c = classify(500, true, &config());
        assert_eq!(c.kind, PauseKind::NaturalGap);
        assert!(!c.should_commit);
    }

    #[test]
    fn end_of_thought_commits_only_with_text() {
        let with_text = classify(1_500, true, &config());
        assert_eq!(with_text.kind, PauseKind::EndOfThought);
        assert!(with_text.should_commit);

        let without_text = classify(1_500, false, &config());
        assert!(!without_text.should_commit);
    }

    #[test]
    fn long_pause_commits_only_with_text() {
        let with_text = classify(5_000, true, &config());
        assert_eq!(with_text.kind, PauseKind::LongPause);
        assert!(with_text.should_commit);

        let without_text = classify(5_000, false, &config());
        assert!(!without_text.should_commit);
    }

    #[test]
    fn boundary_exactly_at_end_of_thought_ms() {
        let c = classify(3_000, true, &config());
        assert_eq!(c.kind, PauseKind::LongPause);
        assert!(c.should_commit);

        let just_under = classify(2_999, true, &config());
        assert_eq!(just_under.kind, PauseKind::EndOfThought);
    }
}
