//! Configuration for the orchestration core
//!
//! VAD thresholds, pause-to-commit thresholds, barge-in budget, idle TTL,
//! and the bounded-queue capacities for the event bus and audio ingest.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for an [`crate::orchestrator::Orchestrator`] and
/// the [`crate::session::SessionRegistry`] that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Voice activity detection thresholds and debounce
    pub vad: VadConfig,

    /// Silence-duration-to-commit-decision thresholds
    pub pause: PauseConfig,

    /// Barge-in cancellation budget, in milliseconds
    pub barge_in_cancel_budget_ms: u64,

    /// Per-session inactivity timeout before the Supervisor sweeps it
    pub session_idle_ttl_ms: u64,

    /// Bounded queue capacity for the per-session EventBus
    pub event_bus_capacity: usize,

    /// Bounded queue capacity for inbound audio frames
    pub audio_ingest_capacity: usize,

    /// How long the audio ingest queue may stay saturated before the
    /// session is closed with `INGEST_OVERRUN`
    pub audio_ingest_overrun_ms: u64,

    /// Transcriber retry policy
    pub transcriber: TranscriberConfig,

    /// Maximum number of concurrently live sessions (0 = unlimited)
    pub max_sessions: usize,
}

/// Voice activity detector configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadConfig {
    /// RMS-normalized energy above which speech is considered to have started
    pub enter_threshold: f32,

    /// RMS-normalized energy below which speech is considered to have ended
    pub exit_threshold: f32,

    /// Minimum continuous speech energy duration before `SpeechStarted` fires
    pub min_speech_ms: u32,

    /// Hysteresis window held above `enter_threshold` before confirming speech
    pub enter_hysteresis_ms: u32,

    /// Hysteresis window held below `exit_threshold` before confirming silence
    pub exit_hysteresis_ms: u32,
}

/// Pause classification thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PauseConfig {
    /// Below this, silence is a `natural_gap` (no commit)
    pub natural_gap_ms: u64,

    /// Below this (and at/above `natural_gap_ms`), silence is `end_of_thought`
    pub end_of_thought_ms: u64,
    // Anything at or above `end_of_thought_ms` is `long_pause`.
}

/// Transcriber retry policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Maximum retry attempts after an initial failure
    pub max_retries: u32,

    /// Initial exponential backoff delay, in milliseconds
    pub backoff_initial_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            pause: PauseConfig::default(),
            barge_in_cancel_budget_ms: 200,
            session_idle_ttl_ms: 1_800_000,
            event_bus_capacity: 256,
            audio_ingest_capacity: 64,
            audio_ingest_overrun_ms: 500,
            transcriber: TranscriberConfig::default(),
            max_sessions: 1000,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            enter_threshold: 0.01,
            exit_threshold: 0.005,
            min_speech_ms: 100,
            enter_hysteresis_ms: 100,
            exit_hysteresis_ms: 200,
        }
    }
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            natural_gap_ms: 1_000,
            end_of_thought_ms: 3_000,
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_initial_ms: 250,
        }
    }
}

impl OrchestratorConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if:
    /// - `vad.enter_threshold` is not strictly greater than `vad.exit_threshold`
    /// - any threshold or capacity is zero where a positive value is required
    /// - `pause.natural_gap_ms >= pause.end_of_thought_ms`
    pub fn validate(&self) -> Result<()> {
        if self.vad.enter_threshold <= self.vad.exit_threshold {
            return Err(Error::InvalidConfig(format!(
                "vad.enter_threshold ({}) must be greater than vad.exit_threshold ({})",
                self.vad.enter_threshold, self.vad.exit_threshold
            )));
        }
        if self.vad.exit_threshold <= 0.0 {
            return Err(Error::InvalidConfig(
                "vad.exit_threshold must be positive".to_string(),
            ));
        }
        if self.pause.natural_gap_ms >= self.pause.end_of_thought_ms {
            return Err(Error::InvalidConfig(format!(
                "pause.natural_gap_ms ({}) must be less than pause.end_of_thought_ms ({})",
                self.pause.natural_gap_ms, self.pause.end_of_thought_ms
            )));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event_bus_capacity must be positive".to_string(),
            ));
        }
        if self.audio_ingest_capacity == 0 {
            return Err(Error::InvalidConfig(
                "audio_ingest_capacity must be positive".to_string(),
            ));
        }
        if self.barge_in_cancel_budget_ms == 0 {
            return Err(Error::InvalidConfig(
                "barge_in_cancel_budget_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// `barge_in_cancel_budget_ms` as a [`Duration`]
    pub fn barge_in_cancel_budget(&self) -> Duration {
        Duration::from_millis(self.barge_in_cancel_budget_ms)
    }

    /// `session_idle_ttl_ms` as a [`Duration`]
    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_millis(self.session_idle_ttl_ms)
    }

    /// `audio_ingest_overrun_ms` as a [`Duration`]
    pub fn audio_ingest_overrun(&self) -> Duration {
        Duration::from_millis(self.audio_ingest_overrun_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enter_below_exit_fails() {
        let mut config = OrchestratorConfig::default();
        config.vad.enter_threshold = 0.001;
        config.vad.exit_threshold = 0.005;
        assert!(config.validate().is_err());
    }

    #[test]
    fn pause_thresholds_out_of_order_fails() {
        let mut config = OrchestratorConfig::default();
        config.pause.natural_gap_ms = 3_000;
        config.pause.end_of_thought_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacities_fail() {
        let mut config = OrchestratorConfig::default();
        config.event_bus_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = OrchestratorConfig::default();
        config.audio_ingest_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = OrchestratorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: OrchestratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.vad.enter_threshold, deserialized.vad.enter_threshold);
    }
}
