//! Voice activity detection
//!
//! A windowed RMS energy estimator (`sqrt(mean(samples^2))`) with a
//! two-threshold hysteresis band and a minimum-speech-duration debounce,
//! to suppress spurious triggers at the threshold boundary.

use crate::audio::AudioFrame;
use crate::config::VadConfig;

/// One event per processed frame, tagged by what the detector observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VadEvent {
    /// Energy crossed above `enter_threshold` and stayed there for
    /// `min_speech_ms`
    SpeechStarted,
    /// Speech is ongoing; carries the frame's RMS energy
    SpeechContinuing {
        /// RMS-normalized energy of the frame that produced this event
        energy: f32,
    },
    /// Energy dropped below `exit_threshold` for `exit_hysteresis_ms`,
    /// ending a speech span. Carries the accumulated silence so far.
    SpeechEnded {
        /// Milliseconds of silence accumulated since this speech span ended
        silence_ms: u64,
    },
    /// No speech is active; carries the accumulated silence duration
    Silence {
        /// Milliseconds of silence accumulated since the last `SpeechEnded`
        silence_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Silent,
    RisingToSpeech,
    Speaking,
    FallingToSilence,
}

/// Per-session energy-based voice activity detector
///
/// `Process` is called once per inbound [`AudioFrame`], in arrival order;
/// it is the only way the detector's internal state changes, so a single
/// `VadEngine` must not be shared across concurrent callers.
pub struct VadEngine {
    config: VadConfig,
    phase: Phase,
    /// ms spent in the current rising/falling transition window
    transition_ms: u64,
    /// cumulative silence since the last SpeechEnded
    silence_ms: u64,
}

impl VadEngine {
    /// Build a detector from the session's VAD configuration
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            phase: Phase::Silent,
            transition_ms: 0,
            silence_ms: 0,
        }
    }

    /// RMS energy of a frame, normalized to `[0, 1]` by the 16-bit sample range
    fn frame_energy(frame: &AudioFrame) -> f32 {
        let samples = frame.samples();
        if samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = (sum_squares / samples.len() as f64).sqrt();
        (rms / i16::MAX as f64) as f32
    }

    /// Process one frame, in arrival order, producing exactly one event
    pub fn process(&mut self, frame: &AudioFrame) -> VadEvent {
        let energy = Self::frame_energy(frame);
        let duration_ms = frame.duration_ms() as u64;

        match self.phase {
            Phase::Silent => {
                if energy > self.config.enter_threshold {
                    self.transition_ms += duration_ms;
                    if self.transition_ms >= self.config.enter_hysteresis_ms as u64
                        && self.transition_ms >= self.config.min_speech_ms as u64
                    {
                        self.phase = Phase::Speaking;
                        self.transition_ms = 0;
                        self.silence_ms = 0;
                        VadEvent::SpeechStarted
                    } else {
                        self.phase = Phase::RisingToSpeech;
                        VadEvent::Silence {
                            silence_ms: self.silence_ms,
                        }
                    }
                } else {
                    self.silence_ms += duration_ms;
                    VadEvent::Silence {
                        silence_ms: self.silence_ms,
                    }
                }
            }
            Phase::RisingToSpeech => {
                if energy > self.config.enter_threshold {
                    self.transition_ms += duration_ms;
                    if self.transition_ms >= self.config.enter_hysteresis_ms as u64
                        && self.transition_ms >= self.config.min_speech_ms as u64
                    {
                        self.phase = Phase::Speaking;
                        self.transition_ms = 0;
                        self.silence_ms = 0;
                        VadEvent::SpeechStarted
                    } else {
                        VadEvent::Silence {
                            silence_ms: self.silence_ms,
                        }
                    }
                } else {
                    // energy dipped before debounce completed: back to silence
                    self.phase = Phase::Silent;
                    self.transition_ms = 0;
                    self.silence_ms += duration_ms;
                    VadEvent::Silence {
                        silence_ms: self.silence_ms,
                    }
                }
            }
            Phase::Speaking => {
                if energy < self.config.exit_threshold {
                    self.transition_ms += duration_ms;
                    if self.transition_ms >= self.config.exit_hysteresis_ms as u64 {
                        self.phase = Phase::Silent;
                        self.transition_ms = 0;
                        self.silence_ms = duration_ms;
                        VadEvent::SpeechEnded {
                            silence_ms: self.silence_ms,
                        }
                    } else {
                        self.phase = Phase::FallingToSilence;
                        VadEvent::SpeechContinuing { energy }
                    }
                } else {
                    VadEvent::SpeechContinuing { energy }
                }
            }
            Phase::FallingToSilence => {
                if energy < self.config.exit_threshold {
                    self.transition_ms += duration_ms;
                    if self.transition_ms >= self.config.exit_hysteresis_ms as u64 {
                        self.phase = Phase::Silent;
                        self.transition_ms = 0;
                        self.silence_ms = duration_ms;
                        VadEvent::SpeechEnded {
                            silence_ms: self.silence_ms,
                        }
                    } else {
                        VadEvent::SpeechContinuing { energy }
                    }
                } else {
                    // energy rose again before exit debounce completed: still speaking
                    self.phase = Phase::Speaking;
                    self.transition_ms = 0;
                    VadEvent::SpeechContinuing { energy }
                }
            }
        }
    }

    /// Cumulative silence, in milliseconds, since the last `SpeechEnded`
    pub fn silence_ms(&self) -> u64 {
        self.silence_ms
    }

    /// Advance the silence accumulator without processing a frame (used by
    /// the orchestrator's commit debounce timer, which fires independent of
    /// audio arrival).
    pub fn tick_silence(&mut self, elapsed_ms: u64) {
        if matches!(self.phase, Phase::Silent) {
            self.silence_ms += elapsed_ms;
        }
    }
}
