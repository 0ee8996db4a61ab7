//! Per-session orchestration core for full-duplex, barge-in-aware
//! conversational voice agents.
//!
//! This crate owns the part of a voice agent that sits between a raw
//! audio/control transport and the external speech-to-text and language
//! model services: voice activity detection, transcript buffering, pause
//! classification and turn commit, cancellable streaming responses, and
//! ordered event delivery back to the client. It does not implement any
//! of those external services itself — see [`transcriber::Transcriber`],
//! [`generator::ResponseGenerator`], and [`channel::ClientChannel`] for
//! the capability contracts a deployment wires in.
//!
//! # Layout
//!
//! - [`session`] — session identity, lifecycle state, and the registry
//! - [`audio`] / [`vad`] — inbound framing and voice activity detection
//! - [`transcript`] / [`pause`] — transcript buffering and turn-commit policy
//! - [`orchestrator`] — the per-session state machine tying it all together
//! - [`supervisor`] — process-wide session creation, idle sweeping, shutdown
//! - [`events`] / [`protocol`] — the outbound event bus and wire format
//! - [`transcriber`] / [`generator`] / [`channel`] — consumed capability contracts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audio;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod orchestrator;
pub mod pause;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod transcriber;
pub mod transcript;
pub mod vad;

pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use session::{Session, SessionId, SessionMetrics, SessionRegistry, SessionState};
pub use supervisor::Supervisor;

/// Crate version, as set in `Cargo.toml`
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
