//! Error types for the orchestration core

/// Result type alias using the orchestrator's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating a session
///
/// Every variant carries the stable wire `code` used in outbound
/// `error` events (see [`Error::code`]) alongside a human-readable
/// message for logs and `error.message`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed control message, bad session ID, or unknown message type
    #[error("validation error: {0}")]
    Validation(String),

    /// Audio arrived before `session.start`
    #[error("session not initialized: {0}")]
    SessionNotInitialized(String),

    /// `SessionRegistry::Start` was called for a session ID already live
    #[error("session already exists: {0}")]
    AlreadyExists(String),

    /// `SessionRegistry` is at its configured capacity
    #[error("session capacity exceeded (max {0})")]
    CapacityExceeded(usize),

    /// No session with the given ID is registered
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Inbound audio queue saturated for longer than the ingest grace period
    #[error("audio ingest overrun")]
    IngestOverrun,

    /// Transcriber failed after exhausting retries
    #[error("speech-to-text unavailable: {0}")]
    SttUnavailable(String),

    /// ResponseGenerator failed
    #[error("assistant unavailable: {0}")]
    AiUnavailable(String),

    /// VAD produced an unrecoverable internal error; fatal for the session
    #[error("voice activity detection failed: {0}")]
    VadFailed(String),

    /// The client channel terminated unexpectedly
    #[error("transport lost: {0}")]
    TransportLost(String),

    /// Invalid configuration parameter
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON encode/decode failure on the wire protocol
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else; always accompanied by a log entry at the call site
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Stable error code used in outbound `error` events and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION",
            Error::SessionNotInitialized(_) => "SESSION_NOT_INITIALIZED",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            Error::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Error::IngestOverrun => "INGEST_OVERRUN",
            Error::SttUnavailable(_) => "STT_UNAVAILABLE",
            Error::AiUnavailable(_) => "AI_UNAVAILABLE",
            Error::VadFailed(_) => "VAD_FAILED",
            Error::TransportLost(_) => "TRANSPORT_LOST",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "INTERNAL",
            Error::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the session can continue after this error (vs. must close)
    ///
    /// `VAD_FAILED`, `TRANSPORT_LOST`, and unrecoverable internal errors are
    /// fatal; everything else is surfaced to the client but recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::VadFailed(_) | Error::TransportLost(_) | Error::Internal(_)
        )
    }

    /// Whether a failed operation of this kind is worth retrying with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SttUnavailable(_) | Error::IngestOverrun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_match_taxonomy() {
        assert!(Error::VadFailed("x".into()).is_fatal());
        assert!(Error::TransportLost("x".into()).is_fatal());
        assert!(!Error::Validation("x".into()).is_fatal());
        assert!(!Error::SttUnavailable("x".into()).is_fatal());
    }

    #[test]
    fn codes_are_stable_wire_strings() {
        assert_eq!(Error::SessionNotInitialized("x".into()).code(), "SESSION_NOT_INITIALIZED");
        assert_eq!(Error::IngestOverrun.code(), "INGEST_OVERRUN");
        assert_eq!(Error::VadFailed("x".into()).code(), "VAD_FAILED");
    }
}
