//! Wire protocol: inbound control JSON and the outbound event envelope
//!
//! A tagged enum (`#[serde(tag = "type", ...)]`) with no request/response
//! correlation — each message stands on its own.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Inbound control messages a [`crate::channel::ClientChannel`] decodes
/// from JSON before handing them to the orchestrator
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// `session.start` — begin a new session
    #[serde(rename = "session.start")]
    SessionStart {
        /// Canonical session ID the client wants to use
        #[serde(rename = "sessionId")]
        session_id: String,
        /// Optional BCP-47-ish language hint
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// `session.end` — end an existing session
    #[serde(rename = "session.end")]
    SessionEnd {
        /// Session to end
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// `heartbeat` — keep-alive, answered with `pong`
    #[serde(rename = "heartbeat")]
    Heartbeat {
        /// Session the heartbeat belongs to
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Outbound wire envelope: every event carries `type`, `sessionId`,
/// `payload`, and a Unix-ms `timestamp`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Event type tag, e.g. `"transcript.partial"`
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// Session this event belongs to
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Event-specific payload
    pub payload: serde_json::Value,
    /// Unix milliseconds at emission time
    pub timestamp: u64,
}

impl EventEnvelope {
    /// Build an envelope, stamping the current wall-clock time
    pub fn new(event_type: &'static str, session_id: SessionId, payload: serde_json::Value) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            event_type,
            session_id: session_id.to_string(),
            payload,
            timestamp,
        }
    }
}

/// `{"type":"pong","sessionId":...}` answer to an inbound heartbeat
pub fn pong_message(session_id: &str) -> serde_json::Value {
    serde_json::json!({ "type": "pong", "sessionId": session_id })
}
