//! The `ClientChannel` capability contract (transport to the end client)
//!
//! Consumed, not implemented, by the core: inbound control JSON and binary
//! audio frames arrive through it; outbound event objects are pushed back
//! through it. The wire itself is abstracted away entirely — a websocket,
//! an in-process test double, anything that can move bytes and JSON.

use crate::audio::AudioFrame;
use crate::protocol::ControlMessage;
use async_trait::async_trait;

/// One item arriving from the client, as decoded by the channel implementor
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// A decoded control message
    Control(ControlMessage),
    /// A raw audio frame
    Audio(AudioFrame),
}

/// Transport contract between the orchestrator and one connected client
///
/// Implementors own the underlying wire (WebSocket, raw TCP framing, an
/// in-process test double, ...) and are responsible for decoding inbound
/// bytes into [`InboundMessage`] and encoding outbound
/// [`crate::events::OrchestrationEvent`] envelopes back onto the wire.
/// The orchestrator never inspects transport-level details; it only calls
/// `send_event` and receives `InboundMessage`s via whatever channel the
/// implementor threads through at construction.
#[async_trait]
pub trait ClientChannel: Send + Sync {
    /// Push one outbound event envelope onto the wire
    ///
    /// Must not block indefinitely: a slow or gone client should surface
    /// as an error promptly so the orchestrator can treat it as a
    /// transport loss (`Error::TransportLost`) rather than stall the
    /// session's single-writer task.
    async fn send_event(&self, envelope: crate::protocol::EventEnvelope) -> crate::Result<()>;

    /// Close the underlying transport, if still open
    async fn close(&self) -> crate::Result<()>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::sync::Mutex;

    /// An in-memory [`ClientChannel`] that records every envelope sent to
    /// it, for use in orchestrator unit/integration tests.
    #[derive(Default)]
    pub struct RecordingChannel {
        sent: Mutex<Vec<crate::protocol::EventEnvelope>>,
        closed: Mutex<bool>,
    }

    impl RecordingChannel {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn sent_events(&self) -> Vec<crate::protocol::EventEnvelope> {
            self.sent.lock().await.clone()
        }

        pub async fn was_closed(&self) -> bool {
            *self.closed.lock().await
        }
    }

    #[async_trait]
    impl ClientChannel for RecordingChannel {
        async fn send_event(&self, envelope: crate::protocol::EventEnvelope) -> crate::Result<()> {
            self.sent.lock().await.push(envelope);
            Ok(())
        }

        async fn close(&self) -> crate::Result<()> {
            *self.closed.lock().await = true;
            Ok(())
        }
    }
}
