//! Outbound event protocol and the per-session EventBus
//!
//! The EventBus is a bounded, ordered queue from the Orchestrator to the
//! ClientChannel's writer task. It never reorders events; under
//! backpressure it coalesces low-priority `TranscriptPartial` updates
//! (keeping only the newest) while never dropping high-priority events.

use crate::protocol::EventEnvelope;
use crate::session::SessionId;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// Tagged outbound event variant, strictly ordered per session in emission
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationEvent {
    /// Session is ready to receive audio
    SessionStarted,
    /// Session has ended; no further events follow
    SessionEnded,
    /// A provisional transcript update
    TranscriptPartial {
        /// Live transcript text so far
        text: String,
        /// Recognizer confidence
        confidence: f32,
    },
    /// A finalized transcript segment
    TranscriptFinal {
        /// Final transcript text
        text: String,
        /// Recognizer confidence
        confidence: f32,
    },
    /// The assistant has begun generating a response
    AiThinking,
    /// An incremental piece of the assistant's response
    AiResponseDelta {
        /// Incremental text
        text: String,
    },
    /// The assistant's response is complete
    AiResponseDone {
        /// Full accumulated response text
        text: String,
    },
    /// The assistant's response was cancelled by barge-in
    AiInterrupted,
    /// A recoverable or fatal error, with a stable wire code
    Error {
        /// Stable wire error code
        code: String,
        /// Human-readable message
        message: String,
    },
}

impl OrchestrationEvent {
    /// Whether this event must never be dropped under backpressure
    pub(crate) fn is_high_priority(&self) -> bool {
        matches!(
            self,
            OrchestrationEvent::Error { .. }
                | OrchestrationEvent::SessionEnded
                | OrchestrationEvent::AiInterrupted
        )
    }

    /// Whether this event is a droppable/coalescible low-priority update
    pub(crate) fn is_coalescible_partial(&self) -> bool {
        matches!(self, OrchestrationEvent::TranscriptPartial { .. })
    }

    /// Render into the outbound wire envelope
    pub fn into_envelope(self, session_id: SessionId) -> EventEnvelope {
        let (event_type, payload) = match self {
            OrchestrationEvent::SessionStarted => ("session.ready", json!({})),
            OrchestrationEvent::SessionEnded => ("session.ended", json!({})),
            OrchestrationEvent::TranscriptPartial { text, confidence } => (
                "transcript.partial",
                json!({ "text": text, "confidence": confidence, "isFinal": false }),
            ),
            OrchestrationEvent::TranscriptFinal { text, confidence } => (
                "transcript.final",
                json!({ "text": text, "confidence": confidence, "isFinal": true }),
            ),
            OrchestrationEvent::AiThinking => ("assistant.thinking", json!({})),
            OrchestrationEvent::AiResponseDelta { text } => {
                ("assistant.delta", json!({ "text": text }))
            }
            OrchestrationEvent::AiResponseDone { text } => {
                ("assistant.done", json!({ "text": text }))
            }
            OrchestrationEvent::AiInterrupted => ("assistant.interrupted", json!({})),
            OrchestrationEvent::Error { code, message } => {
                ("error", json!({ "code": code, "message": message }))
            }
        };
        EventEnvelope::new(event_type, session_id, payload)
    }
}

/// Cheap, cloneable handle for publishing to one session's [`EventBus`]
///
/// The Orchestrator hands a clone of this to the response-streaming task
/// it spawns per committed turn, so that task can publish
/// `AiResponseDelta`/`AiResponseDone` events without holding a reference
/// back into the Orchestrator itself.
#[derive(Clone)]
pub struct EventPublisher {
    session_id: SessionId,
    tx: mpsc::Sender<OrchestrationEvent>,
    partial_tx: watch::Sender<Option<OrchestrationEvent>>,
}

impl EventPublisher {
    /// Publish one event, preserving production order
    ///
    /// `TranscriptPartial` events are coalesced on a dedicated single-slot
    /// [`watch`] channel rather than the main queue: each new partial
    /// replaces whatever partial is currently waiting to be delivered, so
    /// the reader always sees the newest one instead of a stale one that
    /// happened to be queued first. High-priority events always await
    /// channel capacity on the main queue.
    pub async fn publish(&self, event: OrchestrationEvent) {
        if event.is_coalescible_partial() {
            // `watch::Sender::send` always succeeds by overwriting the
            // current value, so the newest partial always wins.
            let _ = self.partial_tx.send(Some(event));
            return;
        }

        if event.is_high_priority() {
            if self.tx.send(event).await.is_err() {
                warn!(session_id = %self.session_id, "event bus closed, high-priority event dropped");
            }
            return;
        }

        // Non-partial, non-high-priority events (AiThinking, AiResponseDelta,
        // AiResponseDone, SessionStarted) still block on backpressure so
        // ordering relative to finals is preserved, but we give up after
        // the bus is closed rather than hanging forever.
        if self.tx.send(event).await.is_err() {
            warn!(session_id = %self.session_id, "event bus closed, event dropped");
        }
    }
}

/// The receiving half of an [`EventBus`]
///
/// Merges the main ordered queue with the single-slot coalesced-partial
/// channel, always preferring whatever the main queue has ready so
/// non-partial ordering is never perturbed by partial delivery.
pub struct EventReceiver {
    rx: mpsc::Receiver<OrchestrationEvent>,
    partial_rx: watch::Receiver<Option<OrchestrationEvent>>,
}

impl EventReceiver {
    /// Await the next event, in emission-priority order
    pub async fn recv(&mut self) -> Option<OrchestrationEvent> {
        loop {
            tokio::select! {
                biased;
                event = self.rx.recv() => return event,
                changed = self.partial_rx.changed() => {
                    if changed.is_err() {
                        // publisher side gone; fall back to the main queue only
                        continue;
                    }
                    if let Some(event) = self.partial_rx.borrow_and_update().clone() {
                        return Some(event);
                    }
                }
            }
        }
    }
}

/// Bounded, ordered, priority-aware event queue for one session
///
/// `publish` is non-blocking under normal load. A newly published
/// `TranscriptPartial` always replaces whatever partial is still pending
/// delivery instead of growing the queue; high-priority events always
/// enqueue, applying backpressure to the caller if necessary.
pub struct EventBus {
    publisher: EventPublisher,
    rx: Option<mpsc::Receiver<OrchestrationEvent>>,
    partial_rx: Option<watch::Receiver<Option<OrchestrationEvent>>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus with the configured bounded capacity
    pub fn new(session_id: SessionId, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (partial_tx, partial_rx) = watch::channel(None);
        Self {
            publisher: EventPublisher { session_id, tx, partial_tx },
            rx: Some(rx),
            partial_rx: Some(partial_rx),
            capacity,
        }
    }

    /// Take the receiving half, to be driven by the ClientChannel writer
    /// task. May only be called once.
    pub fn take_receiver(&mut self) -> EventReceiver {
        EventReceiver {
            rx: self.rx.take().expect("EventBus receiver already taken"),
            partial_rx: self
                .partial_rx
                .take()
                .expect("EventBus receiver already taken"),
        }
    }

    /// A cloneable publishing handle sharing this bus's sender
    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    /// Publish one event, preserving production order. See
    /// [`EventPublisher::publish`] for the backpressure policy.
    pub async fn publish(&self, event: OrchestrationEvent) {
        self.publisher.publish(event).await;
    }

    /// Configured bounded capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the bus; the receiver observes channel closure once all
    /// already-queued events have drained.
    pub fn close(&mut self) {
        self.rx = None;
        self.partial_rx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::parse("11111111-1111-1111-1111-111111111111").unwrap()
    }

    #[tokio::test]
    async fn events_are_received_in_publish_order() {
        let mut bus = EventBus::new(sid(), 8);
        let mut rx = bus.take_receiver();

        bus.publish(OrchestrationEvent::SessionStarted).await;
        bus.publish(OrchestrationEvent::AiThinking).await;
        bus.publish(OrchestrationEvent::AiInterrupted).await;

        assert_eq!(rx.recv().await.unwrap(), OrchestrationEvent::SessionStarted);
        assert_eq!(rx.recv().await.unwrap(), OrchestrationEvent::AiThinking);
        assert_eq!(rx.recv().await.unwrap(), OrchestrationEvent::AiInterrupted);
    }

    #[tokio::test]
    async fn high_priority_events_always_deliver() {
        let mut bus = EventBus::new(sid(), 1);
        let rx = bus.take_receiver();
        drop(rx); // force the channel closed; publish must not panic
        bus.publish(OrchestrationEvent::Error {
            code: "INTERNAL".into(),
            message: "x".into(),
        })
        .await;
    }

    #[tokio::test]
    async fn newest_partial_wins_when_consumer_is_behind() {
        let mut bus = EventBus::new(sid(), 8);
        let mut rx = bus.take_receiver();

        bus.publish(OrchestrationEvent::TranscriptPartial {
            text: "hel".into(),
            confidence: 0.3,
        })
        .await;
        bus.publish(OrchestrationEvent::TranscriptPartial {
            text: "hello".into(),
            confidence: 0.6,
        })
        .await;
        bus.publish(OrchestrationEvent::TranscriptPartial {
            text: "hello there".into(),
            confidence: 0.9,
        })
        .await;

        match rx.recv().await.unwrap() {
            OrchestrationEvent::TranscriptPartial { text, .. } => {
                assert_eq!(text, "hello there", "stale partials must be coalesced away");
            }
            other => panic!("expected a TranscriptPartial, got {other:?}"),
        }
    }

    #[test]
    fn envelope_payloads_match_wire_schema() {
        let event = OrchestrationEvent::TranscriptFinal {
            text: "hello".into(),
            confidence: 0.95,
        };
        let env = event.into_envelope(sid());
        assert_eq!(env.event_type, "transcript.final");
        assert_eq!(env.payload["isFinal"], true);
        assert_eq!(env.payload["text"], "hello");
    }
}
