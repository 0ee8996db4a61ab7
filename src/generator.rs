//! The `ResponseGenerator` capability contract (external LLM service)
//!
//! Consumed, not implemented, by the core: `Start(prompt, context, cancel)
//! -> token stream`. Built around a cancellation signal owned by the
//! orchestrator and checked on every token emission.

use async_trait::async_trait;
use tokio_stream::Stream;

/// One item yielded by a response token stream
#[derive(Debug, Clone)]
pub enum ResponseToken {
    /// An incremental piece of the response
    Delta(String),
    /// Terminal: the full accumulated response text
    Done(String),
    /// Terminal: the generator failed
    Error(String),
}

/// A pinned, boxed stream of [`ResponseToken`]s
pub type TokenStream = std::pin::Pin<Box<dyn Stream<Item = ResponseToken> + Send>>;

/// External LLM streaming capability consumed by the orchestrator
///
/// `cancel` is a [`tokio_util::sync::CancellationToken`]-shaped signal in
/// spirit; this crate expresses it directly as a future so implementors
/// aren't forced to depend on `tokio-util`. The returned stream must stop
/// producing tokens promptly once `cancel` resolves; any tokens produced
/// after that point are the orchestrator's responsibility to discard, not
/// the generator's to suppress (the orchestrator drops the stream and
/// stops polling it on cancellation).
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Begin a cancellable streaming response for one committed turn
    ///
    /// `prompt` is the committed user turn's text; `context` is prior
    /// conversation history the implementor may fold into the model
    /// request. `cancel` resolves when the orchestrator wants the stream
    /// torn down (barge-in, session end).
    async fn start(
        &self,
        prompt: String,
        context: Vec<String>,
        cancel: crate::orchestrator::Cancellation,
    ) -> crate::Result<TokenStream>;
}
