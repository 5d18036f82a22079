//! The transport boundary.
//!
//! The assembler does not own the connection to the agent runtime; it
//! consumes typed events from whatever does. [`Transport`] is that seam:
//! one call per turn, events delivered in order through a bounded channel,
//! resolution when the remote stream ends, and a distinguished cancelled
//! condition so a deliberate stop is never mistaken for a failure.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use weft_core::events::StreamEvent;
use weft_core::ids::ConversationId;

/// Failures at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The per-turn cancellation token fired. Not a genuine failure.
    #[error("stream cancelled")]
    Cancelled,

    /// HTTP-level failure (connect, TLS, request build, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered but the stream was not usable (bad status,
    /// malformed SSE framing).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether this outcome is attributable to cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Request body for opening one turn's stream.
#[derive(Clone, Debug, Serialize)]
pub struct TurnRequest {
    /// The user message that starts the turn.
    pub message: String,
    /// Conversation to continue, when known up front.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// Contract the orchestrator requires from a stream source.
///
/// Implementations must:
/// - deliver every decodable event, in arrival order, via `events`;
/// - resolve `Ok(())` when the remote stream ends normally (including after
///   forwarding `done`, or when the receiver is dropped);
/// - return [`TransportError::Cancelled`] once `cancel` fires;
/// - return any other error on transport or protocol failure.
///
/// Retry/backoff, reordering, and delivery guarantees are the transport's
/// own business; the orchestrator never re-opens a stream for a turn.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the event stream for one turn against `target`.
    async fn open_stream(
        &self,
        target: &str,
        request: &TurnRequest,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError>;
}
