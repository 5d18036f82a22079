//! # weft-runtime
//!
//! Turn orchestration over a streaming transport.
//!
//! - **Transport boundary**: [`transport::Transport`] — the contract the
//!   assembler requires from whatever owns the connection and event parsing
//! - **SSE transport**: [`sse::SseTransport`] — server-sent-events
//!   implementation over `reqwest` + `eventsource-stream`
//! - **Orchestrator**: [`orchestrator::TurnOrchestrator`] — `send_message` /
//!   `stop_generation`, per-turn cancellation, watch-published snapshots,
//!   completion and error callbacks
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: weft-core.

#![deny(unsafe_code)]

pub mod errors;
pub mod orchestrator;
pub mod sse;
pub mod transport;

// Re-export main public API
pub use errors::RuntimeError;
pub use orchestrator::{TurnOrchestrator, TurnOrchestratorBuilder};
pub use sse::SseTransport;
pub use transport::{Transport, TransportError, TurnRequest};
