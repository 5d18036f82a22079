//! Runtime error types.

use thiserror::Error;

use crate::transport::TransportError;

/// Failures the orchestrator surfaces through the error callback.
///
/// Cancellation is never represented here: a cancelled turn is a deliberate
/// stop, reported as a normal `sent` state.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The transport failed for a non-cancellation reason.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The transport task aborted or panicked before resolving.
    #[error("transport task failed: {0}")]
    Task(String),
}
