//! The stream reducer: folds one event into the turn state.
//!
//! [`apply`] is a pure transition function `(state, event) -> state'`. It
//! never fails, never suspends, and never decides to stop consuming events;
//! closing the turn is driven by the orchestrator (a `done` event,
//! cancellation, or a transport failure).
//!
//! Event-level anomalies are absorbed as no-ops rather than errors: a
//! `tool_call_end` for an unknown id, thinking fragments after the block
//! was sealed, a seal without an open block. The transport trusts delivery
//! order and so does the reducer.

use chrono::Utc;

use crate::events::StreamEvent;
use crate::turn::{
    ContentBlock, GENERIC_ERROR_MESSAGE, MessageStatus, ThinkingBlock, ToolCall, ToolCallStatus,
    TurnState,
};

/// Fold one stream event into the turn state, producing the next state.
#[must_use]
pub fn apply(mut state: TurnState, event: StreamEvent) -> TurnState {
    match event {
        StreamEvent::SessionStart { message_id, .. } => {
            // Conversation binding is the orchestrator's concern; the turn
            // only adopts a server-assigned message id.
            if let Some(id) = message_id {
                state.id = id;
            }
        }

        StreamEvent::TextDelta { text } => {
            state.content.push_str(&text);
        }

        StreamEvent::TextComplete { text } => {
            // Always overrides the accumulation, even with an empty value.
            state.content = text;
        }

        StreamEvent::ThinkingStart {} => {
            // A sealed block stays sealed; restarting after thinking_end is
            // not a confirmed behavior, so it is ignored.
            if !state.thinking.as_ref().is_some_and(|t| t.is_complete) {
                state.thinking = Some(ThinkingBlock::default());
            }
        }

        StreamEvent::ThinkingDelta { content } => {
            if let Some(thinking) = state.thinking.as_mut()
                && !thinking.is_complete
            {
                thinking.content.push_str(&content);
            }
        }

        StreamEvent::ThinkingEnd { content } => {
            if let Some(thinking) = state.thinking.as_mut()
                && !thinking.is_complete
            {
                if let Some(finalized) = content {
                    thinking.content = finalized;
                }
                thinking.is_complete = true;
            }
        }

        StreamEvent::ToolCallStart {
            id,
            name,
            input,
            started_at,
        } => {
            state.tool_calls.push(ToolCall {
                id,
                name,
                input,
                status: ToolCallStatus::Running,
                output: None,
                error: None,
                started_at: started_at.unwrap_or_else(Utc::now),
                completed_at: None,
            });
        }

        StreamEvent::ToolCallEnd {
            id,
            output,
            error,
            completed_at,
        } => {
            // Unknown ids and already-resolved calls are no-ops: a tool
            // call transitions out of `running` exactly once.
            if let Some(call) = state
                .tool_calls
                .iter_mut()
                .find(|c| c.id == id && c.status == ToolCallStatus::Running)
            {
                if let Some(message) = error {
                    call.status = ToolCallStatus::Failed;
                    call.error = Some(message);
                } else {
                    call.status = ToolCallStatus::Completed;
                    call.output = output;
                }
                call.completed_at = Some(completed_at.unwrap_or_else(Utc::now));
            }
        }

        StreamEvent::ContentBlockEnd {
            id,
            block_type,
            content,
            language,
            title,
            metadata,
        } => {
            state.content_blocks.push(ContentBlock {
                id,
                block_type,
                content,
                language,
                title,
                metadata,
            });
        }

        StreamEvent::Error { code, message } => {
            tracing::warn!(%code, %message, "stream reported error");
            state.status = MessageStatus::Error;
            if state.content.is_empty() {
                state.content = if message.is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
            }
        }

        StreamEvent::Done {} => {
            state.is_streaming = false;
            if state.status != MessageStatus::Error {
                state.status = MessageStatus::Sent;
            }
        }
    }

    state
}

/// Fold a whole event sequence, in order. Test and replay helper.
#[must_use]
pub fn apply_all<I>(state: TurnState, events: I) -> TurnState
where
    I: IntoIterator<Item = StreamEvent>,
{
    events.into_iter().fold(state, apply)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
