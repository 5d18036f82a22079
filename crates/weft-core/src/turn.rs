//! Turn state — the in-progress or finished assistant message.
//!
//! One [`TurnState`] exists per assistant reply cycle. It is created when a
//! turn opens, mutated exclusively through [`crate::reducer::apply`], and
//! becomes immutable once a terminal condition is reached. Observers receive
//! cloned snapshots and never mutate them.
//!
//! Serialization is camelCase: these structs are the read model a rendering
//! layer consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::ContentBlockType;
use crate::ids::MessageId;

/// Content shown when a turn fails before producing any text.
pub const GENERIC_FAILURE_CONTENT: &str = "Something went wrong. Please try again.";

/// Content shown when an in-band error event carries an empty message.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Message author role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human participant.
    User,
    /// The assistant; the only role this assembler produces.
    Assistant,
}

/// Delivery status of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Turn open, reply still being generated.
    Sending,
    /// Finished normally (including deliberate user stops).
    Sent,
    /// A failure was recorded on the turn.
    Error,
}

/// Lifecycle status of a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    /// Invocation in flight.
    Running,
    /// Finished successfully; `output` is set.
    Completed,
    /// Finished with an error; `error` is set.
    Failed,
}

/// A record of one external action the assistant invoked during the turn.
///
/// Transitions `running -> completed` or `running -> failed` exactly once;
/// exactly one of `output` / `error` is retained at the end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Unique id within the turn.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Opaque structured input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Current lifecycle status.
    pub status: ToolCallStatus,
    /// Output, present only once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error, present only once failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// When the invocation finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Accumulated internal reasoning text, separate from the visible reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingBlock {
    /// Reasoning text accumulated so far.
    pub content: String,
    /// Sticky: once sealed, stays sealed for the rest of the turn.
    pub is_complete: bool,
}

/// A finished, atomically-delivered structured fragment attached to the
/// turn. Never exists in a partial state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    /// Unique block id.
    pub id: String,
    /// Block kind.
    #[serde(rename = "type")]
    pub block_type: ContentBlockType,
    /// Block content.
    pub content: String,
    /// Language hint for code blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Optional display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Opaque additional metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// The single source-of-truth snapshot of one assistant reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnState {
    /// Message id; local until `session_start` supplies a server one.
    pub id: MessageId,
    /// Always [`Role::Assistant`] for assembled turns.
    pub role: Role,
    /// Accumulated reply text. Never shrinks except via a `text_complete`
    /// replacement.
    pub content: String,
    /// Creation time, fixed at turn start.
    pub timestamp: DateTime<Utc>,
    /// Delivery status.
    pub status: MessageStatus,
    /// True while the turn is open.
    pub is_streaming: bool,
    /// Tool calls in first-seen order, unique by id.
    pub tool_calls: Vec<ToolCall>,
    /// At most one thinking block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingBlock>,
    /// Finished content blocks, append-only.
    pub content_blocks: Vec<ContentBlock>,
}

impl TurnState {
    /// Open a fresh turn: local id, `sending`, streaming, empty content.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            status: MessageStatus::Sending,
            is_streaming: true,
            tool_calls: Vec::new(),
            thinking: None,
            content_blocks: Vec::new(),
        }
    }

    /// Whether the turn reached a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_streaming
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain finished-message projection handed to the completion callback.
///
/// Deliberately free of streaming bookkeeping: what a caller persists or
/// appends to its history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Final reply text.
    pub content: String,
    /// Turn creation time.
    pub timestamp: DateTime<Utc>,
    /// Final status.
    pub status: MessageStatus,
}

impl From<&TurnState> for ChatMessage {
    fn from(turn: &TurnState) -> Self {
        Self {
            id: turn.id.clone(),
            role: turn.role,
            content: turn.content.clone(),
            timestamp: turn.timestamp,
            status: turn.status,
        }
    }
}
