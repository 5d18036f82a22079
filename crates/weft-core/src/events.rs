//! Stream event schema for turn assembly.
//!
//! One assistant turn arrives as an ordered sequence of small, typed events
//! (text fragments, thinking fragments, tool invocations, finished content
//! blocks, errors, and a terminal `done`). [`StreamEvent`] is the closed set
//! of kinds the assembler consumes; [`EventEnvelope`] is the exact wire
//! shape each server-sent line decodes to.
//!
//! Events are transient (never persisted) and drive real-time state updates
//! as the remote runtime generates the reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ConversationId, MessageId};

// ─────────────────────────────────────────────────────────────────────────────
// StreamEvent — the closed event set
// ─────────────────────────────────────────────────────────────────────────────

/// One typed event delivered by the transport for the current turn.
///
/// Wire format: `{"event": "<kind>", "data": {...}}`. Every variant is a
/// struct variant (possibly field-less) because the wire always carries a
/// `data` object, even when empty, and unknown payload fields must be
/// ignored rather than rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First event of a turn; supplies server-assigned identifiers.
    SessionStart {
        /// Upstream session id (unused by the assembler).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        /// Conversation this turn is bound to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<ConversationId>,
        /// Server-assigned id of the message being generated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<MessageId>,
    },

    /// Incremental reply text; appended to accumulated content.
    TextDelta {
        /// Text fragment.
        #[serde(default)]
        text: String,
    },

    /// Final reply text; replaces accumulated content wholesale.
    TextComplete {
        /// Full final text.
        #[serde(default)]
        text: String,
    },

    /// A thinking (reasoning) block opened.
    ThinkingStart {},

    /// Incremental thinking content.
    ThinkingDelta {
        /// Thinking text fragment.
        #[serde(default)]
        content: String,
    },

    /// The thinking block sealed.
    ThinkingEnd {
        /// Final thinking text; when absent, the accumulation stands.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// A tool invocation started.
    ToolCallStart {
        /// Unique tool call id.
        id: String,
        /// Tool name.
        name: String,
        /// Opaque structured input arguments.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Value>,
        /// When the tool started, if the runtime reports it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },

    /// A tool invocation finished, successfully or not.
    ToolCallEnd {
        /// Id of the matching `tool_call_start`.
        id: String,
        /// Tool output (success).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        /// Error message (failure). Presence of this field decides the
        /// terminal status.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// When the tool finished, if the runtime reports it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed_at: Option<DateTime<Utc>>,
    },

    /// One finished, atomically-delivered structured block.
    ContentBlockEnd {
        /// Unique block id.
        id: String,
        /// Block kind.
        #[serde(rename = "type")]
        block_type: ContentBlockType,
        /// Block content.
        #[serde(default)]
        content: String,
        /// Language hint for code blocks.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        /// Optional display title.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Opaque additional metadata.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },

    /// A failure reported in-band by the runtime. Records an error on the
    /// turn but does not, by itself, end the stream.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// Terminal: the turn is finished.
    Done {},
}

impl StreamEvent {
    /// Short kind string for logging, matching the wire tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => "session_start",
            Self::TextDelta { .. } => "text_delta",
            Self::TextComplete { .. } => "text_complete",
            Self::ThinkingStart {} => "thinking_start",
            Self::ThinkingDelta { .. } => "thinking_delta",
            Self::ThinkingEnd { .. } => "thinking_end",
            Self::ToolCallStart { .. } => "tool_call_start",
            Self::ToolCallEnd { .. } => "tool_call_end",
            Self::ContentBlockEnd { .. } => "content_block_end",
            Self::Error { .. } => "error",
            Self::Done {} => "done",
        }
    }

    /// Whether this is the terminal `done` event.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done {})
    }
}

/// Kinds of structured content blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBlockType {
    /// Source code sample.
    Code,
    /// Tabular data.
    Table,
    /// Image reference.
    Image,
    /// File reference.
    File,
    /// Raw JSON payload.
    Json,
    /// Markdown fragment.
    Markdown,
}

// ─────────────────────────────────────────────────────────────────────────────
// EventEnvelope — wire framing
// ─────────────────────────────────────────────────────────────────────────────

/// The wire envelope around one stream event.
///
/// Each server-sent `data:` payload is a JSON object carrying the tagged
/// event plus optional sequencing diagnostics. The assembler trusts arrival
/// order and never consults `index` or `timestamp`; they exist for
/// debugging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The event itself, tagged inline (`event` / `data` keys).
    #[serde(flatten)]
    pub event: StreamEvent,
    /// Sequence number assigned by the emitter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    /// Emission timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}
