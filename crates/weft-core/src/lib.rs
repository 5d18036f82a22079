//! # weft-core
//!
//! Foundation types and the streaming turn reducer for the weft assembler.
//!
//! This crate provides the shared vocabulary the runtime crate builds on:
//!
//! - **Branded IDs**: [`ids::MessageId`], [`ids::ConversationId`] as newtypes
//! - **Events**: [`events::StreamEvent`] — the closed set of typed events a
//!   transport delivers for one assistant turn, plus the wire envelope
//! - **Turn state**: [`turn::TurnState`] — the in-progress or finished
//!   assistant message, with tool calls, thinking, and content blocks
//! - **Reducer**: [`reducer::apply`] — the pure `(state, event) -> state'`
//!   fold that assembles a turn from its event stream
//! - **Text**: [`text::truncate_str`] UTF-8-safe truncation for log previews
//! - **Logging**: [`logging::init`] env-filtered subscriber setup
//!
//! ## Crate Position
//!
//! Foundation crate. No I/O; everything here is pure data and pure
//! functions. Depended on by `weft-runtime`.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod reducer;
pub mod text;
pub mod turn;
