//! Wire protocol for the collaborative whiteboard session layer
//!
//! Defines the JSON envelopes exchanged over WebSocket, the shape/stroke/chat
//! data model, and the DTOs the HTTP control plane returns. No I/O lives
//! here — everything is plain serde types so the router stays a pure
//! function of `(state, event) -> (mutations, actions)`.

#![forbid(unsafe_code)]

pub mod board;
pub mod chat;
pub mod envelope;
pub mod error;
pub mod room;
pub mod shape;

pub use envelope::{Inbound, Outbound};
pub use error::ProtocolError;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
