//! Chat protocol

pub mod message;

pub use message::{ChatKind, ChatMessage};

/// Maximum number of chat messages retained per room (see `spec.md` §3).
pub const CHAT_HISTORY_CAP: usize = 100;
