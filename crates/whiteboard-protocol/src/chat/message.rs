//! Chat message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `spec.md` §3: `{roomId, username, text, timestamp, kind}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub room_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ChatKind,
}

impl ChatMessage {
    /// A user-authored chat line.
    pub fn chat(room_id: impl Into<String>, username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            username: username.into(),
            text: text.into(),
            timestamp: Utc::now(),
            kind: ChatKind::Chat,
        }
    }

    /// A synthetic system notice (join/leave/clear, etc).
    pub fn system(room_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            username: String::new(),
            text: text.into(),
            timestamp: Utc::now(),
            kind: ChatKind::System,
        }
    }
}

/// Discriminates why a chat-history entry was recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChatKind {
    Chat,
    UserJoined,
    UserLeft,
    System,
}
