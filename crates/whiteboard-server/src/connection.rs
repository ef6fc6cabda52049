//! Per-connection state (`spec.md` §4.2).
//!
//! The actual socket I/O (read loop, writer task) lives in `network.rs`;
//! this module is the bookkeeping the registry keeps about a connection so
//! the router and fan-out fabric can address it without ever touching a
//! socket directly.

use tokio::sync::mpsc;
use uuid::Uuid;
use whiteboard_protocol::envelope::Outbound;

pub type ConnectionId = Uuid;

/// Mirrors the `spec.md` §4.2 state diagram. `Init` only exists before the
/// connection is registered (the handshake is handled entirely in
/// `network.rs`), so it's not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Named,
    InRoom,
}

/// What the registry and router know about one live connection.
pub struct ConnectionEntry {
    pub id: ConnectionId,
    pub username: Option<String>,
    pub room_id: Option<String>,
    /// Bounded per-connection outbound queue (`spec.md` §4.2, §5). A single
    /// writer task per connection drains this; sends use `try_send` so a
    /// full queue fails fast instead of blocking the fan-out fabric.
    pub outbound: mpsc::Sender<Outbound>,
}

impl ConnectionEntry {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            username: None,
            room_id: None,
            outbound,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.room_id.is_some() {
            ConnectionState::InRoom
        } else if self.username.is_some() {
            ConnectionState::Named
        } else {
            ConnectionState::Open
        }
    }
}
