//! Server configuration
//!
//! Mirrors the teacher's `RelayConfig` shape (dual bind addresses, a
//! `validate()` clamp pass, manual `Default`), generalized to the
//! whiteboard's dual-listener topology: a hand-rolled WebSocket/static-image
//! surface (`spec.md` §4.9) on `ws_bind_addr`, and an axum JSON control
//! plane on `http_bind_addr`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hand-rolled WebSocket + static `/images/<name>` listener.
    pub ws_bind_addr: String,
    /// axum JSON control plane (`/api/boards/*`, `/api/auth/*`).
    pub http_bind_addr: String,
    /// Base directory for `saved_boards/`, uploaded images, and the
    /// credential database.
    pub data_dir: String,
    /// Default room capacity, used unless a `createRoom` caller overrides it.
    pub default_max_participants: usize,
    /// Bound on each connection's outbound write queue (`spec.md` §5).
    pub outbound_queue_capacity: usize,
    /// Soft cap on a room's replay log before oldest-out truncation
    /// (`SPEC_FULL.md` §9.5).
    pub replay_log_cap: usize,
    /// Idle-room sweep interval in seconds.
    pub room_gc_interval_secs: u64,
}

impl ServerConfig {
    const MIN_OUTBOUND_QUEUE: usize = 8;

    pub fn validate(&mut self) {
        if self.outbound_queue_capacity < Self::MIN_OUTBOUND_QUEUE {
            self.outbound_queue_capacity = Self::MIN_OUTBOUND_QUEUE;
        }
        if self.default_max_participants == 0 {
            self.default_max_participants = 50;
        }
        if self.replay_log_cap == 0 {
            self.replay_log_cap = 2000;
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_bind_addr: "0.0.0.0:9001".to_string(),
            http_bind_addr: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            default_max_participants: 50,
            outbound_queue_capacity: 256,
            replay_log_cap: 2000,
            room_gc_interval_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_clamps_tiny_queue_capacity() {
        let mut cfg = ServerConfig {
            outbound_queue_capacity: 0,
            ..ServerConfig::default()
        };
        cfg.validate();
        assert_eq!(cfg.outbound_queue_capacity, ServerConfig::MIN_OUTBOUND_QUEUE);
    }
}
