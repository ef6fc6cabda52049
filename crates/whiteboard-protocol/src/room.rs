//! Room summary DTOs — what gets sent in a `roomList`/`roomCreated`/
//! `roomJoined` envelope. The authoritative `Room` state (replay log, shape
//! index, membership) lives in `whiteboard_server::room`; this module only
//! holds the wire-facing projection of it.

use serde::{Deserialize, Serialize};

/// One entry of a `roomList` envelope.
///
/// `hasPassword` is sent instead of the password itself — clients never see
/// the password, only whether one is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub room_name: String,
    pub creator: String,
    pub participants: usize,
    pub max_participants: usize,
    pub is_public: bool,
    pub has_password: bool,
}
