//! Room state (`spec.md` §3, §4.5).
//!
//! A `Room` is mutated by exactly one caller at a time — the registry holds
//! each `Room` behind its own `tokio::sync::Mutex`, mirroring the teacher's
//! single-writer-per-room design in `room.rs` (there: a per-room struct
//! guarded implicitly by `DashMap`'s entry API; here: an explicit mutex
//! since room mutation is multi-step and must be atomic across all of it,
//! not just one field).

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use tracing::debug;
use whiteboard_protocol::board::BoardData;
use whiteboard_protocol::chat::{ChatMessage, CHAT_HISTORY_CAP};
use whiteboard_protocol::envelope::Outbound;
use whiteboard_protocol::room::RoomSummary;
use whiteboard_protocol::shape::ShapeData;

use crate::connection::ConnectionId;
use crate::error::RouterError;

pub struct Room {
    pub room_id: String,
    pub room_name: String,
    pub creator: String,
    pub created_at: Instant,
    pub is_public: bool,
    pub password: String,
    pub invitees: HashSet<String>,
    pub max_participants: usize,
    /// Username -> connection, so a broadcast can resolve to live senders.
    pub participants: HashMap<String, ConnectionId>,
    pub replay_log: VecDeque<Outbound>,
    pub shape_index: HashMap<String, ShapeData>,
    pub chat_history: VecDeque<ChatMessage>,
    replay_log_cap: usize,
}

impl Room {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_id: String,
        room_name: String,
        creator: String,
        is_public: bool,
        password: String,
        invitees: HashSet<String>,
        max_participants: usize,
        replay_log_cap: usize,
    ) -> Self {
        Self {
            room_id,
            room_name,
            creator,
            created_at: Instant::now(),
            is_public,
            password,
            invitees,
            max_participants,
            participants: HashMap::new(),
            replay_log: VecDeque::new(),
            shape_index: HashMap::new(),
            chat_history: VecDeque::new(),
            replay_log_cap,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    /// A room is visible to `u` iff public, `u` is invited, or `u` created
    /// it. Used to filter `roomList` so private room existence never leaks
    /// (`spec.md` §4.5).
    pub fn visible_to(&self, username: Option<&str>) -> bool {
        if self.is_public {
            return true;
        }
        match username {
            Some(u) => u == self.creator || self.invitees.contains(u),
            None => false,
        }
    }

    /// Entry validation order from `spec.md` §4.5: invited/creator, then
    /// password, then capacity. Room-existence is checked by the caller
    /// before it ever reaches here.
    pub fn check_entry(&self, username: &str, password: &str) -> Result<(), RouterError> {
        if !self.is_public && username != self.creator && !self.invitees.contains(username) {
            return Err(RouterError::NotInvited);
        }
        if !self.password.is_empty() && self.password != password {
            return Err(RouterError::WrongPassword);
        }
        if self.is_full() {
            return Err(RouterError::RoomFull);
        }
        Ok(())
    }

    pub fn add_participant(&mut self, username: String, conn_id: ConnectionId) {
        self.participants.insert(username, conn_id);
    }

    /// Removes `username`, returning whether it was actually present.
    pub fn remove_participant(&mut self, username: &str) -> bool {
        self.participants.remove(username).is_some()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            room_name: self.room_name.clone(),
            creator: self.creator.clone(),
            participants: self.participants.len(),
            max_participants: self.max_participants,
            is_public: self.is_public,
            has_password: !self.password.is_empty(),
        }
    }

    /// Appends to the replay log, soft-truncating the oldest entry once the
    /// cap is exceeded (`SPEC_FULL.md` §9.5 open-question decision).
    pub fn push_replay(&mut self, entry: Outbound) {
        self.replay_log.push_back(entry);
        if self.replay_log.len() > self.replay_log_cap {
            self.replay_log.pop_front();
            debug!(room_id = %self.room_id, cap = self.replay_log_cap, "replay log truncated oldest-out");
        }
    }

    pub fn upsert_shape(&mut self, shape: ShapeData) {
        self.shape_index.insert(shape.id().to_string(), shape);
    }

    pub fn delete_shape(&mut self, id: &str) {
        self.shape_index.remove(id);
    }

    /// `clear` truncates the replay log and shape index atomically
    /// (`spec.md` §3 invariant).
    pub fn clear(&mut self) {
        self.replay_log.clear();
        self.shape_index.clear();
    }

    pub fn push_chat(&mut self, message: ChatMessage) {
        self.chat_history.push_back(message);
        if self.chat_history.len() > CHAT_HISTORY_CAP {
            self.chat_history.pop_front();
        }
    }

    /// Reconstructs a saveable snapshot from live room state, for
    /// `POST /api/boards/save` when the caller passes `roomId` rather than
    /// explicit `shapes`/`strokes` (`spec.md` §4.7).
    pub fn board_snapshot(&self) -> BoardData {
        let shapes = self.shape_index.values().cloned().collect();
        let strokes = self
            .replay_log
            .iter()
            .filter_map(|entry| match entry {
                Outbound::Draw { stroke } => Some(stroke.clone()),
                _ => None,
            })
            .collect();
        BoardData {
            shapes,
            strokes,
            eraser_strokes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn room(is_public: bool, password: &str) -> Room {
        Room::new(
            "r1".into(),
            "Room".into(),
            "alice".into(),
            is_public,
            password.into(),
            HashSet::new(),
            2,
            2000,
        )
    }

    #[test]
    fn private_room_rejects_uninvited_user() {
        let r = room(false, "");
        assert_eq!(r.check_entry("mallory", ""), Err(RouterError::NotInvited));
    }

    #[test]
    fn private_room_admits_creator() {
        let r = room(false, "");
        assert_eq!(r.check_entry("alice", ""), Ok(()));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let r = room(true, "secret");
        assert_eq!(r.check_entry("bob", "nope"), Err(RouterError::WrongPassword));
        assert_eq!(r.check_entry("bob", "secret"), Ok(()));
    }

    #[test]
    fn full_room_rejects_new_entrants() {
        let mut r = room(true, "");
        r.add_participant("a".into(), Uuid::new_v4());
        r.add_participant("b".into(), Uuid::new_v4());
        assert_eq!(r.check_entry("c", ""), Err(RouterError::RoomFull));
    }

    #[test]
    fn replay_log_truncates_oldest_first() {
        let mut r = room(true, "");
        for i in 0..3 {
            r.push_replay(Outbound::Clear {
                username: format!("u{i}"),
            });
        }
        assert_eq!(r.replay_log.len(), 2);
        assert_eq!(
            r.replay_log.front(),
            Some(&Outbound::Clear { username: "u1".into() })
        );
    }

    #[test]
    fn clear_empties_log_and_shape_index() {
        let mut r = room(true, "");
        r.push_replay(Outbound::Clear { username: "a".into() });
        r.upsert_shape(whiteboard_protocol::shape::ShapeData::Rectangle(
            whiteboard_protocol::shape::Geometry {
                common: whiteboard_protocol::shape::CommonShapeFields {
                    id: "s1".into(),
                    x: 0.0,
                    y: 0.0,
                    color: "#000".into(),
                    size: 1.0,
                    username: "a".into(),
                    timestamp: 0,
                    fill_color: None,
                },
                width: None,
                height: None,
                radius: None,
            },
        ));
        r.clear();
        assert!(r.replay_log.is_empty());
        assert!(r.shape_index.is_empty());
    }

    #[test]
    fn board_snapshot_collects_shapes_and_draw_strokes() {
        use whiteboard_protocol::shape::{CommonShapeFields, Geometry, StrokeDelta};

        let mut r = room(true, "");
        r.push_replay(Outbound::Draw {
            stroke: StrokeDelta {
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
                color: "#000".into(),
                size: 1.0,
            },
        });
        r.upsert_shape(ShapeData::Rectangle(Geometry {
            common: CommonShapeFields {
                id: "s1".into(),
                x: 0.0,
                y: 0.0,
                color: "#000".into(),
                size: 1.0,
                username: "a".into(),
                timestamp: 0,
                fill_color: None,
            },
            width: None,
            height: None,
            radius: None,
        }));

        let snapshot = r.board_snapshot();
        assert_eq!(snapshot.shapes.len(), 1);
        assert_eq!(snapshot.strokes.len(), 1);
    }
}
