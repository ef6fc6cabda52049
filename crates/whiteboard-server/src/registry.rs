//! Room Registry (`spec.md` §4.4).
//!
//! Thread-safe map of rooms plus the global connection table, grounded on
//! the teacher's `RoomManager` (`room.rs`): a `DashMap`-backed registry with
//! per-room interior mutability, entry-based creation to avoid read-then-
//! write races, and `retain`-based GC. The teacher pairs two peers inside
//! one room; this registry instead tracks an open-ended participant set per
//! room and a single global connection table (the teacher has no analogue
//! for the latter since relay peers never share identity across rooms).

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;
use whiteboard_protocol::envelope::Outbound;
use whiteboard_protocol::room::RoomSummary;

use crate::connection::{ConnectionEntry, ConnectionId};
use crate::error::RouterError;
use crate::room::Room;

pub struct LeaveOutcome {
    pub room_id: String,
    pub username: String,
    pub remaining_participants: usize,
}

pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Mutex<Room>>>,
    connections: DashMap<ConnectionId, ConnectionEntry>,
    default_max_participants: usize,
    replay_log_cap: usize,
    outbound_queue_capacity: usize,
}

impl RoomRegistry {
    pub fn new(default_max_participants: usize, replay_log_cap: usize) -> Self {
        Self::with_queue_capacity(default_max_participants, replay_log_cap, 256)
    }

    pub fn with_queue_capacity(default_max_participants: usize, replay_log_cap: usize, outbound_queue_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            connections: DashMap::new(),
            default_max_participants,
            replay_log_cap,
            outbound_queue_capacity,
        }
    }

    pub fn outbound_queue_capacity(&self) -> usize {
        self.outbound_queue_capacity
    }

    // --- Connection bookkeeping -------------------------------------------------

    pub fn register_connection(&self, id: ConnectionId, outbound: mpsc::Sender<Outbound>) {
        self.connections.insert(id, ConnectionEntry::new(id, outbound));
    }

    pub fn connection_username(&self, id: ConnectionId) -> Option<String> {
        self.connections.get(&id).and_then(|c| c.username.clone())
    }

    pub fn connection_room(&self, id: ConnectionId) -> Option<String> {
        self.connections.get(&id).and_then(|c| c.room_id.clone())
    }

    pub fn set_username(&self, id: ConnectionId, username: String) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.username = Some(username);
        }
    }

    pub(crate) fn sender_for(&self, id: ConnectionId) -> Option<mpsc::Sender<Outbound>> {
        self.connections.get(&id).map(|c| c.outbound.clone())
    }

    pub(crate) fn all_connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|e| *e.key()).collect()
    }

    pub(crate) fn connection_ids_for_username(&self, username: &str) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|e| e.value().username.as_deref() == Some(username))
            .map(|e| *e.key())
            .collect()
    }

    pub fn active_users(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .connections
            .iter()
            .filter_map(|e| e.value().username.clone())
            .collect();
        set.into_iter().collect()
    }

    /// Drops a connection entirely — used both for a clean socket close and
    /// for the bounded-queue overflow fail-fast path (`spec.md` §5). Leaves
    /// any room it was in first so the usual `userLeft` broadcast happens,
    /// then refreshes every connection's room list (`spec.md` §7 "Peer
    /// disconnect": broadcast `userLeft`, refresh room lists). A bare
    /// `leaveRoom` request goes through `leave_room` directly instead, which
    /// does not refresh — the wire table only promises the room broadcast
    /// for that case.
    pub async fn remove_connection(&self, id: ConnectionId) -> Option<LeaveOutcome> {
        let left = self.leave_room(id).await;
        self.connections.remove(&id);
        if left.is_some() {
            self.refresh_room_lists().await;
        }
        left
    }

    // --- Room lifecycle ----------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn create_room(
        &self,
        creator: &str,
        room_name: String,
        is_public: bool,
        password: String,
        invited_users: Vec<String>,
    ) -> RoomSummary {
        let room_id = Uuid::new_v4().to_string();
        let invitees: HashSet<String> = invited_users.into_iter().collect();
        let room = Room::new(
            room_id.clone(),
            room_name,
            creator.to_string(),
            is_public,
            password,
            invitees,
            self.default_max_participants,
            self.replay_log_cap,
        );
        let summary = room.summary();
        self.rooms.insert(room_id, Arc::new(Mutex::new(room)));
        summary
    }

    pub fn get_room(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(room_id).map(|r| Arc::clone(&r))
    }

    /// The user-filtered room list (`spec.md` §4.5): a room is visible iff
    /// public, the viewer is invited, or the viewer created it.
    pub async fn room_list_for(&self, username: Option<&str>) -> Vec<RoomSummary> {
        let arcs: Vec<_> = self.rooms.iter().map(|e| Arc::clone(e.value())).collect();
        let mut out = Vec::new();
        for arc in arcs {
            let room = arc.lock().await;
            if room.visible_to(username) {
                out.push(room.summary());
            }
        }
        out
    }

    /// Validates entry, adds the participant, and sends the join sequence
    /// (`roomJoined`, the replay log, then `userJoined` to the rest of the
    /// room) — all under one acquisition of the room's lock, so a
    /// concurrent event on this room can never be observed by the joiner
    /// out of order with its own join, and can never reach the room's
    /// existing members interleaved with the joiner's `userJoined`
    /// (`spec.md` §5, §8, §9's fan-out-serialization MUST). Connections
    /// whose outbound queue overflows mid-sequence are evicted only after
    /// the lock is released, to avoid recursing into this same room lock.
    pub async fn join_room(&self, conn_id: ConnectionId, room_id: &str, password: &str) -> Result<(), RouterError> {
        let username = self
            .connection_username(conn_id)
            .ok_or(RouterError::UsernameNotSet)?;
        let room_arc = self.get_room(room_id).ok_or(RouterError::RoomNotFound)?;

        let mut overflowed = Vec::new();
        {
            let mut room = room_arc.lock().await;
            room.check_entry(&username, password)?;
            room.add_participant(username.clone(), conn_id);

            if let Some(sender) = self.sender_for(conn_id) {
                let joined = Outbound::RoomJoined {
                    room_id: room_id.to_string(),
                    room_name: room.room_name.clone(),
                };
                if sender.try_send(joined).is_err() {
                    overflowed.push(conn_id);
                } else {
                    for entry in room.replay_log.iter().cloned() {
                        if sender.try_send(entry).is_err() {
                            overflowed.push(conn_id);
                            break;
                        }
                    }
                }
            }

            let joined_broadcast = Outbound::UserJoined { username: username.clone() };
            let targets: Vec<ConnectionId> = room.participants.values().copied().collect();
            for target in targets {
                if target == conn_id {
                    continue;
                }
                if let Some(sender) = self.sender_for(target) {
                    if sender.try_send(joined_broadcast.clone()).is_err() {
                        overflowed.push(target);
                    }
                }
            }
        }

        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.room_id = Some(room_id.to_string());
        }

        for target in overflowed {
            warn!(?target, "outbound queue full or closed, dropping connection");
            self.remove_connection(target).await;
        }

        Ok(())
    }

    /// Removes the connection from whatever room it's in, broadcasts
    /// `userLeft` to the remaining participants under that same room lock
    /// (`spec.md` §5, §9), garbage-collects the room if it's now empty
    /// (every room is eligible for GC — the "keep at least one room"
    /// alternative from `spec.md` §9 was not adopted, see `DESIGN.md`
    /// §9.2), and returns the outcome for callers that want the detail.
    pub async fn leave_room(&self, conn_id: ConnectionId) -> Option<LeaveOutcome> {
        let (room_id, username) = {
            let entry = self.connections.get(&conn_id)?;
            (entry.room_id.clone()?, entry.username.clone()?)
        };

        let mut remaining_participants = 0;
        let mut overflowed = Vec::new();
        if let Some(room_arc) = self.get_room(&room_id) {
            let is_empty = {
                let mut room = room_arc.lock().await;
                room.remove_participant(&username);
                remaining_participants = room.participants.len();

                let payload = Outbound::UserLeft {
                    username: username.clone(),
                    participants: Some(remaining_participants),
                };
                let targets: Vec<ConnectionId> = room.participants.values().copied().collect();
                for target in targets {
                    if let Some(sender) = self.sender_for(target) {
                        if sender.try_send(payload.clone()).is_err() {
                            overflowed.push(target);
                        }
                    }
                }

                room.is_empty()
            };
            if is_empty {
                self.rooms.remove(&room_id);
            }
        }

        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.room_id = None;
        }

        for target in overflowed {
            warn!(?target, "outbound queue full or closed, dropping connection");
            self.remove_connection(target).await;
        }

        Some(LeaveOutcome {
            room_id,
            username,
            remaining_participants,
        })
    }

    /// Runs `mutate` under the room's lock and enqueues `payload` to every
    /// participant except `exclude` before releasing it, so a room's
    /// mutation and the fan-out it implies are never observed in a
    /// different order by two recipients (`spec.md` §5, §9's
    /// fan-out-serialization MUST). Overflowing connections are evicted
    /// only after the lock is released, same reasoning as `join_room`.
    /// Returns whether the room still existed.
    pub async fn with_room_fanout<F>(&self, room_id: &str, exclude: Option<ConnectionId>, payload: Outbound, mutate: F) -> bool
    where
        F: FnOnce(&mut Room),
    {
        let Some(room_arc) = self.get_room(room_id) else {
            return false;
        };

        let mut overflowed = Vec::new();
        {
            let mut room = room_arc.lock().await;
            mutate(&mut room);
            let targets: Vec<ConnectionId> = room.participants.values().copied().collect();
            for target in targets {
                if Some(target) == exclude {
                    continue;
                }
                if let Some(sender) = self.sender_for(target) {
                    if sender.try_send(payload.clone()).is_err() {
                        overflowed.push(target);
                    }
                }
            }
        }

        for target in overflowed {
            warn!(?target, "outbound queue full or closed, dropping connection");
            self.remove_connection(target).await;
        }

        true
    }

    /// `with_room_fanout` without a mutation — used for purely ephemeral
    /// broadcasts like `cursor` that never touch room state.
    pub async fn broadcast_to_room(&self, room_id: &str, exclude: Option<ConnectionId>, payload: Outbound) -> bool {
        self.with_room_fanout(room_id, exclude, payload, |_room| {}).await
    }

    /// Sends each connection its own filtered `roomList`
    /// (`spec.md` §4.5, §4.6) — called whenever a room is created, joined,
    /// or a connection's disconnect changes what's visible.
    pub async fn refresh_room_lists(&self) {
        for conn_id in self.all_connection_ids() {
            let username = self.connection_username(conn_id);
            let rooms = self.room_list_for(username.as_deref()).await;
            let Some(sender) = self.sender_for(conn_id) else {
                continue;
            };
            if sender.try_send(Outbound::RoomList { rooms }).is_err() {
                warn!(?conn_id, "outbound queue full or closed, dropping connection");
                self.remove_connection(conn_id).await;
            }
        }
    }

    /// Looks a room up by its human-readable name rather than id — the
    /// image upload port addresses rooms this way (`spec.md` §4.8 step 1).
    /// Not unique, so this returns the first match.
    pub async fn find_room_id_by_name(&self, room_name: &str) -> Option<String> {
        let arcs: Vec<_> = self.rooms.iter().map(|e| (e.key().clone(), Arc::clone(e.value()))).collect();
        for (id, arc) in arcs {
            if arc.lock().await.room_name == room_name {
                return Some(id);
            }
        }
        None
    }

    pub async fn with_room<F, R>(&self, room_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Room) -> R,
    {
        let arc = self.get_room(room_id)?;
        let mut room = arc.lock().await;
        Some(f(&mut room))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(2, 2000)
    }

    fn register(reg: &RoomRegistry) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(16);
        reg.register_connection(id, tx);
        (id, rx)
    }

    #[tokio::test]
    async fn join_then_leave_garbage_collects_empty_room() {
        let reg = registry();
        let (alice, _rx) = register(&reg);
        reg.set_username(alice, "alice".into());

        let summary = reg.create_room("alice", "Room".into(), true, String::new(), vec![]);
        reg.join_room(alice, &summary.room_id, "").await.unwrap();
        assert!(reg.get_room(&summary.room_id).is_some());

        reg.leave_room(alice).await.unwrap();
        assert!(reg.get_room(&summary.room_id).is_none());
    }

    #[tokio::test]
    async fn join_room_enforces_capacity() {
        let reg = registry();
        let (a, _ra) = register(&reg);
        let (b, _rb) = register(&reg);
        let (c, _rc) = register(&reg);
        reg.set_username(a, "a".into());
        reg.set_username(b, "b".into());
        reg.set_username(c, "c".into());

        let summary = reg.create_room("a", "Room".into(), true, String::new(), vec![]);
        reg.join_room(a, &summary.room_id, "").await.unwrap();
        reg.join_room(b, &summary.room_id, "").await.unwrap();
        assert_eq!(
            reg.join_room(c, &summary.room_id, "").await.unwrap_err(),
            RouterError::RoomFull
        );
    }

    #[tokio::test]
    async fn private_room_hides_from_uninvited_viewers() {
        let reg = registry();
        let (alice, _rx) = register(&reg);
        reg.set_username(alice, "alice".into());
        reg.create_room("alice", "Secret".into(), false, String::new(), vec!["bob".into()]);

        assert!(reg.room_list_for(Some("mallory")).await.is_empty());
        assert_eq!(reg.room_list_for(Some("bob")).await.len(), 1);
        assert_eq!(reg.room_list_for(Some("alice")).await.len(), 1);
    }

    #[tokio::test]
    async fn active_users_reflects_named_connections_only() {
        let reg = registry();
        let (alice, _rx1) = register(&reg);
        let (_bob, _rx2) = register(&reg);
        reg.set_username(alice, "alice".into());

        assert_eq!(reg.active_users(), vec!["alice".to_string()]);
    }
}
