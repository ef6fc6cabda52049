//! Event Router (`spec.md` §4.3).
//!
//! Dispatches a parsed [`Inbound`] envelope to the room/registry mutation it
//! implies. Per-room mutate-and-broadcast events (`draw`, shapes, `clear`,
//! chat, cursor, join/leave) go straight through `RoomRegistry`'s atomic
//! `with_room_fanout`/`join_room`/`leave_room` — the send happens inline,
//! under the same room lock as the mutation (`spec.md` §9's fan-out
//! serialization MUST), so by the time `handle` returns there is nothing left
//! for a caller to execute. What's left in [`RouterOutcome`] is only the
//! registry-wide fan-out that was never room-scoped to begin with: a
//! unicast reply, a multicast invite, or a global broadcast, which
//! [`crate::fanout::Fabric`] executes.
//!
//! Not literally a pure function of immutable state: room and registry
//! mutation happens inline via `RoomRegistry`/`Room` methods, since Rust
//! models "single-writer room state" as a lock rather than as a value the
//! caller threads through. What's preserved is the property that actually
//! matters — no I/O, no direct socket writes here — which is why this is
//! still exhaustively unit-testable without a live connection.

use chrono::Utc;
use whiteboard_protocol::chat::ChatMessage;
use whiteboard_protocol::envelope::{Inbound, Outbound};

use crate::connection::ConnectionId;
use crate::error::RouterError;
use crate::fanout::RoutingAction;
use crate::registry::RoomRegistry;

/// What the router produced: actions for the fabric to execute, plus
/// whether every connection's `roomList` should be refreshed afterward
/// (`spec.md` §4.3's `createRoom` row ends with a registry-wide
/// personalized refresh; `joinRoom`/`leaveRoom`'s refreshes happen inline
/// inside `RoomRegistry` instead, since only disconnect-driven cleanup and
/// `createRoom` need one here).
pub struct RouterOutcome {
    pub actions: Vec<RoutingAction>,
    pub refresh_room_lists: bool,
}

impl RouterOutcome {
    fn just(actions: Vec<RoutingAction>) -> Self {
        Self {
            actions,
            refresh_room_lists: false,
        }
    }

    fn empty() -> Self {
        Self::just(vec![])
    }

    fn error(conn_id: ConnectionId, err: RouterError) -> Self {
        Self::just(vec![RoutingAction::Unicast(conn_id, Outbound::error(err.message()))])
    }
}

pub async fn handle(conn_id: ConnectionId, registry: &RoomRegistry, envelope: Inbound) -> RouterOutcome {
    match envelope {
        Inbound::SetUsername { username } => {
            registry.set_username(conn_id, username.clone());
            let rooms = registry.room_list_for(Some(&username)).await;
            RouterOutcome::just(vec![RoutingAction::Unicast(conn_id, Outbound::RoomList { rooms })])
        }

        Inbound::GetRooms {} => {
            let rooms = registry.room_list_for(None).await;
            RouterOutcome::just(vec![RoutingAction::Unicast(conn_id, Outbound::RoomList { rooms })])
        }

        Inbound::GetActiveUsers {} => RouterOutcome::just(vec![RoutingAction::Unicast(
            conn_id,
            Outbound::ActiveUsers {
                users: registry.active_users(),
            },
        )]),

        Inbound::CreateRoom {
            room_name,
            is_public,
            password,
            invited_users,
        } => {
            let Some(creator) = registry.connection_username(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::UsernameNotSet);
            };

            let summary = registry.create_room(
                &creator,
                room_name.clone(),
                is_public,
                password.clone(),
                invited_users.clone(),
            );
            // The creator always passes entry validation (creator bypass,
            // matching password, fresh room can't be full), so this can't
            // fail in practice.
            let _ = registry.join_room(conn_id, &summary.room_id, &password).await;

            let mut actions = vec![RoutingAction::Unicast(
                conn_id,
                Outbound::RoomCreated {
                    room_id: summary.room_id.clone(),
                    room_name: room_name.clone(),
                    is_public,
                },
            )];

            if is_public {
                actions.push(RoutingAction::Global(Outbound::NewPublicRoom {
                    room_id: summary.room_id.clone(),
                    room_name: room_name.clone(),
                    creator: creator.clone(),
                }));
            } else {
                actions.push(RoutingAction::MulticastToUsernames {
                    payload: Outbound::NewPrivateRoomInvite {
                        room_id: summary.room_id.clone(),
                        room_name,
                        creator,
                        has_password: !password.is_empty(),
                    },
                    usernames: invited_users,
                });
            }

            RouterOutcome {
                actions,
                refresh_room_lists: true,
            }
        }

        Inbound::JoinRoom { room_id, password } => match registry.join_room(conn_id, &room_id, &password).await {
            Ok(()) => RouterOutcome::empty(),
            Err(err) => RouterOutcome::error(conn_id, err),
        },

        Inbound::LeaveRoom {} => match registry.leave_room(conn_id).await {
            Some(_left) => RouterOutcome::empty(),
            None => RouterOutcome::error(conn_id, RouterError::NotInRoom),
        },

        Inbound::Draw { stroke } => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let payload = Outbound::Draw { stroke: stroke.clone() };
            registry
                .with_room_fanout(&room_id, Some(conn_id), payload, |room| {
                    room.push_replay(Outbound::Draw { stroke });
                })
                .await;
            RouterOutcome::empty()
        }

        Inbound::AddShape { shape } => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let payload = Outbound::AddShape { shape: shape.clone() };
            registry
                .with_room_fanout(&room_id, None, payload, |room| {
                    room.upsert_shape(shape.clone());
                    room.push_replay(Outbound::AddShape { shape });
                })
                .await;
            RouterOutcome::empty()
        }

        Inbound::UpdateShape { shape } => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let payload = Outbound::UpdateShape { shape: shape.clone() };
            registry
                .with_room_fanout(&room_id, None, payload, |room| {
                    room.upsert_shape(shape.clone());
                    room.push_replay(Outbound::UpdateShape { shape });
                })
                .await;
            RouterOutcome::empty()
        }

        Inbound::DeleteShape { id } => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let payload = Outbound::DeleteShape { id: id.clone() };
            registry
                .with_room_fanout(&room_id, None, payload, |room| {
                    room.delete_shape(&id);
                    room.push_replay(Outbound::DeleteShape { id });
                })
                .await;
            RouterOutcome::empty()
        }

        Inbound::Clear {} => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let username = registry.connection_username(conn_id).unwrap_or_default();
            let payload = Outbound::Clear { username };
            registry.with_room_fanout(&room_id, None, payload, |room| room.clear()).await;
            RouterOutcome::empty()
        }

        Inbound::Cursor { x, y, username } => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            // Ephemeral: never appended to the replay log.
            registry
                .broadcast_to_room(&room_id, None, Outbound::Cursor { x, y, username })
                .await;
            RouterOutcome::empty()
        }

        Inbound::ChatMessage { message } => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let Some(username) = registry.connection_username(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::UsernameNotSet);
            };
            let timestamp = Utc::now();
            let payload = Outbound::ChatMessage {
                username: username.clone(),
                message: message.clone(),
                timestamp,
            };
            registry
                .with_room_fanout(&room_id, None, payload, |room| {
                    room.push_chat(ChatMessage::chat(room_id.clone(), username, message));
                })
                .await;
            RouterOutcome::empty()
        }

        Inbound::GetChatHistory {} => {
            let Some(room_id) = registry.connection_room(conn_id) else {
                return RouterOutcome::error(conn_id, RouterError::NotInRoom);
            };
            let messages = registry
                .with_room(&room_id, |room| room.chat_history.iter().cloned().collect())
                .await
                .unwrap_or_default();
            RouterOutcome::just(vec![RoutingAction::Unicast(conn_id, Outbound::ChatHistory { messages })])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(10, 100)
    }

    fn register(reg: &RoomRegistry) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(16);
        reg.register_connection(id, tx);
        (id, rx)
    }

    #[tokio::test]
    async fn draw_without_a_room_errors_instead_of_panicking() {
        let reg = registry();
        let (conn, _rx) = register(&reg);
        let outcome = handle(
            conn,
            &reg,
            Inbound::Draw {
                stroke: whiteboard_protocol::shape::StrokeDelta {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 1.0,
                    y2: 1.0,
                    color: "#000".into(),
                    size: 1.0,
                },
            },
        )
        .await;

        match &outcome.actions[..] {
            [RoutingAction::Unicast(_, Outbound::Error { message })] => {
                assert_eq!(message, "Join a room first");
            }
            _ => panic!("expected a single error unicast"),
        }
    }

    #[tokio::test]
    async fn create_public_room_broadcasts_globally_and_flags_a_refresh() {
        let reg = registry();
        let (alice, _rx) = register(&reg);
        reg.set_username(alice, "alice".into());

        let outcome = handle(
            alice,
            &reg,
            Inbound::CreateRoom {
                room_name: "Room".into(),
                is_public: true,
                password: String::new(),
                invited_users: vec![],
            },
        )
        .await;

        assert!(outcome.refresh_room_lists);
        assert!(matches!(outcome.actions[0], RoutingAction::Unicast(_, Outbound::RoomCreated { .. })));
        assert!(matches!(outcome.actions[1], RoutingAction::Global(Outbound::NewPublicRoom { .. })));
    }

    #[tokio::test]
    async fn create_private_room_invites_by_username_instead_of_broadcasting() {
        let reg = registry();
        let (alice, _rx) = register(&reg);
        reg.set_username(alice, "alice".into());

        let outcome = handle(
            alice,
            &reg,
            Inbound::CreateRoom {
                room_name: "Secret".into(),
                is_public: false,
                password: String::new(),
                invited_users: vec!["bob".into()],
            },
        )
        .await;

        match &outcome.actions[1] {
            RoutingAction::MulticastToUsernames { usernames, .. } => {
                assert_eq!(usernames, &vec!["bob".to_string()]);
            }
            _ => panic!("expected a multicast invite"),
        }
    }

    #[tokio::test]
    async fn leave_room_reports_remaining_participant_count_to_the_room() {
        let reg = registry();
        let (alice, _rx_a) = register(&reg);
        let (bob, mut rx_b) = register(&reg);
        reg.set_username(alice, "alice".into());
        reg.set_username(bob, "bob".into());

        let summary = reg.create_room("alice", "Room".into(), true, String::new(), vec![]);
        reg.join_room(alice, &summary.room_id, "").await.unwrap();
        reg.join_room(bob, &summary.room_id, "").await.unwrap();
        // Drain the userJoined broadcast bob received for alice's own join.
        let _ = rx_b.try_recv();

        let outcome = handle(alice, &reg, Inbound::LeaveRoom {}).await;
        assert!(outcome.actions.is_empty());

        match rx_b.try_recv().unwrap() {
            Outbound::UserLeft { username, participants } => {
                assert_eq!(username, "alice");
                assert_eq!(participants, Some(1));
            }
            other => panic!("expected a userLeft broadcast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_message_broadcasts_to_the_room_and_is_recorded() {
        let reg = registry();
        let (alice, mut rx_a) = register(&reg);
        reg.set_username(alice, "alice".into());
        let summary = reg.create_room("alice", "Room".into(), true, String::new(), vec![]);
        reg.join_room(alice, &summary.room_id, "").await.unwrap();
        // Drain the roomJoined + replay sent during join.
        while rx_a.try_recv().is_ok() {}

        let outcome = handle(
            alice,
            &reg,
            Inbound::ChatMessage {
                message: "hi".into(),
            },
        )
        .await;
        assert!(outcome.actions.is_empty());

        match rx_a.try_recv().unwrap() {
            Outbound::ChatMessage { username, message, .. } => {
                assert_eq!(username, "alice");
                assert_eq!(message, "hi");
            }
            other => panic!("expected a chatMessage broadcast, got {other:?}"),
        }

        let history = handle(alice, &reg, Inbound::GetChatHistory {}).await;
        match &history.actions[..] {
            [RoutingAction::Unicast(_, Outbound::ChatHistory { messages })] => {
                assert_eq!(messages.len(), 1);
            }
            _ => panic!("expected a chatHistory unicast"),
        }
    }
}
