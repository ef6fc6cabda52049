//! Fan-out Fabric (`spec.md` §4.6).
//!
//! Executes the action variants the router emits that aren't already tied
//! to a single room's mutation — those go straight through
//! `RoomRegistry::with_room_fanout`/`join_room`/`leave_room`, which enqueue
//! under the same lock that performs the mutation (`spec.md` §9's
//! fan-out-serialization MUST). What's left here is the registry-wide
//! fan-out that was never room-scoped to begin with: a single unicast, a
//! multicast by username, or a broadcast to every connection. Never holds a
//! room or registry lock while writing to a socket — it only ever pushes
//! onto a connection's bounded outbound queue via `try_send`, so one slow
//! reader can't stall the fabric. A full queue means the connection is
//! failed (`spec.md` §5 backpressure policy).

use tracing::warn;
use whiteboard_protocol::envelope::Outbound;

use crate::connection::ConnectionId;
use crate::registry::RoomRegistry;

pub enum RoutingAction {
    Unicast(ConnectionId, Outbound),
    MulticastToUsernames {
        payload: Outbound,
        usernames: Vec<String>,
    },
    Global(Outbound),
}

pub struct Fabric<'a> {
    registry: &'a RoomRegistry,
}

impl<'a> Fabric<'a> {
    pub fn new(registry: &'a RoomRegistry) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, action: RoutingAction) {
        match action {
            RoutingAction::Unicast(conn_id, payload) => self.send(conn_id, payload).await,

            RoutingAction::MulticastToUsernames { payload, usernames } => {
                for username in usernames {
                    for conn_id in self.registry.connection_ids_for_username(&username) {
                        self.send(conn_id, payload.clone()).await;
                    }
                }
            }

            RoutingAction::Global(payload) => {
                for conn_id in self.registry.all_connection_ids() {
                    self.send(conn_id, payload.clone()).await;
                }
            }
        }
    }

    async fn send(&self, conn_id: ConnectionId, payload: Outbound) {
        let Some(sender) = self.registry.sender_for(conn_id) else {
            return;
        };
        if sender.try_send(payload).is_err() {
            warn!(?conn_id, "outbound queue full or closed, dropping connection");
            self.registry.remove_connection(conn_id).await;
        }
    }

    /// Sends each connection its own filtered `roomList`
    /// (`spec.md` §4.6, §4.5). The actual send loop lives on the registry
    /// since several registry methods (`join_room`, `leave_room`) need it
    /// too and this crate has no other shared home for it.
    pub async fn refresh_room_lists(&self) {
        self.registry.refresh_room_lists().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn conn(registry: &RoomRegistry) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(4);
        registry.register_connection(id, tx);
        (id, rx)
    }

    #[tokio::test]
    async fn global_reaches_every_connection() {
        let registry = RoomRegistry::new(10, 100);
        let (_alice, mut rx_a) = conn(&registry);
        let (_bob, mut rx_b) = conn(&registry);

        let fabric = Fabric::new(&registry);
        fabric.execute(RoutingAction::Global(Outbound::error("hi"))).await;

        assert_eq!(rx_a.try_recv().unwrap(), Outbound::error("hi"));
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::error("hi"));
    }

    #[tokio::test]
    async fn multicast_reaches_only_named_recipients() {
        let registry = RoomRegistry::new(10, 100);
        let (alice, mut rx_a) = conn(&registry);
        let (bob, mut rx_b) = conn(&registry);
        registry.set_username(alice, "alice".into());
        registry.set_username(bob, "bob".into());

        let fabric = Fabric::new(&registry);
        fabric
            .execute(RoutingAction::MulticastToUsernames {
                payload: Outbound::error("invited"),
                usernames: vec!["bob".into()],
            })
            .await;

        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::error("invited"));
    }

    #[tokio::test]
    async fn full_outbound_queue_drops_the_connection() {
        let registry = RoomRegistry::new(10, 100);
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        registry.register_connection(id, tx);
        registry.set_username(id, "alice".into());

        let fabric = Fabric::new(&registry);
        // Fill the queue's one slot, then overflow it.
        fabric.execute(RoutingAction::Unicast(id, Outbound::error("a"))).await;
        fabric.execute(RoutingAction::Unicast(id, Outbound::error("b"))).await;

        assert!(registry.connection_username(id).is_none());
    }
}
