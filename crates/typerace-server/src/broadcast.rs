use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use tokio::sync::mpsc;

use typerace_core::net::messages::ServerMessage;
use typerace_core::net::protocol::encode_server_message;
use typerace_core::participant::ConnectionId;

/// Per-connection sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot exhaust memory; `Bytes` makes the
/// fan-out clone cheap.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Delivers server messages to single connections or to room groups.
///
/// Delivery is fire-and-forget: a full or closed channel drops the message
/// for that recipient only.
#[derive(Default)]
pub struct BroadcastGateway {
    senders: HashMap<ConnectionId, PlayerSender>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl BroadcastGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection_id: ConnectionId, sender: PlayerSender) {
        self.senders.insert(connection_id, sender);
    }

    /// Forget a connection's sender. Group entries are removed by the caller
    /// as it leaves each room.
    pub fn unregister(&mut self, connection_id: &ConnectionId) {
        self.senders.remove(connection_id);
    }

    pub fn join_group(&mut self, room_id: &str, connection_id: ConnectionId) {
        self.groups
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id);
    }

    pub fn leave_group(&mut self, room_id: &str, connection_id: &ConnectionId) {
        if let Some(group) = self.groups.get_mut(room_id) {
            group.remove(connection_id);
            if group.is_empty() {
                self.groups.remove(room_id);
            }
        }
    }

    /// Drop a whole group, returning its former members.
    pub fn drop_group(&mut self, room_id: &str) -> HashSet<ConnectionId> {
        self.groups.remove(room_id).unwrap_or_default()
    }

    pub fn group_len(&self, room_id: &str) -> usize {
        self.groups.get(room_id).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    /// Send a message to one connection.
    pub fn send_to(&self, connection_id: &ConnectionId, msg: &ServerMessage) {
        let Some(sender) = self.senders.get(connection_id) else {
            return;
        };
        let Some(bytes) = encode(msg) else {
            return;
        };
        if let Err(e) = sender.try_send(bytes) {
            tracing::debug!(
                connection_id = %connection_id, error = %e,
                "Failed to send to connection (slow or disconnected)"
            );
        }
    }

    /// Send a message to every connection in a room's group. A missing group
    /// is a no-op.
    pub fn broadcast(&self, room_id: &str, msg: &ServerMessage) {
        let Some(group) = self.groups.get(room_id) else {
            return;
        };
        let Some(bytes) = encode(msg) else {
            return;
        };
        for connection_id in group {
            if let Some(sender) = self.senders.get(connection_id)
                && let Err(e) = sender.try_send(bytes.clone())
            {
                tracing::debug!(
                    connection_id = %connection_id, room_id, error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }
}

fn encode(msg: &ServerMessage) -> Option<Bytes> {
    match encode_server_message(msg) {
        Ok(data) => Some(Bytes::from(data)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server message");
            None
        },
    }
}
