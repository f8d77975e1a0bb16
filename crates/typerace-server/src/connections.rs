use std::collections::{HashMap, HashSet};

use typerace_core::participant::ConnectionId;

/// Live connections and the rooms each one belongs to.
///
/// The reverse index keeps disconnect handling proportional to the
/// connection's own memberships rather than the number of rooms.
#[derive(Default)]
pub struct ConnectionRegistry {
    memberships: HashMap<ConnectionId, HashSet<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, connection_id: ConnectionId) {
        self.memberships.entry(connection_id).or_default();
    }

    pub fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.memberships.contains_key(connection_id)
    }

    /// Record that a connection joined a room. Unknown connections are
    /// ignored so a late action cannot resurrect a closed connection.
    pub fn track(&mut self, connection_id: &ConnectionId, room_id: &str) {
        if let Some(rooms) = self.memberships.get_mut(connection_id) {
            rooms.insert(room_id.to_string());
        }
    }

    pub fn untrack(&mut self, connection_id: &ConnectionId, room_id: &str) {
        if let Some(rooms) = self.memberships.get_mut(connection_id) {
            rooms.remove(room_id);
        }
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<String> {
        self.memberships
            .get(connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget a connection, returning the rooms it was still in.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Vec<String> {
        self.memberships
            .remove(connection_id)
            .map(|rooms| rooms.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }
}
