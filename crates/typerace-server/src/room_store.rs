use std::collections::HashMap;

use typerace_core::room::Room;

use crate::countdown::CountdownHandle;

/// A stored room plus the countdown task it owns, if any.
pub struct RoomEntry {
    pub room: Room,
    pub countdown: Option<CountdownHandle>,
}

impl RoomEntry {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            countdown: None,
        }
    }

    /// Cancel the running countdown, if any.
    pub fn cancel_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.cancel();
        }
    }
}

impl Drop for RoomEntry {
    fn drop(&mut self) {
        self.cancel_countdown();
    }
}

/// In-memory room table keyed by room id.
#[derive(Default)]
pub struct RoomStore {
    rooms: HashMap<String, RoomEntry>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a room, returning the entry it replaced.
    pub fn insert(&mut self, room: Room) -> Option<RoomEntry> {
        self.rooms.insert(room.id().to_string(), RoomEntry::new(room))
    }

    pub fn get(&self, room_id: &str) -> Option<&RoomEntry> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut RoomEntry> {
        self.rooms.get_mut(room_id)
    }

    /// Remove a room. Dropping the entry cancels its countdown.
    pub fn remove(&mut self, room_id: &str) -> Option<RoomEntry> {
        self.rooms.remove(room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// (active rooms, total participants)
    pub fn stats(&self) -> (usize, usize) {
        let participants = self.rooms.values().map(|e| e.room.len()).sum();
        (self.rooms.len(), participants)
    }
}
