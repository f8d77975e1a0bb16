use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::participant::{ConnectionId, Participant, Role};

/// Maximum room id length in bytes.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Room ids are caller-chosen; they only need to be non-empty, bounded and
/// printable.
pub fn is_valid_room_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ROOM_ID_LEN && !id.chars().any(|c| c.is_control())
}

/// Full view of a room as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub room_name: Option<String>,
    pub admin_id: ConnectionId,
    /// Members in join order.
    pub members: Vec<Participant>,
}

/// Outcome of admitting a new member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub role: Role,
    /// Previous admin connection, if the newcomer reclaimed the admin role.
    pub demoted: Option<ConnectionId>,
}

/// Outcome of removing a member.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub participant: Participant,
    /// Member promoted to admin because the admin left.
    pub promoted: Option<ConnectionId>,
    /// The room has no members left and must be dropped.
    pub now_empty: bool,
}

/// Membership and progress state of one race room.
///
/// Exactly one member holds [`Role::Admin`] whenever the room is non-empty,
/// and `admin_id` always names that member.
#[derive(Debug, Clone)]
pub struct Room {
    id: String,
    name: Option<String>,
    admin_id: ConnectionId,
    /// Display name the admin role is recorded under, used for reclaim.
    admin_name: String,
    members: HashMap<ConnectionId, Participant>,
    next_join_order: u64,
}

impl Room {
    /// Create a room whose only member is its admin.
    pub fn new(
        id: String,
        name: Option<String>,
        creator: ConnectionId,
        creator_name: String,
    ) -> Self {
        let admin = Participant::new(creator, creator_name.clone(), Role::Admin, 0);
        let mut members = HashMap::new();
        members.insert(creator, admin);
        Self {
            id,
            name,
            admin_id: creator,
            admin_name: creator_name,
            members,
            next_join_order: 1,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn admin_id(&self) -> ConnectionId {
        self.admin_id
    }

    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains_key(connection_id)
    }

    pub fn participant(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.members.get(connection_id)
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = &ConnectionId> {
        self.members.keys()
    }

    /// Add a member. A newcomer whose display name matches the recorded
    /// admin name takes over the admin role and the previous admin becomes
    /// a player. Returns `None` if the connection is already a member.
    pub fn admit(&mut self, connection_id: ConnectionId, display_name: String) -> Option<Admission> {
        if self.members.contains_key(&connection_id) {
            return None;
        }

        let join_order = self.next_join_order;
        self.next_join_order += 1;

        let reclaim = display_name == self.admin_name;
        let mut demoted = None;
        if reclaim {
            if let Some(previous) = self.members.get_mut(&self.admin_id) {
                previous.role = Role::Player;
                demoted = Some(previous.connection_id);
            }
            self.admin_id = connection_id;
        }

        let role = if reclaim { Role::Admin } else { Role::Player };
        self.members.insert(
            connection_id,
            Participant::new(connection_id, display_name, role, join_order),
        );
        Some(Admission { role, demoted })
    }

    /// Overwrite a member's progress. Returns false if it is not a member.
    pub fn record_progress(
        &mut self,
        connection_id: &ConnectionId,
        typed_text: String,
        wpm: f64,
        accuracy: f64,
    ) -> bool {
        match self.members.get_mut(connection_id) {
            Some(participant) => {
                participant.record_progress(typed_text, wpm, accuracy);
                true
            },
            None => false,
        }
    }

    /// Reset every member's progress ahead of a new test.
    pub fn reset_progress(&mut self) {
        for participant in self.members.values_mut() {
            participant.reset_progress();
        }
    }

    /// Remove a member, promoting the earliest remaining joiner if the admin
    /// left. Returns `None` if the connection is not a member.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Departure> {
        let participant = self.members.remove(connection_id)?;

        let mut promoted = None;
        if participant.is_admin()
            && let Some(successor) = self.members.values_mut().min_by_key(|p| p.join_order)
        {
            successor.role = Role::Admin;
            self.admin_id = successor.connection_id;
            self.admin_name = successor.display_name.clone();
            promoted = Some(successor.connection_id);
        }

        Some(Departure {
            participant,
            promoted,
            now_empty: self.members.is_empty(),
        })
    }

    /// Members cloned in join order.
    pub fn members(&self) -> Vec<Participant> {
        let mut members: Vec<Participant> = self.members.values().cloned().collect();
        members.sort_by_key(|p| p.join_order);
        members
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            room_name: self.name.clone(),
            admin_id: self.admin_id,
            members: self.members(),
        }
    }

    /// Number of members currently holding the admin role.
    pub fn admin_count(&self) -> usize {
        self.members.values().filter(|p| p.is_admin()).count()
    }
}
