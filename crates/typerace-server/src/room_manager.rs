use std::sync::Arc;

use typerace_core::net::messages::{
    AdminAssignedMsg, AdminRevokedMsg, CountdownMsg, CreateRoomMsg, ErrorMsg, JoinRoomMsg,
    MembersMsg, RoomCreatedMsg, RoomJoinedMsg, ServerMessage, StartTypingMsg, UpdateProgressMsg,
};
use typerace_core::participant::{ConnectionId, normalize_display_name};
use typerace_core::room::{Room, RoomSnapshot, is_valid_room_id};

use crate::broadcast::{BroadcastGateway, PlayerSender};
use crate::connections::ConnectionRegistry;
use crate::countdown::{CountdownSignal, CountdownTiming, spawn_countdown};
use crate::error::RoomError;
use crate::room_store::RoomStore;
use crate::state::SharedRoomManager;

/// Point-in-time counters for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
    pub connections: usize,
    pub rooms: usize,
    pub participants: usize,
}

/// Owns every room, every live connection and the fan-out groups.
///
/// All mutation goes through `&mut self`, so callers hold the write lock of
/// [`SharedRoomManager`] for the whole of one client action.
pub struct RoomManager {
    store: RoomStore,
    gateway: BroadcastGateway,
    registry: ConnectionRegistry,
    timing: CountdownTiming,
    next_run_id: u64,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(CountdownTiming::default())
    }
}

impl RoomManager {
    pub fn new(timing: CountdownTiming) -> Self {
        Self {
            store: RoomStore::new(),
            gateway: BroadcastGateway::new(),
            registry: ConnectionRegistry::new(),
            timing,
            next_run_id: 1,
        }
    }

    /// Register a freshly accepted connection and its outbound channel.
    pub fn connect(&mut self, connection_id: ConnectionId, sender: PlayerSender) {
        self.registry.connect(connection_id);
        self.gateway.register(connection_id, sender);
        tracing::info!(connection_id = %connection_id, "Connection registered");
    }

    /// Create (or overwrite) a room with the caller as its admin.
    pub fn create_room(
        &mut self,
        connection_id: ConnectionId,
        msg: CreateRoomMsg,
    ) -> Result<(), RoomError> {
        if !is_valid_room_id(&msg.room_id) {
            return Err(RoomError::InvalidRoomId);
        }
        let name = normalize_display_name(&msg.display_name).ok_or(RoomError::InvalidName)?;
        let room_id = msg.room_id;

        let room = Room::new(room_id.clone(), msg.room_name, connection_id, name);
        if let Some(previous) = self.store.insert(room) {
            let evicted = previous.room.connection_ids().copied().collect();
            self.evict_replaced(&room_id, connection_id, evicted);
            // `previous` drops here, cancelling its countdown.
        }

        self.gateway.join_group(&room_id, connection_id);
        self.registry.track(&connection_id, &room_id);

        let snapshot = self.snapshot(&room_id);
        if let Some(room) = snapshot {
            let members = room.members.clone();
            self.gateway.send_to(
                &connection_id,
                &ServerMessage::RoomCreated(RoomCreatedMsg {
                    connection_id,
                    room,
                }),
            );
            self.gateway.broadcast(
                &room_id,
                &ServerMessage::Leaderboard(MembersMsg {
                    room_id: room_id.clone(),
                    members,
                }),
            );
        }

        tracing::info!(room_id = %room_id, connection_id = %connection_id, "Room created");
        Ok(())
    }

    /// Detach the members of a room that was just overwritten.
    fn evict_replaced(
        &mut self,
        room_id: &str,
        creator: ConnectionId,
        evicted: Vec<ConnectionId>,
    ) {
        self.gateway.drop_group(room_id);
        let notice = ServerMessage::Error(ErrorMsg {
            message: format!("Room {room_id} was recreated"),
        });
        for member in &evicted {
            self.registry.untrack(member, room_id);
            if *member != creator {
                self.gateway.send_to(member, &notice);
            }
        }
        tracing::info!(room_id, evicted = evicted.len(), "Room overwritten");
    }

    /// Join an existing room as a player, or as admin when reclaiming the
    /// recorded admin name.
    pub fn join_room(
        &mut self,
        connection_id: ConnectionId,
        msg: JoinRoomMsg,
    ) -> Result<(), RoomError> {
        let name = normalize_display_name(&msg.display_name).ok_or(RoomError::InvalidName)?;
        let room_id = msg.room_id;

        let entry = self
            .store
            .get_mut(&room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.clone()))?;
        let admission = entry
            .room
            .admit(connection_id, name)
            .ok_or_else(|| RoomError::AlreadyMember(room_id.clone()))?;
        let snapshot = entry.room.snapshot();

        self.gateway.join_group(&room_id, connection_id);
        self.registry.track(&connection_id, &room_id);

        if let Some(demoted) = admission.demoted {
            tracing::info!(
                room_id = %room_id, connection_id = %connection_id, demoted = %demoted,
                "Admin role reclaimed"
            );
            self.gateway.send_to(
                &demoted,
                &ServerMessage::AdminRevoked(AdminRevokedMsg {
                    room_id: room_id.clone(),
                }),
            );
        }

        let members = snapshot.members.clone();
        self.gateway.send_to(
            &connection_id,
            &ServerMessage::RoomJoined(RoomJoinedMsg {
                connection_id,
                role: admission.role,
                room: snapshot,
            }),
        );
        self.gateway.broadcast(
            &room_id,
            &ServerMessage::PlayerJoined(MembersMsg {
                room_id: room_id.clone(),
                members,
            }),
        );

        tracing::info!(
            room_id = %room_id, connection_id = %connection_id, role = ?admission.role,
            "Player joined"
        );
        Ok(())
    }

    /// Overwrite the caller's progress and push a leaderboard. Updates for
    /// unknown rooms, non-members or non-finite numbers are dropped.
    pub fn update_progress(&mut self, connection_id: ConnectionId, msg: UpdateProgressMsg) {
        if !msg.wpm.is_finite() || !msg.accuracy.is_finite() {
            tracing::debug!(connection_id = %connection_id, "Dropping non-finite progress");
            return;
        }
        let Some(entry) = self.store.get_mut(&msg.room_id) else {
            return;
        };
        if !entry
            .room
            .record_progress(&connection_id, msg.typed_text, msg.wpm, msg.accuracy)
        {
            return;
        }
        let members = entry.room.members();
        self.gateway.broadcast(
            &msg.room_id,
            &ServerMessage::Leaderboard(MembersMsg {
                room_id: msg.room_id.clone(),
                members,
            }),
        );
    }

    /// Reset the room's progress and (re)start its countdown. Admin only.
    pub fn start_test(
        &mut self,
        connection_id: ConnectionId,
        room_id: &str,
        rooms: &SharedRoomManager,
    ) -> Result<(), RoomError> {
        let Some(entry) = self.store.get_mut(room_id) else {
            tracing::debug!(room_id, "Start requested for missing room");
            return Ok(());
        };
        if entry.room.admin_id() != connection_id {
            return Err(RoomError::Unauthorized(room_id.to_string()));
        }

        entry.room.reset_progress();
        let members = entry.room.members();
        self.gateway.broadcast(
            room_id,
            &ServerMessage::Leaderboard(MembersMsg {
                room_id: room_id.to_string(),
                members,
            }),
        );

        entry.cancel_countdown();
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        entry.countdown = Some(spawn_countdown(
            Arc::clone(rooms),
            room_id.to_string(),
            run_id,
            self.timing,
        ));
        Ok(())
    }

    /// Explicit leave. Ignored if the caller is not a member.
    pub fn leave_room(&mut self, connection_id: ConnectionId, room_id: &str) {
        if !self.remove_participant(room_id, connection_id) {
            tracing::debug!(room_id, connection_id = %connection_id, "Leave for non-member ignored");
        }
    }

    /// Remove a member from a room, handling admin succession and deletion
    /// of the room once empty. Returns false if it was not a member.
    pub fn remove_participant(&mut self, room_id: &str, connection_id: ConnectionId) -> bool {
        let Some(entry) = self.store.get_mut(room_id) else {
            return false;
        };
        let Some(departure) = entry.room.remove(&connection_id) else {
            return false;
        };
        let members = entry.room.members();

        self.gateway.leave_group(room_id, &connection_id);
        self.registry.untrack(&connection_id, room_id);
        tracing::info!(
            room_id, connection_id = %connection_id,
            name = %departure.participant.display_name, "Player left"
        );

        if departure.now_empty {
            self.store.remove(room_id);
            self.gateway.drop_group(room_id);
            tracing::info!(room_id, "Room closed (empty)");
            return true;
        }

        if let Some(promoted) = departure.promoted {
            self.gateway.send_to(
                &promoted,
                &ServerMessage::AdminAssigned(AdminAssignedMsg {
                    room_id: room_id.to_string(),
                }),
            );
            tracing::info!(room_id, promoted = %promoted, "Admin role passed on");
        }

        self.gateway.broadcast(
            room_id,
            &ServerMessage::Leaderboard(MembersMsg {
                room_id: room_id.to_string(),
                members,
            }),
        );
        true
    }

    /// Tear down a closed connection: leave every room it was in, then drop
    /// its outbound channel.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        let rooms = self.registry.disconnect(&connection_id);
        for room_id in &rooms {
            self.remove_participant(room_id, connection_id);
        }
        self.gateway.unregister(&connection_id);
        tracing::info!(connection_id = %connection_id, rooms = rooms.len(), "Connection closed");
    }

    pub fn send_error(&self, connection_id: &ConnectionId, error: &RoomError) {
        self.gateway.send_to(connection_id, &error.to_message());
    }

    pub fn snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        self.store.get(room_id).map(|e| e.room.snapshot())
    }

    pub fn room_exists(&self, room_id: &str) -> bool {
        self.store.contains(room_id)
    }

    pub fn stats(&self) -> ManagerStats {
        let (rooms, participants) = self.store.stats();
        ManagerStats {
            connections: self.registry.len(),
            rooms,
            participants,
        }
    }

    // ---- countdown re-entry -------------------------------------------------

    /// Whether `run_id` is still the live countdown of `room_id`.
    pub fn countdown_is_current(&self, room_id: &str, run_id: u64) -> bool {
        self.store
            .get(room_id)
            .and_then(|e| e.countdown.as_ref())
            .is_some_and(|h| h.run_id() == run_id && !h.is_cancelled())
    }

    pub fn emit_countdown_signal(&self, room_id: &str, signal: CountdownSignal) {
        let msg = match signal {
            CountdownSignal::Count(remaining) => ServerMessage::Countdown(CountdownMsg {
                room_id: room_id.to_string(),
                remaining,
            }),
            CountdownSignal::StartTyping => ServerMessage::StartTyping(StartTypingMsg {
                room_id: room_id.to_string(),
            }),
        };
        self.gateway.broadcast(room_id, &msg);
    }

    pub fn emit_final_results(&self, room_id: &str) {
        if let Some(entry) = self.store.get(room_id) {
            self.gateway.broadcast(
                room_id,
                &ServerMessage::FinalResults(MembersMsg {
                    room_id: room_id.to_string(),
                    members: entry.room.members(),
                }),
            );
        }
    }

    /// Clear the room's countdown handle if `run_id` is still the current one.
    pub fn finish_countdown(&mut self, room_id: &str, run_id: u64) {
        if let Some(entry) = self.store.get_mut(room_id)
            && entry.countdown.as_ref().is_some_and(|h| h.run_id() == run_id)
        {
            entry.countdown = None;
        }
    }
}
