use serde::{Deserialize, Serialize};

use crate::participant::{ConnectionId, Participant, Role};
use crate::room::RoomSnapshot;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateRoom = 0x01,
    JoinRoom = 0x02,
    UpdateProgress = 0x03,
    StartTest = 0x04,
    LeaveRoom = 0x05,

    // Server -> Client
    RoomCreated = 0x10,
    RoomJoined = 0x11,
    PlayerJoined = 0x12,
    Leaderboard = 0x13,
    Error = 0x14,
    AdminAssigned = 0x15,
    Countdown = 0x16,
    StartTyping = 0x17,
    FinalResults = 0x18,
    AdminRevoked = 0x19,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::CreateRoom),
            0x02 => Some(Self::JoinRoom),
            0x03 => Some(Self::UpdateProgress),
            0x04 => Some(Self::StartTest),
            0x05 => Some(Self::LeaveRoom),
            0x10 => Some(Self::RoomCreated),
            0x11 => Some(Self::RoomJoined),
            0x12 => Some(Self::PlayerJoined),
            0x13 => Some(Self::Leaderboard),
            0x14 => Some(Self::Error),
            0x15 => Some(Self::AdminAssigned),
            0x16 => Some(Self::Countdown),
            0x17 => Some(Self::StartTyping),
            0x18 => Some(Self::FinalResults),
            0x19 => Some(Self::AdminRevoked),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoomMsg {
    pub room_id: String,
    pub display_name: String,
    #[serde(default)]
    pub room_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProgressMsg {
    pub room_id: String,
    pub typed_text: String,
    pub wpm: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTestMsg {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {
    pub room_id: String,
}

/// Every action a client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    CreateRoom(CreateRoomMsg),
    JoinRoom(JoinRoomMsg),
    UpdateProgress(UpdateProgressMsg),
    StartTest(StartTestMsg),
    LeaveRoom(LeaveRoomMsg),
}

impl ClientMessage {
    /// Room the action targets.
    pub fn room_id(&self) -> &str {
        match self {
            Self::CreateRoom(m) => &m.room_id,
            Self::JoinRoom(m) => &m.room_id,
            Self::UpdateProgress(m) => &m.room_id,
            Self::StartTest(m) => &m.room_id,
            Self::LeaveRoom(m) => &m.room_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client payloads
// ---------------------------------------------------------------------------

/// Acknowledgment sent to the creator of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCreatedMsg {
    /// The recipient's own connection id.
    pub connection_id: ConnectionId,
    pub room: RoomSnapshot,
}

/// Acknowledgment sent to a joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomJoinedMsg {
    pub connection_id: ConnectionId,
    pub role: Role,
    pub room: RoomSnapshot,
}

/// Membership of a room, in join order, with progress fields.
/// Used by PlayerJoined, Leaderboard and FinalResults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembersMsg {
    pub room_id: String,
    pub members: Vec<Participant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAssignedMsg {
    pub room_id: String,
}

/// Sent to a connection whose admin role was reclaimed by a later join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRevokedMsg {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownMsg {
    pub room_id: String,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTypingMsg {
    pub room_id: String,
}

/// Every event the server can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    RoomCreated(RoomCreatedMsg),
    RoomJoined(RoomJoinedMsg),
    PlayerJoined(MembersMsg),
    Leaderboard(MembersMsg),
    Error(ErrorMsg),
    AdminAssigned(AdminAssignedMsg),
    Countdown(CountdownMsg),
    StartTyping(StartTypingMsg),
    FinalResults(MembersMsg),
    AdminRevoked(AdminRevokedMsg),
}
