use typerace_core::net::messages::{ErrorMsg, ServerMessage};

/// Rejected client action. Reported to the initiating connection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    RoomNotFound(String),
    AlreadyMember(String),
    /// Non-admin attempted an admin-only action in the named room.
    Unauthorized(String),
    InvalidName,
    InvalidRoomId,
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound(id) => write!(f, "Room {id} not found"),
            Self::AlreadyMember(id) => write!(f, "Already a member of room {id}"),
            Self::Unauthorized(id) => write!(f, "Only the admin of room {id} can do that"),
            Self::InvalidName => write!(f, "Invalid display name"),
            Self::InvalidRoomId => write!(f, "Invalid room id"),
        }
    }
}

impl std::error::Error for RoomError {}

impl RoomError {
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error(ErrorMsg {
            message: self.to_string(),
        })
    }
}
