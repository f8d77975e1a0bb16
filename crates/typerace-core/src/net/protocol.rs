use serde::{Deserialize, Serialize};

use super::messages::{
    AdminAssignedMsg, AdminRevokedMsg, ClientMessage, CountdownMsg, CreateRoomMsg, ErrorMsg,
    JoinRoomMsg, LeaveRoomMsg, MembersMsg, MessageType, RoomCreatedMsg, RoomJoinedMsg,
    ServerMessage, StartTestMsg, StartTypingMsg, UpdateProgressMsg,
};

/// Maximum size in bytes of a client frame.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Maximum size in bytes of a server frame. Leaderboards carry every
/// member's transcript, so this is sized for a full room at the
/// per-participant text cap rather than for a single client action.
pub const MAX_SERVER_MESSAGE_SIZE: usize = 4 * 1024 * 1024; // 4 MiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge { size: usize, max: usize },
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge { size, max } => {
                write!(f, "payload too large: {size} bytes (max {max})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix, rejecting
/// anything larger than `max_size`.
/// Payloads are MessagePack maps so fields can be added without breaking
/// older clients.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
    max_size: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes = rmp_serde::to_vec_named(payload)
        .map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > max_size {
        return Err(ProtocolError::PayloadTooLarge {
            size: total,
            max: max_size,
        });
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

fn encode_client<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    encode_message(msg_type, payload, MAX_MESSAGE_SIZE)
}

fn encode_server<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    encode_message(msg_type, payload, MAX_SERVER_MESSAGE_SIZE)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::CreateRoom(m) => encode_client(MessageType::CreateRoom, m),
        ClientMessage::JoinRoom(m) => encode_client(MessageType::JoinRoom, m),
        ClientMessage::UpdateProgress(m) => encode_client(MessageType::UpdateProgress, m),
        ClientMessage::StartTest(m) => encode_client(MessageType::StartTest, m),
        ClientMessage::LeaveRoom(m) => encode_client(MessageType::LeaveRoom, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::RoomCreated(m) => encode_server(MessageType::RoomCreated, m),
        ServerMessage::RoomJoined(m) => encode_server(MessageType::RoomJoined, m),
        ServerMessage::PlayerJoined(m) => encode_server(MessageType::PlayerJoined, m),
        ServerMessage::Leaderboard(m) => encode_server(MessageType::Leaderboard, m),
        ServerMessage::Error(m) => encode_server(MessageType::Error, m),
        ServerMessage::AdminAssigned(m) => encode_server(MessageType::AdminAssigned, m),
        ServerMessage::Countdown(m) => encode_server(MessageType::Countdown, m),
        ServerMessage::StartTyping(m) => encode_server(MessageType::StartTyping, m),
        ServerMessage::FinalResults(m) => encode_server(MessageType::FinalResults, m),
        ServerMessage::AdminRevoked(m) => encode_server(MessageType::AdminRevoked, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::CreateRoom => Ok(ClientMessage::CreateRoom(decode_payload::<
            CreateRoomMsg,
        >(data)?)),
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::UpdateProgress => Ok(ClientMessage::UpdateProgress(decode_payload::<
            UpdateProgressMsg,
        >(data)?)),
        MessageType::StartTest => Ok(ClientMessage::StartTest(decode_payload::<StartTestMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<LeaveRoomMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::RoomCreated => Ok(ServerMessage::RoomCreated(decode_payload::<
            RoomCreatedMsg,
        >(data)?)),
        MessageType::RoomJoined => Ok(ServerMessage::RoomJoined(decode_payload::<
            RoomJoinedMsg,
        >(data)?)),
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(decode_payload::<
            MembersMsg,
        >(data)?)),
        MessageType::Leaderboard => Ok(ServerMessage::Leaderboard(decode_payload::<
            MembersMsg,
        >(data)?)),
        MessageType::Error => Ok(ServerMessage::Error(decode_payload::<ErrorMsg>(data)?)),
        MessageType::AdminAssigned => Ok(ServerMessage::AdminAssigned(decode_payload::<
            AdminAssignedMsg,
        >(data)?)),
        MessageType::Countdown => Ok(ServerMessage::Countdown(decode_payload::<CountdownMsg>(
            data,
        )?)),
        MessageType::StartTyping => Ok(ServerMessage::StartTyping(decode_payload::<
            StartTypingMsg,
        >(data)?)),
        MessageType::FinalResults => Ok(ServerMessage::FinalResults(decode_payload::<
            MembersMsg,
        >(data)?)),
        MessageType::AdminRevoked => Ok(ServerMessage::AdminRevoked(decode_payload::<
            AdminRevokedMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
