use serde::{Deserialize, Serialize};

use super::messages::{
    AimMsg, ClientMessage, ErrorMsg, FindGameMsg, FiringMsg, JoinedMsg, KeyMsg, MessageType,
    NoticeMsg, PlayerCountMsg, ServerMessage,
};
use super::state::StatePayload;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
///
/// Payloads are MessagePack maps with field names so browser clients can
/// decode them without a schema.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes = rmp_serde::to_vec_named(payload)
        .map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::FindGame(m) => encode_message(MessageType::FindGame, m),
        ClientMessage::KeyDown(m) => encode_message(MessageType::KeyDown, m),
        ClientMessage::KeyUp(m) => encode_message(MessageType::KeyUp, m),
        ClientMessage::Aim(m) => encode_message(MessageType::Aim, m),
        ClientMessage::Firing(m) => encode_message(MessageType::Firing, m),
        ClientMessage::LeaveGame => encode_message(MessageType::LeaveGame, &()),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::Joined(m) => encode_message(MessageType::Joined, m),
        ServerMessage::WaitingForPlayer => encode_message(MessageType::WaitingForPlayer, &()),
        ServerMessage::GameStarting => encode_message(MessageType::GameStarting, &()),
        ServerMessage::PlayerCount(m) => encode_message(MessageType::PlayerCount, m),
        ServerMessage::OpponentLeft => encode_message(MessageType::OpponentLeft, &()),
        ServerMessage::GameState(m) => encode_message(MessageType::GameState, m.as_ref()),
        ServerMessage::Notice(m) => encode_message(MessageType::Notice, m),
        ServerMessage::Error(m) => encode_message(MessageType::Error, m),
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
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::FindGame => Ok(ClientMessage::FindGame(decode_payload::<FindGameMsg>(
            data,
        )?)),
        MessageType::KeyDown => Ok(ClientMessage::KeyDown(decode_payload::<KeyMsg>(data)?)),
        MessageType::KeyUp => Ok(ClientMessage::KeyUp(decode_payload::<KeyMsg>(data)?)),
        MessageType::Aim => Ok(ClientMessage::Aim(decode_payload::<AimMsg>(data)?)),
        MessageType::Firing => Ok(ClientMessage::Firing(decode_payload::<FiringMsg>(data)?)),
        MessageType::LeaveGame => Ok(ClientMessage::LeaveGame),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Joined => Ok(ServerMessage::Joined(decode_payload::<JoinedMsg>(data)?)),
        MessageType::WaitingForPlayer => Ok(ServerMessage::WaitingForPlayer),
        MessageType::GameStarting => Ok(ServerMessage::GameStarting),
        MessageType::PlayerCount => Ok(ServerMessage::PlayerCount(decode_payload::<
            PlayerCountMsg,
        >(data)?)),
        MessageType::OpponentLeft => Ok(ServerMessage::OpponentLeft),
        MessageType::GameState => Ok(ServerMessage::GameState(Box::new(decode_payload::<
            StatePayload,
        >(data)?))),
        MessageType::Notice => Ok(ServerMessage::Notice(decode_payload::<NoticeMsg>(data)?)),
        MessageType::Error => Ok(ServerMessage::Error(decode_payload::<ErrorMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
