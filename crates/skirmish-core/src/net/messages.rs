use serde::{Deserialize, Serialize};

use crate::game::{GameMode, Notification, PlayerId};
use crate::loadout::Loadout;
use crate::net::state::StatePayload;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    FindGame = 0x01,
    KeyDown = 0x02,
    KeyUp = 0x03,
    Aim = 0x04,
    Firing = 0x05,
    LeaveGame = 0x06,

    // Server -> Client
    Joined = 0x10,
    WaitingForPlayer = 0x11,
    GameStarting = 0x12,
    PlayerCount = 0x13,
    OpponentLeft = 0x14,
    GameState = 0x15,
    Notice = 0x16,
    Error = 0x17,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::FindGame),
            0x02 => Some(Self::KeyDown),
            0x03 => Some(Self::KeyUp),
            0x04 => Some(Self::Aim),
            0x05 => Some(Self::Firing),
            0x06 => Some(Self::LeaveGame),
            0x10 => Some(Self::Joined),
            0x11 => Some(Self::WaitingForPlayer),
            0x12 => Some(Self::GameStarting),
            0x13 => Some(Self::PlayerCount),
            0x14 => Some(Self::OpponentLeft),
            0x15 => Some(Self::GameState),
            0x16 => Some(Self::Notice),
            0x17 => Some(Self::Error),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Ask to be placed into a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindGameMsg {
    pub mode: GameMode,
    pub name: Option<String>,
    pub loadout: Loadout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMsg {
    pub code: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimMsg {
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringMsg {
    pub firing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    FindGame(FindGameMsg),
    KeyDown(KeyMsg),
    KeyUp(KeyMsg),
    Aim(AimMsg),
    Firing(FiringMsg),
    LeaveGame,
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Sent once to a player after they are placed into a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedMsg {
    pub player_id: PlayerId,
    pub room: String,
    pub mode: GameMode,
    /// 1-based seat in the room; in a duel this picks the spawn side.
    pub slot: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCountMsg {
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeMsg {
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Joined(JoinedMsg),
    WaitingForPlayer,
    GameStarting,
    PlayerCount(PlayerCountMsg),
    OpponentLeft,
    GameState(Box<StatePayload>),
    Notice(NoticeMsg),
    Error(ErrorMsg),
}
