//! Shape of the state stream sent to clients.
//!
//! A [`StatePayload`] without a `frameNumber` is a full snapshot: the receiver
//! discards everything it knows and replaces it. A payload carrying a frame
//! number is a delta: listed entities are upserted, and removals are explicit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{Color, EntityId, GameMode, PlayerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponSnapshot {
    pub name: String,
    pub ammo: u32,
    pub max_ammo: u32,
    pub is_reloading: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilitySnapshot {
    pub name: String,
    /// Rounded to 2 decimal places.
    pub current_cooldown: f32,
    pub cooldown: f32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    /// Position rounded to 2 decimal places.
    pub x: f32,
    pub y: f32,
    /// Facing angle rounded to 3 decimal places.
    pub angle: f32,
    /// Current health rounded to a whole number.
    pub hp: i32,
    pub max_hp: f32,
    pub radius: f32,
    pub kills: u32,
    pub flashing_timer: f32,
    pub enlarged: bool,
    pub berserked: bool,
    pub dashing: bool,
    pub primary_weapon: WeaponSnapshot,
    #[serde(default)]
    pub secondary_weapon: Option<String>,
    #[serde(default)]
    pub special_ability: Option<AbilitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
    pub player_id: PlayerId,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub color: Color,
    /// Present only for rotated obstacles; `(x, y)` is then the center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    /// Present only for destructible obstacles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
}

/// Marker for a character that left the room since the last transmitted frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedPlayer {
    pub id: PlayerId,
    pub removed: bool,
}

/// One entry in a payload's player list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerEntry {
    Removed(RemovedPlayer),
    Present(Box<PlayerSnapshot>),
}

impl PlayerEntry {
    pub fn removed(id: PlayerId) -> Self {
        Self::Removed(RemovedPlayer { id, removed: true })
    }

    pub fn id(&self) -> PlayerId {
        match self {
            Self::Removed(r) => r.id,
            Self::Present(p) => p.id,
        }
    }
}

/// A full or delta state frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<u64>,
    pub game_mode: GameMode,
    #[serde(default)]
    pub players: Vec<PlayerEntry>,
    #[serde(default)]
    pub bullets: Vec<BulletSnapshot>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSnapshot>,
    #[serde(default)]
    pub removed_bullets: Vec<EntityId>,
    #[serde(default)]
    pub removed_obstacles: Vec<EntityId>,
}

impl StatePayload {
    pub fn is_full(&self) -> bool {
        self.frame_number.is_none()
    }
}

/// Client-side mirror of a room, rebuilt from the state stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientReplica {
    pub game_mode: GameMode,
    pub last_frame: Option<u64>,
    pub players: BTreeMap<PlayerId, PlayerSnapshot>,
    pub bullets: BTreeMap<EntityId, BulletSnapshot>,
    pub obstacles: BTreeMap<EntityId, ObstacleSnapshot>,
}

impl ClientReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, payload: &StatePayload) {
        if payload.is_full() {
            self.players.clear();
            self.bullets.clear();
            self.obstacles.clear();
        }
        self.game_mode = payload.game_mode;
        self.last_frame = payload.frame_number;

        for entry in &payload.players {
            match entry {
                PlayerEntry::Removed(r) => {
                    self.players.remove(&r.id);
                },
                PlayerEntry::Present(p) => {
                    self.players.insert(p.id, (**p).clone());
                },
            }
        }
        for b in &payload.bullets {
            self.bullets.insert(b.id, b.clone());
        }
        for o in &payload.obstacles {
            self.obstacles.insert(o.id, o.clone());
        }
        for id in &payload.removed_bullets {
            self.bullets.remove(id);
        }
        for id in &payload.removed_obstacles {
            self.obstacles.remove(id);
        }
    }
}
