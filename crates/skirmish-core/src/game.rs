use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a connected player (and the character they control).
pub type PlayerId = u64;

/// Unique identifier for a bullet or obstacle within one room.
pub type EntityId = u64;

/// Which ruleset a room runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    /// Two players; any kill resets the whole room.
    #[default]
    Duel,
    /// Shared open room; only the victim respawns.
    FreeForAll,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duel => write!(f, "duel"),
            Self::FreeForAll => write!(f, "free-for-all"),
        }
    }
}

/// An opaque RGB color carried to clients for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The color on the opposite side of the RGB cube.
    pub const fn complement(self) -> Self {
        Self::rgb(255 - self.r, 255 - self.g, 255 - self.b)
    }
}

/// Feedback the simulation addresses to a single character's owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Notification {
    Fired,
    Reload,
    Hit,
    GotHit,
    #[serde(rename_all = "camelCase")]
    Kill {
        victim_name: String,
        kills: u32,
    },
    AbilityUsed,
}

/// Browser key codes understood by the simulation.
///
/// Both the upper-case and lower-case codes are accepted for letter keys.
pub mod keys {
    pub const UP: [u32; 2] = [87, 119];
    pub const DOWN: [u32; 2] = [83, 115];
    pub const LEFT: [u32; 2] = [65, 97];
    pub const RIGHT: [u32; 2] = [68, 100];
    pub const RELOAD: [u32; 2] = [82, 114];
    pub const ABILITY: [u32; 2] = [69, 101];
    pub const SWAP_WEAPON: [u32; 2] = [81, 113];
}
