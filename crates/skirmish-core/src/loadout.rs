use serde::{Deserialize, Serialize};

/// Character presets a player can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchetypeKind {
    /// Fast, fragile, hits hard.
    Ninja,
    /// Slow and tanky.
    King,
    /// Medium all-rounder.
    #[default]
    Berserker,
}

impl ArchetypeKind {
    pub const ALL: [Self; 3] = [Self::Ninja, Self::King, Self::Berserker];

    /// Parse a client-supplied selector. Unknown or missing values fall back to the default.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("ninja") => Self::Ninja,
            Some("king") => Self::King,
            Some("berserker") => Self::Berserker,
            _ => Self::default(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ninja => "Ninja",
            Self::King => "King",
            Self::Berserker => "Berserker",
        }
    }

    /// Ability granted when the loadout does not name one.
    pub fn default_ability(self) -> AbilityKind {
        match self {
            Self::Ninja => AbilityKind::Dash,
            Self::King => AbilityKind::Enlarge,
            Self::Berserker => AbilityKind::Berserk,
        }
    }
}

/// Weapon presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    #[default]
    M4,
    Shotgun,
    Pistol,
    Sniper,
}

impl WeaponKind {
    pub const ALL: [Self; 4] = [Self::M4, Self::Shotgun, Self::Pistol, Self::Sniper];

    pub fn from_selector(selector: Option<&str>) -> Self {
        Self::parse(selector).unwrap_or_default()
    }

    /// Parse a selector without falling back; used for the optional secondary slot.
    pub fn parse(selector: Option<&str>) -> Option<Self> {
        match selector.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("m4") => Some(Self::M4),
            Some("shotgun") => Some(Self::Shotgun),
            Some("pistol") => Some(Self::Pistol),
            Some("sniper") => Some(Self::Sniper),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::M4 => "M4",
            Self::Shotgun => "Shotgun",
            Self::Pistol => "Pistol",
            Self::Sniper => "Sniper",
        }
    }
}

/// Special ability presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityKind {
    Dash,
    Enlarge,
    Berserk,
    Shield,
}

impl AbilityKind {
    pub const ALL: [Self; 4] = [Self::Dash, Self::Enlarge, Self::Berserk, Self::Shield];

    pub fn parse(selector: Option<&str>) -> Option<Self> {
        match selector.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("dash") => Some(Self::Dash),
            Some("enlarge") => Some(Self::Enlarge),
            Some("berserk") => Some(Self::Berserk),
            Some("shield") => Some(Self::Shield),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Dash => "Dash",
            Self::Enlarge => "Enlarge",
            Self::Berserk => "Berserk",
            Self::Shield => "Shield",
        }
    }
}

/// Raw loadout selectors as sent by a client.
///
/// Kept as strings so unknown values can be resolved to defaults instead of
/// failing the whole message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Loadout {
    pub archetype: Option<String>,
    pub weapon: Option<String>,
    pub secondary: Option<String>,
    pub ability: Option<String>,
}

/// A loadout with every selector resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLoadout {
    pub archetype: ArchetypeKind,
    pub weapon: WeaponKind,
    pub secondary: Option<WeaponKind>,
    pub ability: AbilityKind,
}

impl Loadout {
    pub fn new(archetype: &str, weapon: &str) -> Self {
        Self {
            archetype: Some(archetype.to_string()),
            weapon: Some(weapon.to_string()),
            ..Self::default()
        }
    }

    pub fn resolve(&self) -> ResolvedLoadout {
        let archetype = ArchetypeKind::from_selector(self.archetype.as_deref());
        let weapon = WeaponKind::from_selector(self.weapon.as_deref());
        let secondary = WeaponKind::parse(self.secondary.as_deref());
        let ability =
            AbilityKind::parse(self.ability.as_deref()).unwrap_or(archetype.default_ability());
        ResolvedLoadout {
            archetype,
            weapon,
            secondary,
            ability,
        }
    }
}
