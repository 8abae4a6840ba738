//! Per-room delta state cache.
//!
//! Each tick the world is serialized into a rounded [`Snapshot`] and compared
//! with the last snapshot that was actually handed out. Only entities whose
//! rounded fields changed are sent; bullets and obstacles that disappeared
//! are listed by id, and departed players are sent as `removed` markers.

use std::collections::{HashMap, HashSet};

use skirmish_core::game::{EntityId, GameMode, PlayerId};
use skirmish_core::loadout::AbilityKind;
use skirmish_core::net::state::{
    AbilitySnapshot, BulletSnapshot, ObstacleSnapshot, PlayerEntry, PlayerSnapshot, StatePayload,
    WeaponSnapshot,
};

use crate::character::Character;
use crate::geometry::round_to;
use crate::world::World;

const POSITION_DECIMALS: i32 = 2;
const ANGLE_DECIMALS: i32 = 3;
const TIMER_DECIMALS: i32 = 2;

/// Rounded, wire-ready view of a world at one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub game_mode: GameMode,
    pub players: Vec<PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub obstacles: Vec<ObstacleSnapshot>,
}

impl Snapshot {
    /// The snapshot as a full-state payload (no frame number).
    pub fn to_full_payload(&self) -> StatePayload {
        StatePayload {
            frame_number: None,
            game_mode: self.game_mode,
            players: self
                .players
                .iter()
                .map(|p| PlayerEntry::Present(Box::new(p.clone())))
                .collect(),
            bullets: self.bullets.clone(),
            obstacles: self.obstacles.clone(),
            removed_bullets: Vec::new(),
            removed_obstacles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateCache {
    previous: Option<Snapshot>,
    frame_number: u64,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames serialized since construction or the last reset.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// The last snapshot that was handed out by [`StateCache::update`].
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Round the world into a snapshot and advance the frame counter.
    pub fn serialize(&mut self, world: &World) -> Snapshot {
        self.frame_number += 1;
        Snapshot {
            game_mode: world.mode,
            players: world.characters.iter().map(player_snapshot).collect(),
            bullets: world
                .bullets
                .iter()
                .map(|b| BulletSnapshot {
                    id: b.id,
                    x: round_to(b.pos.x, POSITION_DECIMALS),
                    y: round_to(b.pos.y, POSITION_DECIMALS),
                    radius: b.radius,
                    color: b.color,
                    player_id: b.owner,
                    active: b.active,
                })
                .collect(),
            obstacles: world
                .obstacles
                .iter()
                .map(|o| ObstacleSnapshot {
                    id: o.id,
                    x: round_to(o.x, POSITION_DECIMALS),
                    y: round_to(o.y, POSITION_DECIMALS),
                    w: round_to(o.w, POSITION_DECIMALS),
                    h: round_to(o.h, POSITION_DECIMALS),
                    color: o.color,
                    angle: o.angle().map(|a| round_to(a, ANGLE_DECIMALS)),
                    health: o.health(),
                })
                .collect(),
        }
    }

    /// Compute what a client holding `previous` needs to reach `current`.
    ///
    /// Without a previous snapshot the result is a full payload. Otherwise it
    /// is a delta stamped with `frame_number`, or `None` if nothing changed.
    pub fn diff(
        current: &Snapshot,
        previous: Option<&Snapshot>,
        frame_number: u64,
    ) -> Option<StatePayload> {
        let Some(previous) = previous else {
            return Some(current.to_full_payload());
        };

        let prev_players: HashMap<PlayerId, &PlayerSnapshot> =
            previous.players.iter().map(|p| (p.id, p)).collect();
        let mut players: Vec<PlayerEntry> = current
            .players
            .iter()
            .filter(|p| prev_players.get(&p.id).is_none_or(|old| *old != *p))
            .map(|p| PlayerEntry::Present(Box::new(p.clone())))
            .collect();
        let current_players: HashSet<PlayerId> = current.players.iter().map(|p| p.id).collect();
        players.extend(
            previous
                .players
                .iter()
                .filter(|p| !current_players.contains(&p.id))
                .map(|p| PlayerEntry::removed(p.id)),
        );

        let (bullets, removed_bullets) =
            diff_by_id(&current.bullets, &previous.bullets, |b| b.id);
        let (obstacles, removed_obstacles) =
            diff_by_id(&current.obstacles, &previous.obstacles, |o| o.id);

        if players.is_empty()
            && bullets.is_empty()
            && obstacles.is_empty()
            && removed_bullets.is_empty()
            && removed_obstacles.is_empty()
        {
            return None;
        }

        Some(StatePayload {
            frame_number: Some(frame_number),
            game_mode: current.game_mode,
            players,
            bullets,
            obstacles,
            removed_bullets,
            removed_obstacles,
        })
    }

    /// Serialize and diff the world. A returned payload becomes the new
    /// baseline; `None` leaves the baseline untouched.
    pub fn update(&mut self, world: &World) -> Option<StatePayload> {
        let current = self.serialize(world);
        let payload = Self::diff(&current, self.previous.as_ref(), self.frame_number);
        if payload.is_some() {
            self.previous = Some(current);
        }
        payload
    }

    /// Forget the baseline so the next update is a full snapshot.
    pub fn reset(&mut self) {
        self.previous = None;
        self.frame_number = 0;
    }
}

/// Entities that are new or changed, and ids that disappeared.
fn diff_by_id<T: Clone + PartialEq>(
    current: &[T],
    previous: &[T],
    id: impl Fn(&T) -> EntityId,
) -> (Vec<T>, Vec<EntityId>) {
    let prev: HashMap<EntityId, &T> = previous.iter().map(|e| (id(e), e)).collect();
    let changed = current
        .iter()
        .filter(|e| prev.get(&id(e)).is_none_or(|old| *old != *e))
        .cloned()
        .collect();
    let live: HashSet<EntityId> = current.iter().map(&id).collect();
    let removed = previous
        .iter()
        .map(&id)
        .filter(|i| !live.contains(i))
        .collect();
    (changed, removed)
}

fn player_snapshot(c: &Character) -> PlayerSnapshot {
    PlayerSnapshot {
        id: c.id,
        name: c.name.clone(),
        x: round_to(c.body.pos.x, POSITION_DECIMALS),
        y: round_to(c.body.pos.y, POSITION_DECIMALS),
        angle: round_to(c.body.angle, ANGLE_DECIMALS),
        hp: c.body.hp.round() as i32,
        max_hp: round_to(c.body.max_hp, POSITION_DECIMALS),
        radius: round_to(c.body.radius, POSITION_DECIMALS),
        kills: c.kills,
        flashing_timer: round_to(c.flashing_timer, TIMER_DECIMALS),
        enlarged: c.ability_active(AbilityKind::Enlarge),
        berserked: c.ability_active(AbilityKind::Berserk),
        dashing: c.ability_active(AbilityKind::Dash),
        primary_weapon: WeaponSnapshot {
            name: c.primary.name().to_string(),
            ammo: c.primary.ammo,
            max_ammo: c.primary.max_ammo,
            is_reloading: c.primary.is_reloading,
        },
        secondary_weapon: c.secondary.as_ref().map(|w| w.name().to_string()),
        special_ability: c.ability.as_ref().map(|a| AbilitySnapshot {
            name: a.name().to_string(),
            current_cooldown: round_to(a.current_cooldown, TIMER_DECIMALS),
            cooldown: a.cooldown,
            is_active: a.is_active,
        }),
    }
}
