use rand::SeedableRng;
use rand::rngs::StdRng;

use skirmish_core::game::{EntityId, GameMode, PlayerId, keys};
use skirmish_core::loadout::Loadout;

use crate::ability::AbilityContext;
use crate::arena;
use crate::bullet::Bullet;
use crate::character::Character;
use crate::config::SimConfig;
use crate::geometry::Vec2;
use crate::obstacle::Obstacle;

/// Room-scoped allocator for bullet and obstacle ids.
#[derive(Debug, Clone, Default)]
pub struct EntityIds {
    last: EntityId,
}

impl EntityIds {
    pub fn next_id(&mut self) -> EntityId {
        self.last += 1;
        self.last
    }
}

/// Input forwarded from a player's connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(u32),
    KeyUp(u32),
    /// Aim angle in radians.
    Aim(f32),
    Firing(bool),
}

/// Complete simulation state of one room.
#[derive(Debug)]
pub struct World {
    pub mode: GameMode,
    pub config: SimConfig,
    pub characters: Vec<Character>,
    pub bullets: Vec<Bullet>,
    pub obstacles: Vec<Obstacle>,
    /// Number of ticks simulated so far.
    pub frame: u64,
    pub ids: EntityIds,
    pub rng: StdRng,
    round_reset: bool,
}

impl World {
    pub fn new(mode: GameMode, config: SimConfig) -> Self {
        Self::with_rng(mode, config, StdRng::from_os_rng())
    }

    /// Build a world with a caller-supplied RNG, for deterministic tests.
    pub fn with_rng(mode: GameMode, config: SimConfig, mut rng: StdRng) -> Self {
        let mut ids = EntityIds::default();
        let obstacles = arena::generate_obstacles(&config, &mut ids, &mut rng);
        Self {
            mode,
            config,
            characters: Vec::new(),
            bullets: Vec::new(),
            obstacles,
            frame: 0,
            ids,
            rng,
            round_reset: false,
        }
    }

    pub fn character(&self, id: PlayerId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn character_mut(&mut self, id: PlayerId) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    pub fn player_count(&self) -> usize {
        self.characters.len()
    }

    /// Add a character for `id` and return its seat: the duel spawn slot, or
    /// the character's index in free-for-all. Re-adding an existing id
    /// replaces its character.
    pub fn add_character(&mut self, id: PlayerId, name: Option<&str>, loadout: &Loadout) -> usize {
        if self.character(id).is_some() {
            tracing::debug!(player_id = id, "Replacing existing character");
            self.remove_character(id);
        }
        let bullet_lifetime = Some(self.config.bullet_lifetime);
        let mut character = Character::new(id, name, loadout.resolve(), Vec2::ZERO, bullet_lifetime);

        let duel_seat = match self.mode {
            GameMode::Duel => self.free_duel_slot(),
            GameMode::FreeForAll => None,
        };
        let seat = match duel_seat {
            Some((slot, spawn)) => {
                character.spawn = spawn;
                slot
            },
            None => {
                character.spawn = arena::random_spawn(
                    character.body.radius,
                    &self.obstacles,
                    &self.config,
                    &mut self.rng,
                );
                self.characters.len()
            },
        };
        character.body.pos = character.spawn;
        self.characters.push(character);
        seat
    }

    fn free_duel_slot(&self) -> Option<(usize, Vec2)> {
        (0..2).find_map(|slot| {
            let spawn = arena::duel_spawn(slot, &self.config)?;
            let taken = self.characters.iter().any(|c| c.spawn == spawn);
            (!taken).then_some((slot, spawn))
        })
    }

    /// Remove a character, ending its ability first so a deployed shield
    /// does not outlive its owner. Returns `false` for an unknown id.
    pub fn remove_character(&mut self, id: PlayerId) -> bool {
        let Some(idx) = self.characters.iter().position(|c| c.id == id) else {
            return false;
        };
        let mut character = self.characters.remove(idx);
        if let Some(ability) = character.ability.as_mut() {
            ability.force_end(&mut AbilityContext {
                body: &mut character.body,
                weapon: &mut character.primary,
                obstacles: &mut self.obstacles,
                ids: &mut self.ids,
            });
        }
        true
    }

    /// Buffer an input event for a character. Events for unknown ids are
    /// ignored since they race with disconnects.
    pub fn apply_input(&mut self, id: PlayerId, event: InputEvent) {
        let Some(character) = self.character_mut(id) else {
            return;
        };
        match event {
            InputEvent::KeyDown(code) => {
                let was_down = character.inputs.get(&code).copied().unwrap_or(false);
                if !was_down && keys::SWAP_WEAPON.contains(&code) {
                    character.swap_weapons();
                }
                character.inputs.insert(code, true);
            },
            InputEvent::KeyUp(code) => {
                character.inputs.insert(code, false);
            },
            InputEvent::Aim(angle) => {
                if angle.is_finite() {
                    character.body.angle = angle;
                } else {
                    tracing::debug!(player_id = id, "Ignoring non-finite aim angle");
                }
            },
            InputEvent::Firing(firing) => {
                character.is_firing = firing;
            },
        }
    }

    /// Move the character at `idx` to a fresh collision-free point and
    /// respawn it there.
    pub fn respawn_randomly(&mut self, idx: usize) {
        let Some(radius) = self.characters.get(idx).map(|c| c.body.radius) else {
            return;
        };
        let spawn = arena::random_spawn(radius, &self.obstacles, &self.config, &mut self.rng);
        let character = &mut self.characters[idx];
        character.spawn = spawn;
        character.respawn(&mut self.obstacles, &mut self.ids);
    }

    /// Restart the round: clear bullets, respawn every character and
    /// generate a new arena. Raises the round-reset flag.
    pub fn reset_round(&mut self) {
        self.bullets.clear();
        for character in &mut self.characters {
            character.respawn(&mut self.obstacles, &mut self.ids);
        }
        self.obstacles = arena::generate_obstacles(&self.config, &mut self.ids, &mut self.rng);
        self.round_reset = true;
        tracing::debug!(
            players = self.characters.len(),
            obstacles = self.obstacles.len(),
            "Round reset"
        );
    }

    /// Return and clear the round-reset flag.
    pub fn take_round_reset(&mut self) -> bool {
        std::mem::take(&mut self.round_reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::game::Color;
    use skirmish_core::loadout::WeaponKind;
    use skirmish_core::test_helpers::{loadout, loadout_with_ability};

    use crate::ability::AbilityState;

    fn world(mode: GameMode) -> World {
        World::with_rng(mode, SimConfig::default(), StdRng::seed_from_u64(9))
    }

    #[test]
    fn entity_ids_start_at_one_and_increase() {
        let mut ids = EntityIds::default();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn new_world_has_generated_arena() {
        let w = world(GameMode::Duel);
        assert!(!w.obstacles.is_empty());
        assert!(w.characters.is_empty());
        assert_eq!(w.frame, 0);
    }

    #[test]
    fn duel_characters_take_opposite_spawns() {
        let mut w = world(GameMode::Duel);
        assert_eq!(w.add_character(1, Some("A"), &loadout("ninja", "m4")), 0);
        assert_eq!(w.add_character(2, Some("B"), &loadout("king", "sniper")), 1);
        assert_eq!(w.character(1).unwrap().body.pos, Vec2::new(-950.0, 0.0));
        assert_eq!(w.character(2).unwrap().body.pos, Vec2::new(950.0, 0.0));
    }

    #[test]
    fn duel_slot_is_reused_after_leave() {
        let mut w = world(GameMode::Duel);
        w.add_character(1, None, &Loadout::default());
        w.add_character(2, None, &Loadout::default());
        assert!(w.remove_character(1));
        assert_eq!(w.add_character(3, None, &Loadout::default()), 0);
    }

    #[test]
    fn ffa_characters_spawn_clear_of_obstacles() {
        let mut w = world(GameMode::FreeForAll);
        for id in 1..=8 {
            w.add_character(id, None, &Loadout::default());
        }
        for c in &w.characters {
            assert!(c.body.pos.length() <= 1000.0 - c.body.radius);
            assert!(w.obstacles.iter().all(|o| !o.intersects_circle(c.body.pos, c.body.radius)));
        }
    }

    #[test]
    fn input_for_unknown_player_is_ignored() {
        let mut w = world(GameMode::FreeForAll);
        w.apply_input(42, InputEvent::KeyDown(87));
        w.apply_input(42, InputEvent::Firing(true));
        assert!(w.characters.is_empty());
    }

    #[test]
    fn inputs_are_buffered() {
        let mut w = world(GameMode::FreeForAll);
        w.add_character(1, None, &Loadout::default());
        w.apply_input(1, InputEvent::KeyDown(87));
        w.apply_input(1, InputEvent::Aim(1.25));
        w.apply_input(1, InputEvent::Firing(true));
        let c = w.character(1).unwrap();
        assert!(c.is_pressed(&keys::UP));
        assert_eq!(c.body.angle, 1.25);
        assert!(c.is_firing);

        w.apply_input(1, InputEvent::KeyUp(87));
        w.apply_input(1, InputEvent::Aim(f32::NAN));
        let c = w.character(1).unwrap();
        assert!(!c.is_pressed(&keys::UP));
        assert_eq!(c.body.angle, 1.25, "NaN aim must not overwrite the angle");
    }

    #[test]
    fn swap_key_is_edge_triggered() {
        let mut w = world(GameMode::FreeForAll);
        let with_secondary = Loadout {
            secondary: Some("shotgun".into()),
            ..loadout("ninja", "pistol")
        };
        w.add_character(1, None, &with_secondary);
        w.apply_input(1, InputEvent::KeyDown(81));
        assert_eq!(w.character(1).unwrap().primary.kind, WeaponKind::Shotgun);
        // Key repeat while held must not swap back.
        w.apply_input(1, InputEvent::KeyDown(81));
        assert_eq!(w.character(1).unwrap().primary.kind, WeaponKind::Shotgun);
        w.apply_input(1, InputEvent::KeyUp(81));
        w.apply_input(1, InputEvent::KeyDown(113));
        assert_eq!(w.character(1).unwrap().primary.kind, WeaponKind::Pistol);
    }

    #[test]
    fn removing_shield_owner_removes_its_barrier() {
        let mut w = world(GameMode::FreeForAll);
        w.add_character(1, None, &loadout_with_ability("king", "m4", "shield"));
        let before = w.obstacles.len();
        let World {
            characters,
            obstacles,
            ids,
            ..
        } = &mut w;
        assert!(characters[0].initiate_ability(obstacles, ids));
        assert_eq!(w.obstacles.len(), before + 1);

        assert!(w.remove_character(1));
        assert_eq!(w.obstacles.len(), before);
        assert!(!w.remove_character(1), "Second removal is a no-op");
    }

    #[test]
    fn reset_round_restores_characters_and_regenerates_arena() {
        let mut w = world(GameMode::Duel);
        w.add_character(1, None, &loadout("king", "m4"));
        w.add_character(2, None, &loadout("ninja", "m4"));
        let old_ids: Vec<_> = w.obstacles.iter().map(|o| o.id).collect();
        {
            let World {
                characters,
                obstacles,
                ids,
                ..
            } = &mut w;
            characters[0].initiate_ability(obstacles, ids);
            characters[0].take_damage(90.0);
            characters[1].body.pos = Vec2::new(10.0, 10.0);
        }
        w.bullets.push(Bullet {
            id: 999,
            pos: Vec2::ZERO,
            radius: 3.0,
            color: Color::YELLOW,
            speed: 1.0,
            angle: 0.0,
            owner: 1,
            damage: 1.0,
            age: 0.0,
            lifetime: None,
            active: true,
        });

        w.reset_round();
        assert!(w.bullets.is_empty());
        assert!(w.obstacles.iter().all(|o| !old_ids.contains(&o.id)));
        for c in &w.characters {
            assert_eq!(c.body.pos, c.spawn);
            assert_eq!(c.body.hp, c.body.max_hp);
            assert_eq!(c.ability.as_ref().unwrap().state(), AbilityState::Idle);
        }
        assert_eq!(w.character(1).unwrap().body.max_hp, 200.0);
        assert!(w.take_round_reset());
        assert!(!w.take_round_reset(), "Flag is cleared once taken");
    }
}
