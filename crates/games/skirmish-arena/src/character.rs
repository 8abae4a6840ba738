use std::collections::HashMap;

use skirmish_core::game::{PlayerId, keys};
use skirmish_core::loadout::{AbilityKind, ArchetypeKind, ResolvedLoadout};

use crate::ability::{Ability, AbilityContext};
use crate::geometry::Vec2;
use crate::obstacle::Obstacle;
use crate::weapon::Weapon;
use crate::world::EntityIds;

/// Base stats for an archetype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchetypeStats {
    pub speed: f32,
    pub max_hp: f32,
    /// Carried for display; bullet damage comes from the weapon alone.
    pub damage: f32,
    pub radius: f32,
}

pub fn archetype_stats(kind: ArchetypeKind) -> ArchetypeStats {
    match kind {
        ArchetypeKind::Ninja => ArchetypeStats {
            speed: 8.0,
            max_hp: 75.0,
            damage: 1.2,
            radius: 18.0,
        },
        ArchetypeKind::King => ArchetypeStats {
            speed: 3.0,
            max_hp: 200.0,
            damage: 1.5,
            radius: 25.0,
        },
        ArchetypeKind::Berserker => ArchetypeStats {
            speed: 6.0,
            max_hp: 120.0,
            damage: 2.0,
            radius: 22.0,
        },
    }
}

/// Physical state of a character that abilities are allowed to change.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub hp: f32,
    pub max_hp: f32,
    /// Multiplier on incoming damage.
    pub defense: f32,
    /// Facing angle in radians; also the firing direction.
    pub angle: f32,
}

#[derive(Debug, Clone)]
pub struct Character {
    pub id: PlayerId,
    pub name: String,
    pub archetype: ArchetypeKind,
    pub body: Body,
    pub damage: f32,
    pub primary: Weapon,
    pub secondary: Option<Weapon>,
    pub ability: Option<Ability>,
    pub kills: u32,
    pub flashing_timer: f32,
    /// Latest pressed state per key code.
    pub inputs: HashMap<u32, bool>,
    pub is_firing: bool,
    pub spawn: Vec2,
}

impl Character {
    pub fn new(
        id: PlayerId,
        name: Option<&str>,
        loadout: ResolvedLoadout,
        spawn: Vec2,
        bullet_lifetime: Option<f32>,
    ) -> Self {
        let stats = archetype_stats(loadout.archetype);
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(loadout.archetype.display_name())
            .to_string();
        Self {
            id,
            name,
            archetype: loadout.archetype,
            body: Body {
                pos: spawn,
                radius: stats.radius,
                speed: stats.speed,
                hp: stats.max_hp,
                max_hp: stats.max_hp,
                defense: 1.0,
                angle: 0.0,
            },
            damage: stats.damage,
            primary: Weapon::new(loadout.weapon, bullet_lifetime),
            secondary: loadout
                .secondary
                .map(|kind| Weapon::new(kind, bullet_lifetime)),
            ability: Some(Ability::new(loadout.ability)),
            kills: 0,
            flashing_timer: 0.0,
            inputs: HashMap::new(),
            is_firing: false,
            spawn,
        }
    }

    /// True if any of the given key codes is currently held.
    pub fn is_pressed(&self, codes: &[u32]) -> bool {
        codes
            .iter()
            .any(|c| self.inputs.get(c).copied().unwrap_or(false))
    }

    /// Unit movement direction from held WASD keys.
    pub fn movement_direction(&self, diagonal_factor: f32) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.is_pressed(&keys::UP) {
            dir.y = -1.0;
        }
        if self.is_pressed(&keys::DOWN) {
            dir.y = 1.0;
        }
        if self.is_pressed(&keys::LEFT) {
            dir.x = -1.0;
        }
        if self.is_pressed(&keys::RIGHT) {
            dir.x = 1.0;
        }
        if dir.x != 0.0 && dir.y != 0.0 {
            dir = dir * diagonal_factor;
        }
        dir
    }

    pub fn ability_active(&self, kind: AbilityKind) -> bool {
        self.ability
            .as_ref()
            .is_some_and(|a| a.is_active && a.kind == kind)
    }

    /// Exchange primary and secondary weapons. Refused while an ability is
    /// active, since abilities hold stashed stats of the current primary.
    pub fn swap_weapons(&mut self) -> bool {
        if self.ability.as_ref().is_some_and(|a| a.is_active) {
            return false;
        }
        match self.secondary.as_mut() {
            Some(secondary) => {
                std::mem::swap(&mut self.primary, secondary);
                true
            },
            None => false,
        }
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.body.hp = (self.body.hp - amount * self.body.defense).max(0.0);
    }

    pub fn is_dead(&self) -> bool {
        self.body.hp <= 0.0
    }

    /// Try to start the ability. Returns `false` if there is none or it is not idle.
    pub fn initiate_ability(&mut self, obstacles: &mut Vec<Obstacle>, ids: &mut EntityIds) -> bool {
        let Some(ability) = self.ability.as_mut() else {
            return false;
        };
        ability.initiate(&mut AbilityContext {
            body: &mut self.body,
            weapon: &mut self.primary,
            obstacles,
            ids,
        })
    }

    pub fn update_ability(&mut self, dt: f32, obstacles: &mut Vec<Obstacle>, ids: &mut EntityIds) {
        if let Some(ability) = self.ability.as_mut() {
            ability.update(
                dt,
                &mut AbilityContext {
                    body: &mut self.body,
                    weapon: &mut self.primary,
                    obstacles,
                    ids,
                },
            );
        }
    }

    /// Move by `delta`, resolving each axis against obstacles independently so
    /// the character can slide along walls. An obstacle only blocks an axis if
    /// the character does not already overlap it, which lets a character walk
    /// out of a barrier that appeared on top of it.
    pub fn move_by(&mut self, delta: Vec2, obstacles: &[Obstacle]) {
        let pos = self.body.pos;
        let r = self.body.radius;
        let next_x = Vec2::new(pos.x + delta.x, pos.y);
        let next_y = Vec2::new(pos.x, pos.y + delta.y);

        let mut can_move_x = true;
        let mut can_move_y = true;
        for o in obstacles {
            if o.intersects_circle(pos, r) {
                continue;
            }
            if o.intersects_circle(next_x, r) {
                can_move_x = false;
            }
            if o.intersects_circle(next_y, r) {
                can_move_y = false;
            }
        }
        if can_move_x {
            self.body.pos.x = next_x.x;
        }
        if can_move_y {
            self.body.pos.y = next_y.y;
        }
    }

    /// Apply this tick's movement input, sliding along the arena boundary
    /// instead of stopping at it.
    pub fn step_movement(
        &mut self,
        dir: Vec2,
        dt: f32,
        map_radius: f32,
        obstacles: &[Obstacle],
    ) {
        if dir == Vec2::ZERO || dt <= 0.0 {
            return;
        }
        let delta = dir * (self.body.speed * dt);
        let max_dist = (map_radius - self.body.radius).max(0.0);
        let tentative = self.body.pos + delta;
        let delta = if tentative.length() <= max_dist {
            delta
        } else {
            // Project the target back onto the boundary along its radial
            // direction; what is left of the step is its tangential part.
            tentative.normalize_or_zero() * max_dist - self.body.pos
        };
        self.move_by(delta, obstacles);
    }

    /// Pull the character back inside the arena if it ended up outside.
    pub fn clamp_to_arena(&mut self, map_radius: f32) {
        let max_dist = (map_radius - self.body.radius).max(0.0);
        if self.body.pos.length() > max_dist {
            self.body.pos = self.body.pos.normalize_or_zero() * max_dist;
        }
    }

    /// Return to the spawn point at full health with a full magazine and an
    /// idle ability.
    pub fn respawn(&mut self, obstacles: &mut Vec<Obstacle>, ids: &mut EntityIds) {
        if let Some(ability) = self.ability.as_mut() {
            ability.force_end(&mut AbilityContext {
                body: &mut self.body,
                weapon: &mut self.primary,
                obstacles,
                ids,
            });
        }
        self.body.pos = self.spawn;
        self.body.hp = self.body.max_hp;
        self.primary.restock();
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.restock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::game::Color;
    use skirmish_core::loadout::{Loadout, WeaponKind};

    use crate::ability::AbilityState;
    use crate::geometry::Rect;

    fn character(archetype: &str, weapon: &str) -> Character {
        Character::new(
            1,
            None,
            Loadout::new(archetype, weapon).resolve(),
            Vec2::ZERO,
            Some(100.0),
        )
    }

    fn press(c: &mut Character, code: u32) {
        c.inputs.insert(code, true);
    }

    #[test]
    fn archetype_stats_applied() {
        let ninja = character("ninja", "m4");
        assert_eq!(ninja.body.speed, 8.0);
        assert_eq!(ninja.body.max_hp, 75.0);
        assert_eq!(ninja.body.hp, 75.0);
        assert_eq!(ninja.body.radius, 18.0);
        assert_eq!(ninja.damage, 1.2);
        assert_eq!(ninja.name, "Ninja", "Name defaults to the archetype name");
        assert_eq!(ninja.ability.as_ref().map(|a| a.kind), Some(AbilityKind::Dash));

        let king = character("king", "pistol");
        assert_eq!(king.body.max_hp, 200.0);
        assert_eq!(king.primary.kind, WeaponKind::Pistol);
    }

    #[test]
    fn custom_name_is_used_when_present() {
        let c = Character::new(3, Some("  Zed "), Loadout::default().resolve(), Vec2::ZERO, None);
        assert_eq!(c.name, "Zed");
        let blank = Character::new(3, Some("   "), Loadout::default().resolve(), Vec2::ZERO, None);
        assert_eq!(blank.name, "Berserker");
    }

    #[test]
    fn diagonal_movement_is_normalized() {
        let mut c = character("berserker", "m4");
        press(&mut c, keys::UP[1]);
        press(&mut c, keys::RIGHT[0]);
        let dir = c.movement_direction(std::f32::consts::FRAC_1_SQRT_2);
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.x > 0.0 && dir.y < 0.0);
    }

    #[test]
    fn released_keys_do_not_move() {
        let mut c = character("berserker", "m4");
        c.inputs.insert(keys::LEFT[0], false);
        assert_eq!(c.movement_direction(0.707), Vec2::ZERO);
    }

    #[test]
    fn defense_scales_damage_and_hp_clamps_at_zero() {
        let mut c = character("king", "m4");
        c.body.defense = 0.5;
        c.take_damage(40.0);
        assert_eq!(c.body.hp, 180.0);
        c.take_damage(10_000.0);
        assert_eq!(c.body.hp, 0.0);
        assert!(c.is_dead());
    }

    #[test]
    fn per_axis_collision_slides_along_wall() {
        let mut c = character("berserker", "m4");
        // Wall directly to the right; diagonal move should keep the y part.
        let wall = Obstacle::wall(9, Rect::new(30.0, -100.0, 50.0, 200.0), Color::RED);
        c.move_by(Vec2::new(10.0, 10.0), &[wall]);
        assert_eq!(c.body.pos.x, 0.0, "x movement should be blocked");
        assert_eq!(c.body.pos.y, 10.0, "y movement should slide through");
    }

    #[test]
    fn overlapping_obstacle_does_not_trap() {
        let mut c = character("berserker", "m4");
        let wall = Obstacle::wall(9, Rect::new(-5.0, -5.0, 10.0, 10.0), Color::RED);
        c.move_by(Vec2::new(4.0, 0.0), &[wall]);
        assert_eq!(c.body.pos.x, 4.0);
    }

    #[test]
    fn boundary_move_slides_tangentially() {
        let mut c = character("berserker", "m4");
        let max = 1000.0 - c.body.radius;
        let start = Vec2::new(
            max * std::f32::consts::FRAC_1_SQRT_2,
            max * std::f32::consts::FRAC_1_SQRT_2,
        );
        c.body.pos = start;
        c.step_movement(Vec2::new(1.0, 0.0), 1.0, 1000.0, &[]);
        c.clamp_to_arena(1000.0);
        let moved = c.body.pos - start;
        assert!(moved.length() > 1.0, "Character should slide, moved {moved:?}");
        assert!(moved.y < 0.0, "Sliding along the arc toward +x goes up at 45 degrees");
        assert!(c.body.pos.length() <= max + 1e-3);
    }

    #[test]
    fn respawn_restores_everything() {
        let mut c = character("king", "shotgun");
        c.spawn = Vec2::new(50.0, -20.0);
        let mut obstacles = Vec::new();
        let mut ids = EntityIds::default();
        assert!(c.initiate_ability(&mut obstacles, &mut ids));
        c.take_damage(150.0);
        c.primary.ammo = 1;
        c.body.pos = Vec2::new(300.0, 300.0);

        c.respawn(&mut obstacles, &mut ids);
        assert_eq!(c.body.pos, c.spawn);
        assert_eq!(c.body.max_hp, 200.0, "Enlarge must be reverted");
        assert_eq!(c.body.hp, c.body.max_hp);
        assert_eq!(c.primary.ammo, c.primary.max_ammo);
        let ability = c.ability.as_ref().unwrap();
        assert_eq!(ability.state(), AbilityState::Idle);
        assert_eq!(ability.current_cooldown, 0.0);
        assert_eq!(ability.current_duration, 0.0);
    }

    #[test]
    fn swap_exchanges_weapons_but_not_during_ability() {
        let mut c = Character::new(
            1,
            None,
            Loadout {
                secondary: Some("sniper".into()),
                ..Loadout::new("ninja", "m4")
            }
            .resolve(),
            Vec2::ZERO,
            None,
        );
        assert!(c.swap_weapons());
        assert_eq!(c.primary.kind, WeaponKind::Sniper);
        assert_eq!(c.secondary.as_ref().map(|w| w.kind), Some(WeaponKind::M4));

        let mut obstacles = Vec::new();
        let mut ids = EntityIds::default();
        c.initiate_ability(&mut obstacles, &mut ids);
        assert!(!c.swap_weapons());
        assert_eq!(c.primary.kind, WeaponKind::Sniper);
    }

    #[test]
    fn swap_without_secondary_fails() {
        let mut c = character("ninja", "m4");
        assert!(!c.swap_weapons());
    }
}
