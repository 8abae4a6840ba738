//! One fixed step of the room simulation.

use smallvec::SmallVec;

use skirmish_core::game::{GameMode, Notification, PlayerId, keys};

use crate::geometry::circles_intersect;
use crate::world::World;

/// Receives the per-character events a tick produces.
pub trait Notifier {
    fn notify(&mut self, to: PlayerId, notification: Notification);
}

/// A notification addressed to one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub to: PlayerId,
    pub notification: Notification,
}

impl Notifier for Vec<Notice> {
    fn notify(&mut self, to: PlayerId, notification: Notification) {
        self.push(Notice { to, notification });
    }
}

/// Advance `world` by `dt` simulation units.
///
/// Characters are processed in order: input, movement, firing, timers, then
/// incoming bullets. Bullets are advanced and tested against obstacles after
/// every character has been handled. Inactive bullets and destroyed
/// obstacles are compacted away at the end of each phase, never mid-scan.
pub fn tick(world: &mut World, dt: f32, notifier: &mut impl Notifier) {
    let dt = if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        tracing::debug!(dt, "Clamping invalid tick delta to zero");
        0.0
    };

    for idx in 0..world.characters.len() {
        step_character(world, idx, dt, notifier);
    }
    world.bullets.retain(|b| b.active);

    advance_bullets(world, dt);
    world.frame += 1;
}

fn step_character(world: &mut World, idx: usize, dt: f32, notifier: &mut impl Notifier) {
    let map_radius = world.config.map_radius;
    let diagonal = world.config.diagonal_factor;
    let flash = world.config.flash_duration;

    let World {
        characters,
        bullets,
        obstacles,
        ids,
        rng,
        ..
    } = &mut *world;
    let Some(character) = characters.get_mut(idx) else {
        return;
    };
    let id = character.id;

    let dir = character.movement_direction(diagonal);

    if character.is_pressed(&keys::RELOAD) && character.primary.reload() {
        notifier.notify(id, Notification::Reload);
    }

    if character.is_pressed(&keys::ABILITY) && character.initiate_ability(obstacles, ids) {
        notifier.notify(id, Notification::AbilityUsed);
    }

    character.step_movement(dir, dt, map_radius, obstacles);
    character.clamp_to_arena(map_radius);

    if character.is_firing {
        let was_reloading = character.primary.is_reloading;
        let origin = character.body.pos;
        let aim = character.body.angle;
        if character.primary.fire(origin, aim, id, bullets, ids, rng) {
            notifier.notify(id, Notification::Fired);
            if character.primary.is_reloading && !was_reloading {
                notifier.notify(id, Notification::Reload);
            }
        }
    }

    character.primary.update(dt);
    character.update_ability(dt, obstacles, ids);

    let pos = character.body.pos;
    let radius = character.body.radius;
    let mut killer = None;
    for bullet in bullets.iter_mut() {
        if !bullet.active
            || bullet.owner == id
            || !circles_intersect(pos, radius, bullet.pos, bullet.radius)
        {
            continue;
        }
        bullet.active = false;
        character.take_damage(bullet.damage);
        character.flashing_timer = flash;
        notifier.notify(bullet.owner, Notification::Hit);
        notifier.notify(id, Notification::GotHit);
        if character.is_dead() {
            killer = Some(bullet.owner);
            break;
        }
    }

    character.primary.tick_cooldown(dt);
    character.flashing_timer = (character.flashing_timer - dt).max(0.0);

    if let Some(killer) = killer {
        handle_kill(world, idx, killer, notifier);
    }
}

fn handle_kill(world: &mut World, victim_idx: usize, killer: PlayerId, notifier: &mut impl Notifier) {
    let victim_name = world.characters[victim_idx].name.clone();
    if let Some(shooter) = world.character_mut(killer) {
        shooter.kills += 1;
        let kills = shooter.kills;
        notifier.notify(killer, Notification::Kill { victim_name, kills });
    }

    match world.mode {
        GameMode::FreeForAll => world.respawn_randomly(victim_idx),
        GameMode::Duel => world.reset_round(),
    }
}

fn advance_bullets(world: &mut World, dt: f32) {
    let World {
        bullets, obstacles, ..
    } = &mut *world;

    let mut shield_hits: SmallVec<[(usize, f32); 4]> = SmallVec::new();
    for bullet in bullets.iter_mut() {
        bullet.advance(dt);
        if !bullet.active {
            continue;
        }
        if let Some(hit) = obstacles
            .iter()
            .position(|o| o.intersects_circle(bullet.pos, bullet.radius))
        {
            bullet.active = false;
            if obstacles[hit].health().is_some() {
                shield_hits.push((hit, bullet.damage));
            }
        }
    }
    for (hit, damage) in shield_hits {
        obstacles[hit].take_damage(damage);
    }

    bullets.retain(|b| b.active);
    obstacles.retain(|o| !o.is_destroyed());
}
