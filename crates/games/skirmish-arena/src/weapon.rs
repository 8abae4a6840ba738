use std::f32::consts::PI;

use rand::Rng;

use skirmish_core::game::{Color, PlayerId};
use skirmish_core::loadout::WeaponKind;

use crate::bullet::Bullet;
use crate::geometry::Vec2;
use crate::world::EntityIds;

/// Fixed numbers that distinguish one weapon kind from another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub damage: f32,
    pub bullet_speed: f32,
    pub fire_cooldown: f32,
    pub spread: f32,
    pub max_ammo: u32,
    pub reload_time: f32,
    pub pellet_count: u32,
    pub bullet_radius: f32,
    pub bullet_color: Color,
}

pub fn stats_for(kind: WeaponKind) -> WeaponStats {
    match kind {
        WeaponKind::M4 => WeaponStats {
            damage: 6.5,
            bullet_speed: 20.0,
            fire_cooldown: 3.0,
            spread: PI / 24.0,
            max_ammo: 30,
            reload_time: 25.5,
            pellet_count: 1,
            bullet_radius: 3.0,
            bullet_color: Color::YELLOW,
        },
        WeaponKind::Shotgun => WeaponStats {
            damage: 16.0,
            bullet_speed: 25.0,
            fire_cooldown: 24.0,
            spread: PI / 5.0,
            max_ammo: 8,
            reload_time: 35.0,
            pellet_count: 6,
            bullet_radius: 2.0,
            bullet_color: Color::YELLOW,
        },
        WeaponKind::Pistol => WeaponStats {
            damage: 18.0,
            bullet_speed: 30.0,
            fire_cooldown: 9.5,
            spread: PI / 36.0,
            max_ammo: 15,
            reload_time: 25.0,
            pellet_count: 1,
            bullet_radius: 3.0,
            bullet_color: Color::YELLOW,
        },
        WeaponKind::Sniper => WeaponStats {
            damage: 35.0,
            bullet_speed: 50.0,
            fire_cooldown: 75.0,
            spread: PI / 180.0,
            max_ammo: 5,
            reload_time: 35.5,
            pellet_count: 1,
            bullet_radius: 4.0,
            bullet_color: Color::RED,
        },
    }
}

/// A weapon owned by a character, with its fire and reload timers.
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub damage: f32,
    pub bullet_speed: f32,
    pub fire_cooldown: f32,
    pub current_cooldown: f32,
    pub spread: f32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reload_time: f32,
    pub current_reload: f32,
    pub is_reloading: bool,
    pub pellet_count: u32,
    pub bullet_radius: f32,
    pub bullet_color: Color,
    pub bullet_lifetime: Option<f32>,
    /// While set, firing does not consume ammo.
    pub unlimited_ammo: bool,
}

impl Weapon {
    pub fn new(kind: WeaponKind, bullet_lifetime: Option<f32>) -> Self {
        let s = stats_for(kind);
        Self {
            kind,
            damage: s.damage,
            bullet_speed: s.bullet_speed,
            fire_cooldown: s.fire_cooldown,
            current_cooldown: 0.0,
            spread: s.spread,
            ammo: s.max_ammo,
            max_ammo: s.max_ammo,
            reload_time: s.reload_time,
            current_reload: 0.0,
            is_reloading: false,
            pellet_count: s.pellet_count,
            bullet_radius: s.bullet_radius,
            bullet_color: s.bullet_color,
            bullet_lifetime,
            unlimited_ammo: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn can_fire(&self) -> bool {
        self.current_cooldown <= 0.0 && self.ammo > 0 && !self.is_reloading
    }

    /// Fire one shot from `origin` toward `aim`, pushing the spawned bullets
    /// into `bullets`. Returns `false` without side effects if the weapon
    /// cannot fire. One ammo is spent per shot regardless of pellet count.
    pub fn fire(
        &mut self,
        origin: Vec2,
        aim: f32,
        owner: PlayerId,
        bullets: &mut Vec<Bullet>,
        ids: &mut EntityIds,
        rng: &mut impl Rng,
    ) -> bool {
        if !self.can_fire() {
            return false;
        }
        self.current_cooldown = self.fire_cooldown;
        if !self.unlimited_ammo {
            self.ammo -= 1;
        }

        let half_spread = self.spread / 2.0;
        for _ in 0..self.pellet_count.max(1) {
            let offset = if half_spread > 0.0 {
                rng.random_range(-half_spread..half_spread)
            } else {
                0.0
            };
            bullets.push(Bullet {
                id: ids.next_id(),
                pos: origin,
                radius: self.bullet_radius,
                color: self.bullet_color,
                speed: self.bullet_speed,
                angle: aim + offset,
                owner,
                damage: self.damage,
                age: 0.0,
                lifetime: self.bullet_lifetime,
                active: true,
            });
        }

        if self.ammo == 0 {
            self.reload();
        }
        true
    }

    /// Start reloading. Returns `true` only when a reload actually begins.
    pub fn reload(&mut self) -> bool {
        if self.is_reloading || self.ammo >= self.max_ammo {
            return false;
        }
        self.is_reloading = true;
        self.current_reload = self.reload_time;
        true
    }

    /// Advance the reload timer; a finished reload refills the magazine.
    pub fn update(&mut self, dt: f32) {
        if !self.is_reloading {
            return;
        }
        self.current_reload = (self.current_reload - dt).max(0.0);
        if self.current_reload <= 0.0 {
            self.ammo = self.max_ammo;
            self.is_reloading = false;
        }
    }

    pub fn tick_cooldown(&mut self, dt: f32) {
        self.current_cooldown = (self.current_cooldown - dt).max(0.0);
    }

    /// Refill and clear all timers, as on respawn.
    pub fn restock(&mut self) {
        self.ammo = self.max_ammo;
        self.is_reloading = false;
        self.current_reload = 0.0;
        self.current_cooldown = 0.0;
    }
}
