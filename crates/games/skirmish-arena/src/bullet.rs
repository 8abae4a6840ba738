use skirmish_core::game::{Color, EntityId, PlayerId};

use crate::geometry::Vec2;

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    pub color: Color,
    pub speed: f32,
    /// Travel direction in radians.
    pub angle: f32,
    pub owner: PlayerId,
    pub damage: f32,
    pub age: f32,
    /// Age at which the bullet expires; `None` flies until it hits something.
    pub lifetime: Option<f32>,
    /// Cleared on collision or expiry; inactive bullets are compacted away after the tick.
    pub active: bool,
}

impl Bullet {
    /// Age the bullet and move it along its heading.
    pub fn advance(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        if let Some(lifetime) = self.lifetime {
            self.age += dt;
            if self.age >= lifetime {
                self.active = false;
                return;
            }
        }
        self.pos += Vec2::from_angle(self.angle) * (self.speed * dt);
    }
}
