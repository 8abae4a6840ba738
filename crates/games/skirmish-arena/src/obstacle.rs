use skirmish_core::game::{Color, EntityId};

use crate::geometry::{Rect, Vec2, circle_intersects_rect, circle_intersects_rotated_rect};

/// Starting health of a deployed shield.
pub const SHIELD_HEALTH: f32 = 100.0;

/// Collision shape and durability of an obstacle.
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleKind {
    /// Indestructible axis-aligned wall; `(x, y)` is the top-left corner.
    Wall,
    /// Destructible rotated barrier; `(x, y)` is the center.
    Shield { angle: f32, health: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub color: Color,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn wall(id: EntityId, rect: Rect, color: Color) -> Self {
        Self {
            id,
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            color,
            kind: ObstacleKind::Wall,
        }
    }

    pub fn shield(id: EntityId, center: Vec2, w: f32, h: f32, angle: f32) -> Self {
        Self {
            id,
            x: center.x,
            y: center.y,
            w,
            h,
            color: Color::BLUE,
            kind: ObstacleKind::Shield {
                angle,
                health: SHIELD_HEALTH,
            },
        }
    }

    /// Rotation angle, if this obstacle is a rotated rectangle.
    pub fn angle(&self) -> Option<f32> {
        match self.kind {
            ObstacleKind::Wall => None,
            ObstacleKind::Shield { angle, .. } => Some(angle),
        }
    }

    /// Remaining health, if this obstacle is destructible.
    pub fn health(&self) -> Option<f32> {
        match self.kind {
            ObstacleKind::Wall => None,
            ObstacleKind::Shield { health, .. } => Some(health),
        }
    }

    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        match self.kind {
            ObstacleKind::Wall => {
                circle_intersects_rect(center, radius, &Rect::new(self.x, self.y, self.w, self.h))
            },
            ObstacleKind::Shield { angle, .. } => circle_intersects_rotated_rect(
                center,
                radius,
                Vec2::new(self.x, self.y),
                self.w,
                self.h,
                angle,
            ),
        }
    }

    /// Apply bullet damage. Walls ignore it.
    pub fn take_damage(&mut self, amount: f32) {
        if let ObstacleKind::Shield { health, .. } = &mut self.kind {
            *health = (*health - amount).max(0.0);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.kind, ObstacleKind::Shield { health, .. } if health <= 0.0)
    }
}
