use std::ops::{Add, AddAssign, Mul, Sub};

/// 2D vector in arena coordinates (origin at the arena center, +y down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians).
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > 0.0 { self * (1.0 / len) } else { Self::ZERO }
    }

    /// Rotate counter-clockwise by `angle` radians.
    pub fn rotate(self, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle with `(x, y)` at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Overlap test that treats touching edges as overlapping.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.x > other.x + other.w
            || self.x + self.w < other.x
            || self.y > other.y + other.h
            || self.y + self.h < other.y)
    }
}

/// True if the circle strictly intersects the axis-aligned rectangle.
pub fn circle_intersects_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = Vec2::new(
        center.x.clamp(rect.x, rect.x + rect.w),
        center.y.clamp(rect.y, rect.y + rect.h),
    );
    (center - closest).length_squared() < radius * radius
}

/// True if the circle strictly intersects a `w` x `h` rectangle centered on
/// `rect_center` and rotated by `angle` radians.
pub fn circle_intersects_rotated_rect(
    center: Vec2,
    radius: f32,
    rect_center: Vec2,
    w: f32,
    h: f32,
    angle: f32,
) -> bool {
    let local = (center - rect_center).rotate(-angle);
    let half_w = w / 2.0;
    let half_h = h / 2.0;
    let closest = Vec2::new(local.x.clamp(-half_w, half_w), local.y.clamp(-half_h, half_h));
    (local - closest).length_squared() < radius * radius
}

/// True if two circles strictly intersect.
pub fn circles_intersect(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let sum = ra + rb;
    (a - b).length_squared() < sum * sum
}

/// Round to a fixed number of decimal places for network-stable snapshots.
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}
