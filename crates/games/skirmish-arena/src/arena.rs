//! Procedural arena layout and spawn placement.

use rand::Rng;

use skirmish_core::game::Color;

use crate::config::SimConfig;
use crate::geometry::{Rect, Vec2};
use crate::obstacle::Obstacle;
use crate::world::EntityIds;

/// Obstacle-free zones around the two duel spawn points.
pub fn spawn_zones(config: &SimConfig) -> [Rect; 2] {
    let r = config.map_radius;
    let w = config.spawn_zone_width;
    let h = config.spawn_zone_height;
    [
        Rect::new(-r, -h / 2.0, w, h),
        Rect::new(r - w, -h / 2.0, w, h),
    ]
}

/// Fixed spawn point for a duel seat (0 = left, 1 = right).
pub fn duel_spawn(slot: usize, config: &SimConfig) -> Option<Vec2> {
    let x = config.map_radius - config.duel_spawn_inset;
    match slot {
        0 => Some(Vec2::new(-x, 0.0)),
        1 => Some(Vec2::new(x, 0.0)),
        _ => None,
    }
}

/// Generate a fresh obstacle layout.
///
/// Each obstacle gets a bounded number of placement attempts; one that cannot
/// be placed without touching a spawn zone or an earlier obstacle is skipped.
pub fn generate_obstacles(
    config: &SimConfig,
    ids: &mut EntityIds,
    rng: &mut impl Rng,
) -> Vec<Obstacle> {
    let base = Color::rgb(
        rng.random_range(0..255),
        rng.random_range(0..255),
        rng.random_range(0..255),
    );
    let palette = [base, base.complement()];

    let zones = spawn_zones(config);
    let r = config.map_radius;
    let count = config.obstacle_count();
    let mut placed: Vec<Obstacle> = Vec::with_capacity(count);

    for _ in 0..count {
        let found = (0..config.obstacle_attempts).find_map(|_| {
            let w = sample_size(config, rng);
            let h = sample_size(config, rng);
            let x = -r + w / 2.0 + rng.random::<f32>() * (2.0 * r - w);
            let y = -r + h / 2.0 + rng.random::<f32>() * (2.0 * r - h);
            let rect = Rect::new(x, y, w, h);
            let blocked = zones.iter().any(|z| rect.overlaps(z))
                || placed
                    .iter()
                    .any(|o| rect.overlaps(&Rect::new(o.x, o.y, o.w, o.h)));
            (!blocked).then_some(rect)
        });
        match found {
            Some(rect) => {
                let color = palette[usize::from(rng.random_bool(0.5))];
                placed.push(Obstacle::wall(ids.next_id(), rect, color));
            },
            None => {
                tracing::debug!(
                    attempts = config.obstacle_attempts,
                    "Skipped obstacle with no free position"
                );
            },
        }
    }
    placed
}

fn sample_size(config: &SimConfig, rng: &mut impl Rng) -> f32 {
    if config.obstacle_max_size > config.obstacle_min_size {
        rng.random_range(config.obstacle_min_size..config.obstacle_max_size)
    } else {
        config.obstacle_min_size
    }
}

/// Find a random point inside the arena where a circle of `radius` touches no
/// obstacle. Falls back to the arena center once the attempt budget is spent.
pub fn random_spawn(
    radius: f32,
    obstacles: &[Obstacle],
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec2 {
    let max_dist = (config.map_radius - radius).max(0.0);
    for _ in 0..config.spawn_attempts {
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let dist = rng.random::<f32>() * max_dist;
        let p = Vec2::from_angle(angle) * dist;
        if !obstacles.iter().any(|o| o.intersects_circle(p, radius)) {
            return p;
        }
    }
    Vec2::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::geometry::circle_intersects_rect;
    use crate::obstacle::ObstacleKind;

    fn generate(seed: u64, config: &SimConfig) -> Vec<Obstacle> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ids = EntityIds::default();
        generate_obstacles(config, &mut ids, &mut rng)
    }

    #[test]
    fn obstacles_avoid_spawn_zones_and_each_other() {
        let config = SimConfig::default();
        let zones = spawn_zones(&config);
        for seed in 0..20 {
            let obstacles = generate(seed, &config);
            assert!(obstacles.len() <= config.obstacle_count());
            assert!(!obstacles.is_empty(), "Seed {seed} placed nothing");
            for (i, a) in obstacles.iter().enumerate() {
                let ra = Rect::new(a.x, a.y, a.w, a.h);
                assert!(a.w >= 50.0 && a.w < 250.0);
                assert!(a.h >= 50.0 && a.h < 250.0);
                assert!(matches!(a.kind, ObstacleKind::Wall));
                for z in &zones {
                    assert!(!ra.overlaps(z), "Obstacle {i} overlaps a spawn zone");
                }
                for b in &obstacles[i + 1..] {
                    assert!(!ra.overlaps(&Rect::new(b.x, b.y, b.w, b.h)));
                }
            }
        }
    }

    #[test]
    fn obstacles_use_two_complementary_colors() {
        let obstacles = generate(3, &SimConfig::default());
        let first = obstacles[0].color;
        for o in &obstacles {
            assert!(o.color == first || o.color == first.complement());
        }
    }

    #[test]
    fn obstacle_ids_are_unique() {
        let obstacles = generate(11, &SimConfig::default());
        let mut ids: Vec<_> = obstacles.iter().map(|o| o.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), obstacles.len());
    }

    #[test]
    fn crowded_arena_omits_unplaceable_obstacles() {
        // Tiny arena, huge obstacles: most placements must fail without erroring.
        let config = SimConfig {
            map_radius: 300.0,
            obstacle_unit: 10.0,
            obstacle_min_size: 200.0,
            obstacle_max_size: 250.0,
            ..SimConfig::default()
        };
        let obstacles = generate(5, &config);
        assert!(obstacles.len() < config.obstacle_count());
    }

    #[test]
    fn duel_spawns_sit_inside_spawn_zones() {
        let config = SimConfig::default();
        let zones = spawn_zones(&config);
        let left = duel_spawn(0, &config).unwrap();
        let right = duel_spawn(1, &config).unwrap();
        assert_eq!(left, Vec2::new(-950.0, 0.0));
        assert_eq!(right, Vec2::new(950.0, 0.0));
        assert!(circle_intersects_rect(left, 1.0, &zones[0]));
        assert!(circle_intersects_rect(right, 1.0, &zones[1]));
        assert!(duel_spawn(2, &config).is_none());
    }

    #[test]
    fn random_spawn_avoids_obstacles() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let obstacles = generate(42, &config);
        for _ in 0..50 {
            let p = random_spawn(22.0, &obstacles, &config, &mut rng);
            assert!(p.length() <= 1000.0 - 22.0);
            assert!(obstacles.iter().all(|o| !o.intersects_circle(p, 22.0)));
        }
    }

    #[test]
    fn random_spawn_falls_back_to_center() {
        let config = SimConfig::default();
        let mut ids = EntityIds::default();
        // One wall covering the whole arena.
        let blanket = Obstacle::wall(
            ids.next_id(),
            Rect::new(-2000.0, -2000.0, 4000.0, 4000.0),
            Color::RED,
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_spawn(20.0, &[blanket], &config, &mut rng), Vec2::ZERO);
    }
}
