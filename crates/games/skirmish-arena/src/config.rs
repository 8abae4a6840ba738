use serde::{Deserialize, Serialize};

/// Data-driven tuning for the arena simulation.
///
/// All durations are in simulation time units (wall-clock milliseconds divided
/// by the server's delta-time divisor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Radius of the circular playable area, centered on the origin.
    pub map_radius: f32,
    /// Arena radius divided by this gives the number of obstacles to place.
    pub obstacle_unit: f32,
    /// Minimum obstacle width/height.
    pub obstacle_min_size: f32,
    /// Maximum (exclusive) obstacle width/height.
    pub obstacle_max_size: f32,
    /// Placement attempts per obstacle before it is skipped.
    pub obstacle_attempts: u32,
    /// Rejection-sampling attempts for a free-for-all spawn point.
    pub spawn_attempts: u32,
    /// Distance of the duel spawn points from the arena edge.
    pub duel_spawn_inset: f32,
    /// Size of the obstacle-free zones around the duel spawns.
    pub spawn_zone_width: f32,
    pub spawn_zone_height: f32,
    /// Flashing timer set on a character when a bullet hits it.
    pub flash_duration: f32,
    /// Maximum age of a bullet before it expires.
    pub bullet_lifetime: f32,
    /// Multiplier applied to each axis when moving diagonally.
    pub diagonal_factor: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map_radius: 1000.0,
            obstacle_unit: 50.0,
            obstacle_min_size: 50.0,
            obstacle_max_size: 250.0,
            obstacle_attempts: 50,
            spawn_attempts: 100,
            duel_spawn_inset: 50.0,
            spawn_zone_width: 150.0,
            spawn_zone_height: 200.0,
            flash_duration: 1.0,
            bullet_lifetime: 100.0,
            diagonal_factor: std::f32::consts::FRAC_1_SQRT_2,
        }
    }
}

impl SimConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("SKIRMISH_SIM_CONFIG")
            && let Some(config) = Self::from_file(&path)
        {
            return config;
        }
        Self::from_file("config/sim.toml").unwrap_or_default()
    }

    fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<Self>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path, error = %e, "Ignoring unparsable simulation config");
                None
            },
        }
    }

    /// Number of obstacles a freshly generated arena tries to place.
    pub fn obstacle_count(&self) -> usize {
        if self.obstacle_unit <= 0.0 {
            return 0;
        }
        (self.map_radius / self.obstacle_unit).floor().max(0.0) as usize
    }
}
