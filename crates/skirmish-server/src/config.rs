use serde::Deserialize;

use skirmish_arena::SimConfig;

/// Top-level server configuration, loaded from `skirmish.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub tick: TickConfig,
    pub limits: LimitsConfig,
    /// Simulation tuning. When the server file has no `[sim]` table the
    /// standalone simulation config is loaded instead.
    pub sim: Option<SimConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            web_root: "web".to_string(),
            tick: TickConfig::default(),
            limits: LimitsConfig::default(),
            sim: None,
        }
    }
}

/// Per-room simulation clock.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second for every room.
    pub rate_hz: u32,
    /// Elapsed wall-clock milliseconds per simulation time unit.
    pub delta_time_divisor_ms: f32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            rate_hz: 60,
            delta_time_divisor_ms: 40.0,
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub player_message_buffer: usize,
    /// Longest accepted display name, in characters.
    pub max_name_len: usize,
    pub rate: RateLimitConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
            max_name_len: 32,
            rate: RateLimitConfig::default(),
        }
    }
}

/// Per-connection message budgets, one bucket per message class.
///
/// Key releases, firing stops and leaves are never limited.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub find_game_per_min: f64,
    pub keys_per_sec: f64,
    pub aim_per_sec: f64,
    pub firing_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            find_game_per_min: 5.0,
            keys_per_sec: 100.0,
            aim_per_sec: 360.0,
            firing_per_sec: 30.0,
        }
    }
}

impl RateLimitConfig {
    fn all_positive(&self) -> bool {
        [
            self.find_game_per_min,
            self.keys_per_sec,
            self.aim_per_sec,
            self.firing_per_sec,
        ]
        .iter()
        .all(|&r| r > 0.0)
    }
}

impl ServerConfig {
    /// Simulation tuning to build new rooms with.
    pub fn sim_config(&self) -> SimConfig {
        self.sim.clone().unwrap_or_default()
    }

    /// Validate configuration, exiting on settings the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.tick.rate_hz == 0 {
            tracing::error!("tick.rate_hz must be > 0");
            std::process::exit(1);
        }
        let divisor = self.tick.delta_time_divisor_ms;
        if divisor.is_nan() || divisor <= 0.0 {
            tracing::error!("tick.delta_time_divisor_ms must be > 0");
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if !self.limits.rate.all_positive() {
            tracing::error!("limits.rate budgets must all be > 0");
            std::process::exit(1);
        }
        if self.limits.max_name_len == 0 {
            tracing::error!("limits.max_name_len must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `$SKIRMISH_CONFIG` or `skirmish.toml` if it exists,
    /// then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("SKIRMISH_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "skirmish.toml".to_string());

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                ServerConfig::default()
            },
        };

        if config.sim.is_none() {
            config.sim = Some(SimConfig::load());
        }

        // Environment variable overrides
        if let Ok(addr) = std::env::var("SKIRMISH_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("SKIRMISH_WEB_ROOT")
            && !root.is_empty()
        {
            config.web_root = root;
        }
        if let Ok(val) = std::env::var("SKIRMISH_TICK_RATE")
            && let Ok(n) = val.parse::<u32>()
        {
            config.tick.rate_hz = n;
        }

        config
    }
}
