use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::constants::{ai, coordinator, grid, sim};
use crate::game::spatial::GridError;
use crate::util::vec2::Vec2;

/// Errors while loading configuration from a file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid arena configuration: {0}")]
    Invalid(#[from] GridError),
    #[error("Tick rate must be {min}-{max} Hz, got {rate}")]
    InvalidTickRate { rate: u32, min: u32, max: u32 },
}

/// Arena geometry the grid index is built from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Extent along the world Z axis (grid rows)
    pub length: f32,
    /// Extent along the world X axis (grid columns)
    pub width: f32,
    /// Edge length of one square cell
    pub tile_size: f32,
    /// Arena centre on the ground plane
    pub center: Vec2,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            length: grid::DEFAULT_ARENA_LENGTH,
            width: grid::DEFAULT_ARENA_WIDTH,
            tile_size: grid::DEFAULT_TILE_SIZE,
            center: Vec2::ZERO,
        }
    }
}

impl ArenaConfig {
    pub fn new(length: f32, width: f32, tile_size: f32) -> Self {
        Self {
            length,
            width,
            tile_size,
            center: Vec2::ZERO,
        }
    }

    /// Grid dimensions (columns, rows) this configuration produces
    pub fn cell_dimensions(&self) -> (usize, usize) {
        if !(self.tile_size > 0.0) {
            return (0, 0);
        }
        (
            (self.width / self.tile_size).floor().max(0.0) as usize,
            (self.length / self.tile_size).floor().max(0.0) as usize,
        )
    }

    /// Reject configurations that cannot produce a usable grid
    pub fn validate(&self) -> Result<(), GridError> {
        if !(self.tile_size > 0.0) || !self.tile_size.is_finite() {
            return Err(GridError::InvalidTileSize(self.tile_size));
        }
        let (max_x, max_y) = self.cell_dimensions();
        if max_x == 0 || max_y == 0 {
            return Err(GridError::InvalidDimensions {
                length: self.length,
                width: self.width,
                tile_size: self.tile_size,
            });
        }
        if max_x.saturating_mul(max_y) > grid::MAX_CELLS {
            return Err(GridError::TooManyCells(max_x.saturating_mul(max_y)));
        }
        Ok(())
    }
}

/// Tunables of the bot decision engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub proximity_threshold: f32,
    pub max_chase_cycle: f32,
    pub chase_cooldown: f32,
    pub seek_arrival_distance: f32,
    pub lookahead_distance: f32,
    pub aim_accuracy: f32,
    pub move_dead_zone: f32,
    pub nudge_speed: f32,
    pub spike_cell_radius: i32,
    /// Fuel fraction that must be exceeded before a trail is lit
    pub trail_fuel_threshold: f32,
    /// Compute decisions on the rayon pool
    pub parallel_enabled: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: ai::PROXIMITY_THRESHOLD,
            max_chase_cycle: ai::MAX_CHASE_CYCLE,
            chase_cooldown: ai::CHASE_COOLDOWN,
            seek_arrival_distance: ai::SEEK_ARRIVAL_DISTANCE,
            lookahead_distance: ai::LOOKAHEAD_DISTANCE,
            aim_accuracy: ai::AIM_ACCURACY,
            move_dead_zone: ai::MOVE_DEAD_ZONE,
            nudge_speed: ai::NUDGE_SPEED,
            spike_cell_radius: ai::SPIKE_CELL_RADIUS,
            trail_fuel_threshold: coordinator::TRAIL_FUEL_THRESHOLD,
            parallel_enabled: cfg!(feature = "parallel_ai"),
        }
    }
}

/// Top-level configuration for a simulation instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub arena: ArenaConfig,
    pub ai: AiConfig,
    pub bot_count: usize,
    pub tick_rate: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            ai: AiConfig::default(),
            bot_count: coordinator::DEFAULT_BOT_COUNT,
            tick_rate: sim::TICK_RATE,
        }
    }
}

impl SimulationConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        override_positive("ARENA_LENGTH", &mut config.arena.length);
        override_positive("ARENA_WIDTH", &mut config.arena.width);
        override_positive("ARENA_TILE_SIZE", &mut config.arena.tile_size);
        override_positive("AI_PROXIMITY_THRESHOLD", &mut config.ai.proximity_threshold);
        override_positive("AI_MAX_CHASE_CYCLE", &mut config.ai.max_chase_cycle);
        override_positive("AI_CHASE_COOLDOWN", &mut config.ai.chase_cooldown);

        if let Ok(count) = std::env::var("BOT_COUNT") {
            match count.parse::<usize>() {
                Ok(parsed) if parsed <= 64 => config.bot_count = parsed,
                Ok(_) => tracing::warn!("BOT_COUNT must be 0-64, using default"),
                Err(_) => tracing::warn!("Invalid BOT_COUNT '{}', using default", count),
            }
        }

        if let Ok(rate) = std::env::var("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (sim::MIN_TICK_RATE..=sim::MAX_TICK_RATE).contains(&parsed) => {
                    config.tick_rate = parsed
                }
                Ok(_) => tracing::warn!(
                    "TICK_RATE must be {}-{}, using default",
                    sim::MIN_TICK_RATE,
                    sim::MAX_TICK_RATE
                ),
                Err(_) => tracing::warn!("Invalid TICK_RATE '{}', using default", rate),
            }
        }

        if let Ok(val) = std::env::var("AI_PARALLEL_ENABLED") {
            match val.parse::<bool>() {
                Ok(parsed) => config.ai.parallel_enabled = parsed,
                Err(_) => tracing::warn!("Invalid AI_PARALLEL_ENABLED '{}', using default", val),
            }
        }

        config
    }

    /// Load a JSON document; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Seconds per tick
    pub fn tick_duration(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate()?;
        if !(sim::MIN_TICK_RATE..=sim::MAX_TICK_RATE).contains(&self.tick_rate) {
            return Err(ConfigError::InvalidTickRate {
                rate: self.tick_rate,
                min: sim::MIN_TICK_RATE,
                max: sim::MAX_TICK_RATE,
            });
        }
        Ok(())
    }
}

fn override_positive(key: &str, target: &mut f32) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.parse::<f32>() {
        Ok(parsed) if parsed > 0.0 && parsed.is_finite() => *target = parsed,
        Ok(_) => tracing::warn!("{} must be > 0, using default", key),
        Err(_) => tracing::warn!("Invalid {} '{}', using default", key, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::load_or_default();
        assert!(config.tick_rate > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cell_dimensions_floor() {
        let arena = ArenaConfig::new(95.0, 42.0, 10.0);
        assert_eq!(arena.cell_dimensions(), (4, 9));
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let arena = ArenaConfig::new(100.0, 100.0, 0.0);
        assert!(matches!(arena.validate(), Err(GridError::InvalidTileSize(_))));
    }

    #[test]
    fn test_tile_larger_than_arena_rejected() {
        let arena = ArenaConfig::new(5.0, 100.0, 10.0);
        assert!(matches!(
            arena.validate(),
            Err(GridError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_json_partial_document() {
        let config = SimulationConfig::from_json_str(
            r#"{ "arena": { "tile_size": 5.0 }, "ai": { "proximity_threshold": 40.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.arena.tile_size, 5.0);
        assert_eq!(config.arena.width, grid::DEFAULT_ARENA_WIDTH);
        assert_eq!(config.ai.proximity_threshold, 40.0);
        assert_eq!(config.ai.chase_cooldown, ai::CHASE_COOLDOWN);
        assert_eq!(config.tick_rate, sim::TICK_RATE);
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let config = SimulationConfig::from_json_str(r#"{ "tick_rate": 0 }"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTickRate { rate: 0, .. })
        ));
    }

    #[test]
    fn test_tick_rate_above_max_rejected() {
        let config = SimulationConfig {
            tick_rate: sim::MAX_TICK_RATE + 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTickRate { .. })
        ));

        let config = SimulationConfig {
            tick_rate: sim::MAX_TICK_RATE,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_arena_surfaces_as_config_error() {
        let mut config = SimulationConfig::default();
        config.arena.tile_size = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(GridError::InvalidTileSize(_)))
        ));
    }

    #[test]
    fn test_json_garbage_rejected() {
        assert!(SimulationConfig::from_json_str("{ not json").is_err());
    }
}
