//! Game tunables
//!
//! Loaded once (defaults or a JSON document) and validated before any tick
//! runs. The simulation receives the config as an explicit parameter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Game balance and timing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === Player ===
    /// Mass of a freshly spawned player circle
    pub start_player_mass: u32,
    /// Max speed of a circle at starting mass
    pub start_player_speed: u32,

    // === Food ===
    pub food_mass_min: u32,
    pub food_mass_max: u32,
    /// Food count the spawner tops the world up to
    pub target_food_count: u32,

    // === Consumption ===
    /// consumed / consumer must be below this for a collision to consume
    pub minimum_safe_mass_ratio: f32,
    /// Fraction of the radius sum that must overlap
    pub min_overlap_pct_to_consume: f32,

    // === Splitting ===
    /// Derived: always start_player_mass * 2
    pub min_mass_to_split: u32,
    pub max_circles_per_player: u32,
    pub split_recombine_delay_sec: f32,
    /// Gravity pull window before the recombine moment
    pub split_grav_pull_before_recombine_sec: f32,
    pub allowed_split_circle_overlap_pct: f32,
    pub self_collision_speed: f32,

    // === World ===
    pub default_world_size: u64,

    // === Timers ===
    pub circle_decay_interval_ms: u64,
    pub spawn_food_interval_ms: u64,
    pub move_players_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_player_mass: START_PLAYER_MASS,
            start_player_speed: START_PLAYER_SPEED,

            food_mass_min: FOOD_MASS_MIN,
            food_mass_max: FOOD_MASS_MAX,
            target_food_count: TARGET_FOOD_COUNT,

            minimum_safe_mass_ratio: MINIMUM_SAFE_MASS_RATIO,
            min_overlap_pct_to_consume: MIN_OVERLAP_PCT_TO_CONSUME,

            min_mass_to_split: MIN_MASS_TO_SPLIT,
            max_circles_per_player: MAX_CIRCLES_PER_PLAYER,
            split_recombine_delay_sec: SPLIT_RECOMBINE_DELAY_SEC,
            split_grav_pull_before_recombine_sec: SPLIT_GRAV_PULL_BEFORE_RECOMBINE_SEC,
            allowed_split_circle_overlap_pct: ALLOWED_SPLIT_CIRCLE_OVERLAP_PCT,
            self_collision_speed: SELF_COLLISION_SPEED,

            default_world_size: DEFAULT_WORLD_SIZE,

            circle_decay_interval_ms: CIRCLE_DECAY_INTERVAL_MS,
            spawn_food_interval_ms: SPAWN_FOOD_INTERVAL_MS,
            move_players_interval_ms: MOVE_PLAYERS_INTERVAL_MS,
        }
    }
}

impl GameConfig {
    pub const MAX_CIRCLES_LIMIT: u32 = 64;
    pub const MIN_WORLD_SIZE: u64 = 100;
    pub const MAX_WORLD_SIZE: u64 = 100_000;
    pub const MIN_DECAY_INTERVAL_MS: u64 = 1000;
    pub const MIN_FOOD_INTERVAL_MS: u64 = 10;
    pub const MIN_MOVE_INTERVAL_MS: u64 = 10;
    pub const MAX_MOVE_INTERVAL_MS: u64 = 1000;

    /// Parse a JSON document (missing fields take defaults) and validate it.
    ///
    /// `min_mass_to_split` is recomputed from `start_player_mass` unless the
    /// document sets it explicitly, in which case it must agree.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let explicit_split_mass = value.get("min_mass_to_split").is_some();
        let mut config: GameConfig = serde_json::from_value(value)?;
        if !explicit_split_mass {
            config.min_mass_to_split = config.start_player_mass.saturating_mul(2);
        }
        config.validate()?;
        log::debug!("Loaded game config: {:?}", config);
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject out-of-range tunables and inconsistent derived values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_masses()?;
        self.validate_consumption()?;
        self.validate_splitting()?;
        self.validate_world_and_timers()?;
        Ok(())
    }

    fn validate_masses(&self) -> Result<(), ConfigError> {
        if self.start_player_mass == 0 {
            return Err(ConfigError::InvalidStartPlayerMass);
        }
        if self.start_player_speed == 0 {
            return Err(ConfigError::InvalidStartPlayerSpeed);
        }
        if self.food_mass_min == 0 {
            return Err(ConfigError::InvalidFoodMassMin);
        }
        if self.food_mass_max < self.food_mass_min {
            return Err(ConfigError::InvalidFoodMassRange {
                min: self.food_mass_min,
                max: self.food_mass_max,
            });
        }
        if self.target_food_count == 0 {
            return Err(ConfigError::InvalidTargetFoodCount);
        }
        Ok(())
    }

    fn validate_consumption(&self) -> Result<(), ConfigError> {
        if !unit_interval_open_low(self.minimum_safe_mass_ratio) {
            return Err(ConfigError::InvalidMinimumSafeMassRatio(
                self.minimum_safe_mass_ratio,
            ));
        }
        if !unit_interval_open_low(self.min_overlap_pct_to_consume) {
            return Err(ConfigError::InvalidMinOverlapPct(
                self.min_overlap_pct_to_consume,
            ));
        }
        Ok(())
    }

    fn validate_splitting(&self) -> Result<(), ConfigError> {
        if self.max_circles_per_player == 0 || self.max_circles_per_player > Self::MAX_CIRCLES_LIMIT
        {
            return Err(ConfigError::InvalidMaxCircles {
                max: Self::MAX_CIRCLES_LIMIT,
                actual: self.max_circles_per_player,
            });
        }
        let delay = self.split_recombine_delay_sec;
        if !(delay.is_finite() && delay > 0.0) {
            return Err(ConfigError::InvalidRecombineDelay);
        }
        let window = self.split_grav_pull_before_recombine_sec;
        if !(window.is_finite() && (0.0..=delay).contains(&window)) {
            return Err(ConfigError::InvalidGravityWindow { window, delay });
        }
        if !unit_interval_open_low(self.allowed_split_circle_overlap_pct) {
            return Err(ConfigError::InvalidSplitOverlapPct(
                self.allowed_split_circle_overlap_pct,
            ));
        }
        if !(self.self_collision_speed.is_finite()
            && (0.0..=1.0).contains(&self.self_collision_speed))
        {
            return Err(ConfigError::InvalidSelfCollisionSpeed(
                self.self_collision_speed,
            ));
        }
        let expected = self.start_player_mass.saturating_mul(2);
        if self.min_mass_to_split != expected {
            return Err(ConfigError::InvalidMinMassToSplit {
                expected,
                actual: self.min_mass_to_split,
            });
        }
        Ok(())
    }

    fn validate_world_and_timers(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_WORLD_SIZE..=Self::MAX_WORLD_SIZE).contains(&self.default_world_size) {
            return Err(ConfigError::InvalidWorldSize {
                min: Self::MIN_WORLD_SIZE,
                max: Self::MAX_WORLD_SIZE,
                actual: self.default_world_size,
            });
        }
        if self.circle_decay_interval_ms < Self::MIN_DECAY_INTERVAL_MS {
            return Err(ConfigError::InvalidDecayInterval {
                min: Self::MIN_DECAY_INTERVAL_MS,
                actual: self.circle_decay_interval_ms,
            });
        }
        if self.spawn_food_interval_ms < Self::MIN_FOOD_INTERVAL_MS {
            return Err(ConfigError::InvalidFoodInterval {
                min: Self::MIN_FOOD_INTERVAL_MS,
                actual: self.spawn_food_interval_ms,
            });
        }
        if !(Self::MIN_MOVE_INTERVAL_MS..=Self::MAX_MOVE_INTERVAL_MS)
            .contains(&self.move_players_interval_ms)
        {
            return Err(ConfigError::InvalidMoveInterval {
                min: Self::MIN_MOVE_INTERVAL_MS,
                max: Self::MAX_MOVE_INTERVAL_MS,
                actual: self.move_players_interval_ms,
            });
        }
        Ok(())
    }

    /// Circles at or above twice this mass may split
    #[inline]
    pub fn mass_to_split(&self) -> u32 {
        self.start_player_mass.saturating_mul(2)
    }

    /// Recombine delay in whole microseconds, the resolution of `Timestamp`
    ///
    /// Scheduling and eligibility both use this value, so an event fired at
    /// `split + recombine_delay()` always finds the split circles ready.
    #[inline]
    pub fn recombine_delay(&self) -> Duration {
        let micros = crate::Timestamp::from_secs_f32(self.split_recombine_delay_sec).as_micros();
        Duration::from_micros(micros)
    }

    #[inline]
    pub fn move_interval(&self) -> Duration {
        Duration::from_millis(self.move_players_interval_ms)
    }

    #[inline]
    pub fn food_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_food_interval_ms)
    }

    #[inline]
    pub fn decay_interval(&self) -> Duration {
        Duration::from_millis(self.circle_decay_interval_ms)
    }

    /// Integration step of one movement tick, in seconds
    #[inline]
    pub fn move_dt(&self) -> f32 {
        self.move_interval().as_secs_f32()
    }
}

#[inline]
fn unit_interval_open_low(value: f32) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}
