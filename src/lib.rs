//! Blackhole Arena - world simulation for a multiplayer cell absorption arena
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, split physics, collisions, lifecycle)
//! - `config`: Validated game tunables
//! - `error`: Error taxonomy shared by the simulation and its hosts
//! - `arena`: In-memory reference host that drives the simulation

pub mod arena;
pub mod config;
pub mod error;
pub mod sim;

pub use arena::Arena;
pub use config::GameConfig;
pub use error::{ConfigError, SimError};

use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default game tunables
pub mod consts {
    /// Starting mass for new player circles
    pub const START_PLAYER_MASS: u32 = 15;
    /// Base player speed (max speed at starting mass)
    pub const START_PLAYER_SPEED: u32 = 10;

    /// Food mass range (inclusive)
    pub const FOOD_MASS_MIN: u32 = 2;
    pub const FOOD_MASS_MAX: u32 = 4;
    /// Number of food entities the spawner keeps in the world
    pub const TARGET_FOOD_COUNT: u32 = 600;

    /// A consumer must be heavier than consumed / ratio
    pub const MINIMUM_SAFE_MASS_RATIO: f32 = 0.85;
    /// Fraction of the radius sum that must overlap before consuming
    pub const MIN_OVERLAP_PCT_TO_CONSUME: f32 = 0.1;

    /// Split threshold unit (a circle needs twice this to split)
    pub const MIN_MASS_TO_SPLIT: u32 = START_PLAYER_MASS * 2;
    pub const MAX_CIRCLES_PER_PLAYER: u32 = 16;
    /// Seconds after a split before circles may recombine
    pub const SPLIT_RECOMBINE_DELAY_SEC: f32 = 5.0;
    /// Seconds before recombine when split circles start pulling together
    pub const SPLIT_GRAV_PULL_BEFORE_RECOMBINE_SEC: f32 = 2.0;
    pub const ALLOWED_SPLIT_CIRCLE_OVERLAP_PCT: f32 = 0.9;
    /// Separation speed multiplier for split circles (1.0 = instant)
    pub const SELF_COLLISION_SPEED: f32 = 0.05;

    pub const DEFAULT_WORLD_SIZE: u64 = 1000;

    /// Periodic tick intervals (milliseconds)
    pub const CIRCLE_DECAY_INTERVAL_MS: u64 = 5000;
    pub const SPAWN_FOOD_INTERVAL_MS: u64 = 500;
    pub const MOVE_PLAYERS_INTERVAL_MS: u64 = 50;

    /// Mass multiplier applied by each decay tick
    pub const DECAY_FACTOR: f32 = 0.99;
}

/// Point in time with microsecond precision, supplied by the host
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    #[inline]
    pub fn from_secs_f32(secs: f32) -> Self {
        Self((secs.max(0.0) as f64 * 1_000_000.0).round() as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Elapsed time since `earlier`, zero if `earlier` is in the future
    #[inline]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Elapsed seconds since `earlier` (never negative)
    #[inline]
    pub fn secs_since(self, earlier: Timestamp) -> f32 {
        self.saturating_since(earlier).as_secs_f32()
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(micros))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_sub(micros))
    }
}

/// Duration from fractional seconds, clamping negatives and NaN to zero
#[inline]
pub fn secs_to_duration(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs as f64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_micros(1_000_000);
        assert_eq!((t + Duration::from_millis(500)).as_micros(), 1_500_000);
        assert_eq!((t - Duration::from_secs(5)).as_micros(), 0);
        assert_eq!(t.saturating_since(Timestamp::from_micros(2_000_000)), Duration::ZERO);
        assert!((t.secs_since(Timestamp::ZERO) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_secs() {
        assert_eq!(Timestamp::from_secs_f32(5.0).as_micros(), 5_000_000);
        assert_eq!(Timestamp::from_secs_f32(-1.0), Timestamp::ZERO);
        assert_eq!(secs_to_duration(f32::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(5.0), Duration::from_secs(5));
    }
}
