//! Error taxonomy
//!
//! Every error here is local and recoverable. Hosts decide whether to log,
//! reject the request, or ignore it.

use thiserror::Error;

use crate::sim::state::{EntityId, PlayerId};

/// Errors reported by simulation entry points
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Rejected input (NaN/Inf vectors, non-positive mass, out-of-range speed, ...)
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Referenced entity no longer exists (usually destroyed before a scheduled event fired)
    #[error("entity {entity_id} does not exist")]
    MissingEntity { entity_id: EntityId },

    /// Referenced player does not exist
    #[error("player {player_id} does not exist")]
    MissingPlayer { player_id: PlayerId },
}

impl SimError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Missing references are an expected race between scheduling and destruction
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            SimError::MissingEntity { .. } | SimError::MissingPlayer { .. }
        )
    }
}

/// Configuration rejected at load time
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("start_player_mass must be greater than 0")]
    InvalidStartPlayerMass,
    #[error("start_player_speed must be greater than 0")]
    InvalidStartPlayerSpeed,
    #[error("food_mass_min must be greater than 0")]
    InvalidFoodMassMin,
    #[error("food_mass_max ({max}) must be >= food_mass_min ({min})")]
    InvalidFoodMassRange { min: u32, max: u32 },
    #[error("target_food_count must be greater than 0")]
    InvalidTargetFoodCount,
    #[error("minimum_safe_mass_ratio must be within (0, 1], got {0}")]
    InvalidMinimumSafeMassRatio(f32),
    #[error("min_overlap_pct_to_consume must be within (0, 1], got {0}")]
    InvalidMinOverlapPct(f32),
    #[error("max_circles_per_player must be within 1..={max}, got {actual}")]
    InvalidMaxCircles { max: u32, actual: u32 },
    #[error("split_recombine_delay_sec must be positive and finite")]
    InvalidRecombineDelay,
    #[error("split_grav_pull_before_recombine_sec ({window}) must be within [0, {delay}]")]
    InvalidGravityWindow { window: f32, delay: f32 },
    #[error("allowed_split_circle_overlap_pct must be within (0, 1], got {0}")]
    InvalidSplitOverlapPct(f32),
    #[error("self_collision_speed must be within [0, 1], got {0}")]
    InvalidSelfCollisionSpeed(f32),
    #[error("world_size must be within {min}..={max}, got {actual}")]
    InvalidWorldSize { min: u64, max: u64, actual: u64 },
    #[error("circle_decay_interval_ms must be at least {min}, got {actual}")]
    InvalidDecayInterval { min: u64, actual: u64 },
    #[error("spawn_food_interval_ms must be at least {min}, got {actual}")]
    InvalidFoodInterval { min: u64, actual: u64 },
    #[error("move_players_interval_ms must be within {min}..={max}, got {actual}")]
    InvalidMoveInterval { min: u64, max: u64, actual: u64 },
    #[error("min_mass_to_split ({actual}) must equal start_player_mass * 2 ({expected})")]
    InvalidMinMassToSplit { expected: u32, actual: u32 },
    /// World row of a restored snapshot
    #[error("world rejected: {0}")]
    InvalidWorld(SimError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reference_classification() {
        assert!(SimError::MissingEntity { entity_id: 3 }.is_missing_reference());
        assert!(SimError::MissingPlayer { player_id: 1 }.is_missing_reference());
        assert!(!SimError::invalid("speed", "out of range").is_missing_reference());
    }

    #[test]
    fn test_invalid_input_names_field() {
        let err = SimError::invalid("direction", "contains NaN");
        assert_eq!(err.to_string(), "invalid direction: contains NaN");
    }
}
