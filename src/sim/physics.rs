//! Mass-derived quantities
//!
//! Every collaborator must compute these identically, so they are plain
//! functions of the mass and the config.

use crate::config::GameConfig;
use crate::consts::DECAY_FACTOR;

/// Radius of a body: sqrt(mass)
#[inline]
pub fn mass_to_radius(mass: u32) -> f32 {
    (mass as f32).sqrt()
}

/// Max speed: 2 * start_speed / (1 + sqrt(mass / start_mass))
///
/// Equals `start_player_speed` at starting mass and falls as mass grows.
#[inline]
pub fn mass_to_max_move_speed(mass: u32, config: &GameConfig) -> f32 {
    let start_mass = config.start_player_mass as f32;
    let start_speed = config.start_player_speed as f32;
    2.0 * start_speed / (1.0 + (mass as f32 / start_mass).sqrt())
}

/// Squared centre distance at or below which two bodies overlap
#[inline]
pub fn overlap_threshold(radius_a: f32, radius_b: f32, overlap_pct: f32) -> f32 {
    let radius_sum = (radius_a + radius_b) * (1.0 - overlap_pct);
    radius_sum * radius_sum
}

/// Consumption threshold using `min_overlap_pct_to_consume`
#[inline]
pub fn consume_overlap_threshold(radius_a: f32, radius_b: f32, config: &GameConfig) -> f32 {
    overlap_threshold(radius_a, radius_b, config.min_overlap_pct_to_consume)
}

/// At least twice the starting mass
#[inline]
pub fn is_valid_mass_for_split(mass: u32, config: &GameConfig) -> bool {
    mass >= config.mass_to_split()
}

/// A circle splits when it has twice the split mass and the player is below the circle cap
#[inline]
pub fn can_split(mass: u32, circle_count: u32, config: &GameConfig) -> bool {
    circle_count < config.max_circles_per_player
        && mass >= config.min_mass_to_split.saturating_mul(2)
}

/// Mass of the newly split-off half (the splitting circle keeps the remainder)
#[inline]
pub fn split_half_mass(mass: u32) -> u32 {
    mass / 2
}

/// Opportunistic consumption needs consumed / consumer below the safe ratio
#[inline]
pub fn can_consume(consumer_mass: u32, consumed_mass: u32, config: &GameConfig) -> bool {
    if consumer_mass == 0 {
        return false;
    }
    (consumed_mass as f32 / consumer_mass as f32) < config.minimum_safe_mass_ratio
}

#[inline]
pub fn should_decay(mass: u32, config: &GameConfig) -> bool {
    mass > config.start_player_mass
}

/// One decay step: 1% loss, truncated
#[inline]
pub fn decayed_mass(mass: u32) -> u32 {
    (mass as f32 * DECAY_FACTOR) as u32
}
