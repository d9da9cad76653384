//! Forces between circles of the same player
//!
//! Split circles push apart while they overlap too much, and pull back
//! together during the window before their scheduled recombine. Forces are
//! per-pair displacement contributions added to the movement input.

use std::collections::BTreeMap;

use glam::Vec2;

use super::physics::mass_to_radius;
use super::state::{Circle, Entity, EntityId};
use crate::Timestamp;
use crate::config::GameConfig;

/// Below this squared distance the pair is treated as unit-separated along +x
const COINCIDENT_DISTANCE_SQ: f32 = 0.0001;

/// Direction from `b` to `a` and its squared length, with coincident centres
/// resolved to a fixed unit axis
#[inline]
fn separation_axis(a: &Entity, b: &Entity) -> (Vec2, f32) {
    let diff = a.position - b.position;
    let distance_sq = diff.length_squared();
    if distance_sq <= COINCIDENT_DISTANCE_SQ {
        (Vec2::X, 1.0)
    } else {
        (diff, distance_sq)
    }
}

/// Attraction on `a` towards `b` during the pre-recombine window
///
/// Zero before the window opens and while the pair already touches. The
/// strength ramps linearly from 0 when the window opens to 1 at the
/// recombine moment, and is shared out over `circle_count` circles.
pub fn gravity_pull(
    a: &Entity,
    b: &Entity,
    time_since_split: f32,
    circle_count: usize,
    config: &GameConfig,
) -> Vec2 {
    let window = config.split_grav_pull_before_recombine_sec;
    let time_remaining = (config.split_recombine_delay_sec - time_since_split).max(0.0);
    if time_remaining > window || circle_count == 0 {
        return Vec2::ZERO;
    }

    let (diff, distance_sq) = separation_axis(a, b);
    let radius_sum = mass_to_radius(a.mass) + mass_to_radius(b.mass);
    if distance_sq <= radius_sum * radius_sum {
        return Vec2::ZERO;
    }

    let gravity_multiplier = if window > 0.0 {
        1.0 - time_remaining / window
    } else {
        1.0
    };
    let distance = distance_sq.sqrt();
    // radius_sum - distance is negative here, so the force points from a to b
    diff.normalize_or_zero() * (radius_sum - distance) * gravity_multiplier
        * config.self_collision_speed
        / circle_count as f32
}

/// Repulsion on `a` away from `b` while they overlap more than allowed
pub fn separation_force(a: &Entity, b: &Entity, config: &GameConfig) -> Vec2 {
    let (diff, distance_sq) = separation_axis(a, b);
    let radius_sum = mass_to_radius(a.mass) + mass_to_radius(b.mass);
    let allowed = radius_sum * config.allowed_split_circle_overlap_pct;
    if distance_sq >= allowed * allowed {
        return Vec2::ZERO;
    }
    let distance = distance_sq.sqrt();
    diff.normalize_or_zero() * (radius_sum - distance) * config.self_collision_speed
}

/// Combined pair force: half goes to `a`, the negated half to `b`
pub fn pair_forces(
    a: (&Circle, &Entity),
    b: (&Circle, &Entity),
    circle_count: usize,
    now: Timestamp,
    config: &GameConfig,
) -> (Vec2, Vec2) {
    let last_split = a.0.last_split_time.max(b.0.last_split_time);
    let time_since_split = now.secs_since(last_split);
    let total = gravity_pull(a.1, b.1, time_since_split, circle_count, config)
        + separation_force(a.1, b.1, config);
    let half = total / 2.0;
    (half, -half)
}

/// Accumulate pair forces for one player's circles into `movement`
///
/// `bodies` must be in a stable order (entity id). Players with fewer than
/// two circles get nothing.
pub fn accumulate_player_forces(
    bodies: &[(&Circle, &Entity)],
    movement: &mut BTreeMap<EntityId, Vec2>,
    now: Timestamp,
    config: &GameConfig,
) {
    let count = bodies.len();
    if count < 2 {
        return;
    }
    for (i, &a) in bodies.iter().enumerate() {
        for &b in &bodies[i + 1..] {
            let (force_a, force_b) = pair_forces(a, b, count, now, config);
            if let Some(v) = movement.get_mut(&a.1.entity_id) {
                *v += force_a;
            }
            if let Some(v) = movement.get_mut(&b.1.entity_id) {
                *v += force_b;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: u32, x: f32, y: f32, mass: u32) -> Entity {
        Entity::new(id, Vec2::new(x, y), mass)
    }

    #[test]
    fn test_no_gravity_before_window() {
        let config = GameConfig::default();
        let a = body(1, 100.0, 100.0, 30);
        let b = body(2, 200.0, 100.0, 30);
        // 5s delay, 2s window: at t=1s, 4s remain
        assert_eq!(gravity_pull(&a, &b, 1.0, 2, &config), Vec2::ZERO);
    }

    #[test]
    fn test_gravity_pulls_together_inside_window() {
        let config = GameConfig::default();
        let a = body(1, 100.0, 100.0, 25);
        let b = body(2, 200.0, 100.0, 25);
        // At t=5s the multiplier is 1: |10 - 100| * 1 * 0.05 / 2, towards b
        let pull = gravity_pull(&a, &b, 5.0, 2, &config);
        assert!((pull.x - 2.25).abs() < 1e-4);
        assert!(pull.y.abs() < 1e-6);

        // Halfway through the window the pull is halved
        let half = gravity_pull(&a, &b, 4.0, 2, &config);
        assert!((half.x - 1.125).abs() < 1e-4);
    }

    #[test]
    fn test_gravity_stops_once_touching() {
        let config = GameConfig::default();
        let a = body(1, 100.0, 100.0, 25);
        let b = body(2, 109.0, 100.0, 25);
        assert_eq!(gravity_pull(&a, &b, 10.0, 2, &config), Vec2::ZERO);
    }

    #[test]
    fn test_separation_pushes_apart() {
        let config = GameConfig::default();
        let a = body(1, 100.0, 100.0, 25);
        let b = body(2, 104.0, 100.0, 25);
        // Allowed distance 9, actual 4: (10 - 4) * 0.05 pointing -x for a
        let push = separation_force(&a, &b, &config);
        assert!((push.x - (-0.3)).abs() < 1e-5);

        let apart = body(3, 110.0, 100.0, 25);
        assert_eq!(separation_force(&a, &apart, &config), Vec2::ZERO);
    }

    #[test]
    fn test_coincident_circles_use_fixed_axis() {
        let config = GameConfig::default();
        let a = body(1, 100.0, 100.0, 25);
        let b = body(2, 100.0, 100.0, 25);
        let push = separation_force(&a, &b, &config);
        assert!(push.is_finite());
        assert!(push.x > 0.0);
        assert_eq!(push.y, 0.0);
    }

    #[test]
    fn test_pair_forces_are_equal_and_opposite() {
        let config = GameConfig::default();
        let ca = Circle::new(1, 7, Timestamp::ZERO);
        let cb = Circle::new(2, 7, Timestamp::ZERO);
        let a = body(1, 100.0, 100.0, 25);
        let b = body(2, 103.0, 104.0, 25);
        let (fa, fb) = pair_forces((&ca, &a), (&cb, &b), 2, Timestamp::ZERO, &config);
        assert_eq!(fa, -fb);
        assert!(fa.length() > 0.0);
    }

    #[test]
    fn test_pair_uses_latest_split_time() {
        let config = GameConfig::default();
        let ca = Circle::new(1, 7, Timestamp::ZERO);
        let mut cb = Circle::new(2, 7, Timestamp::ZERO);
        cb.last_split_time = Timestamp::from_secs_f32(4.0);
        let a = body(1, 100.0, 100.0, 25);
        let b = body(2, 200.0, 100.0, 25);
        // 5s after the first split but only 1s after the latest one
        let (fa, _) = pair_forces((&ca, &a), (&cb, &b), 2, Timestamp::from_secs_f32(5.0), &config);
        assert_eq!(fa, Vec2::ZERO);
    }

    #[test]
    fn test_single_circle_gets_no_forces() {
        let config = GameConfig::default();
        let c = Circle::new(1, 7, Timestamp::ZERO);
        let e = body(1, 100.0, 100.0, 25);
        let mut movement = BTreeMap::from([(1, Vec2::new(0.5, 0.0))]);
        accumulate_player_forces(&[(&c, &e)], &mut movement, Timestamp::ZERO, &config);
        assert_eq!(movement[&1], Vec2::new(0.5, 0.0));
    }
}
