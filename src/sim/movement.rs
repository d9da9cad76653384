//! Per-tick position integration
//!
//! Every new position is computed from the pre-tick snapshot, so the order
//! circles are visited in never changes the result.

use std::collections::BTreeMap;

use glam::Vec2;

use super::collision::clamp_position_to_world;
use super::forces::accumulate_player_forces;
use super::physics::mass_to_max_move_speed;
use super::state::{Entity, EntityId, PlayerId, Snapshot};
use crate::Timestamp;
use crate::config::GameConfig;

/// Stored direction × speed of every circle that has an entity
pub fn base_movement_vectors(snapshot: &Snapshot) -> BTreeMap<EntityId, Vec2> {
    snapshot
        .circles
        .values()
        .filter(|c| snapshot.entity(c.entity_id).is_some())
        .map(|c| (c.entity_id, c.velocity_input()))
        .collect()
}

/// Base vectors plus split-circle forces for every player with two or more circles
pub fn resolve_movement_vectors(
    snapshot: &Snapshot,
    now: Timestamp,
    config: &GameConfig,
) -> BTreeMap<EntityId, Vec2> {
    let mut movement = base_movement_vectors(snapshot);

    let mut owners: Vec<PlayerId> = snapshot.circles.values().map(|c| c.player_id).collect();
    owners.sort_unstable();
    owners.dedup();

    for player_id in owners {
        let bodies = snapshot.player_bodies(player_id);
        accumulate_player_forces(&bodies, &mut movement, now, config);
    }
    movement
}

/// New clamped position of one body moved by `velocity` for `dt` seconds
pub fn update_circle_position(
    entity: &Entity,
    velocity: Vec2,
    dt: f32,
    world_size: f32,
    config: &GameConfig,
) -> Vec2 {
    let speed = mass_to_max_move_speed(entity.mass, config);
    let target = entity.position + velocity * speed * dt;
    clamp_position_to_world(target, entity.radius(), world_size)
}

/// New position of every moving circle, keyed by entity id
///
/// Reads only the snapshot; results are applied by the caller afterwards.
pub fn integrate_positions(
    snapshot: &Snapshot,
    movement: &BTreeMap<EntityId, Vec2>,
    dt: f32,
    config: &GameConfig,
) -> BTreeMap<EntityId, Vec2> {
    let world_size = snapshot.world.size_f32();
    movement
        .iter()
        .filter_map(|(&entity_id, &velocity)| {
            let entity = snapshot.entity(entity_id)?;
            let position = update_circle_position(entity, velocity, dt, world_size, config);
            Some((entity_id, position))
        })
        .collect()
}
