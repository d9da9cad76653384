//! Debug introspection
//!
//! Read-only summaries for tooling and logs. Nothing in the simulation reads
//! these back.

use glam::Vec2;
use serde::Serialize;

use super::collision::{Bounds, entity_bounds};
use super::physics::{mass_to_max_move_speed, mass_to_radius};
use super::state::{Circle, Entity, EntityId, PlayerId, Snapshot};
use crate::Timestamp;
use crate::config::GameConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDebugInfo {
    pub entity_id: EntityId,
    pub position: Vec2,
    pub mass: u32,
    pub radius: f32,
    pub max_speed: f32,
    pub bounds: Bounds,
}

impl EntityDebugInfo {
    pub fn new(entity: &Entity, config: &GameConfig) -> Self {
        Self {
            entity_id: entity.entity_id,
            position: entity.position,
            mass: entity.mass,
            radius: mass_to_radius(entity.mass),
            max_speed: mass_to_max_move_speed(entity.mass, config),
            bounds: entity_bounds(entity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleDebugInfo {
    pub entity_id: EntityId,
    pub player_id: PlayerId,
    pub direction: Vec2,
    pub speed: f32,
    pub last_split_time: Timestamp,
}

impl From<&Circle> for CircleDebugInfo {
    fn from(circle: &Circle) -> Self {
        Self {
            entity_id: circle.entity_id,
            player_id: circle.player_id,
            direction: circle.direction,
            speed: circle.speed,
            last_split_time: circle.last_split_time,
        }
    }
}

/// Whole-world counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldDebugInfo {
    pub world_size: u64,
    pub player_count: usize,
    pub entity_count: usize,
    pub circle_count: usize,
    pub food_count: usize,
    pub total_mass: u64,
    /// Zero when there are no entities
    pub avg_mass: f32,
    /// Heaviest player by summed circle mass
    pub leader: Option<PlayerId>,
}

impl WorldDebugInfo {
    pub fn new(snapshot: &Snapshot) -> Self {
        let total_mass: u64 = snapshot.entities.values().map(|e| u64::from(e.mass)).sum();
        let entity_count = snapshot.entities.len();
        let avg_mass = if entity_count == 0 {
            0.0
        } else {
            total_mass as f32 / entity_count as f32
        };

        let leader = snapshot
            .players
            .keys()
            .map(|&id| {
                let mass: u64 = snapshot
                    .player_bodies(id)
                    .iter()
                    .map(|(_, e)| u64::from(e.mass))
                    .sum();
                (id, mass)
            })
            .filter(|&(_, mass)| mass > 0)
            // Ties go to the lower id
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(id, _)| id);

        Self {
            world_size: snapshot.world.world_size,
            player_count: snapshot.players.len(),
            entity_count,
            circle_count: snapshot.circles.len(),
            food_count: snapshot.food_count(),
            total_mass,
            avg_mass,
            leader,
        }
    }
}
