//! Simulation entry points
//!
//! Periodic ticks (move, spawn food, decay) and the handlers for scheduled
//! events (split, recombine, consume). Each reads one consistent snapshot
//! and returns an `Outcome` for the host to commit.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::overlapping_entities;
use super::lifecycle::{consume, decay_masses, recombine_circles, spawn_food_entity, split_circles};
use super::movement::{integrate_positions, resolve_movement_vectors};
use super::physics::can_consume;
use super::state::{
    Circle, Entity, EntityId, IdAllocator, Mutation, Outcome, PlayerId, ScheduledEvent, Snapshot,
};
use crate::Timestamp;
use crate::config::GameConfig;
use crate::error::SimError;

/// Periodic ticks the host runs on fixed intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickKind {
    MoveAllCircles,
    SpawnFood,
    DecayCircles,
}

/// Run one periodic tick
pub fn tick<R: Rng + ?Sized>(
    kind: TickKind,
    snapshot: &Snapshot,
    rng: &mut R,
    now: Timestamp,
    config: &GameConfig,
) -> Outcome {
    match kind {
        TickKind::MoveAllCircles => move_all_circles(snapshot, now, config),
        TickKind::SpawnFood => spawn_food(snapshot, rng, config),
        TickKind::DecayCircles => decay_circles(snapshot, config),
    }
}

/// Route a scheduled event back to its handler
pub fn fire_event(
    event: ScheduledEvent,
    snapshot: &Snapshot,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    match event {
        ScheduledEvent::Recombine { player_id, .. } => {
            circle_recombine(snapshot, player_id, now, config)
        }
        ScheduledEvent::Consume {
            consumer_entity_id,
            consumed_entity_id,
            ..
        } => consume_entity(snapshot, consumer_entity_id, consumed_entity_id),
    }
}

// === Periodic ticks ===

/// Move every circle, then schedule consumes for the overlaps that result
///
/// 1. base vectors from stored input
/// 2. split forces per player
/// 3. integrate against the pre-tick snapshot
/// 4. detect overlaps at the new positions and schedule `Consume` events
pub fn move_all_circles(snapshot: &Snapshot, now: Timestamp, config: &GameConfig) -> Outcome {
    let movement = resolve_movement_vectors(snapshot, now, config);
    let positions = integrate_positions(snapshot, &movement, config.move_dt(), config);

    let mut outcome = Outcome::default();
    for (&entity_id, &position) in &positions {
        let moved = snapshot
            .entity(entity_id)
            .is_some_and(|e| e.position != position);
        if moved {
            outcome.mutations.push(Mutation::SetPosition {
                entity_id,
                position,
            });
        }
    }

    outcome.scheduled = detect_consumes(snapshot, &positions, now, config);

    log::debug!(
        "move tick: {} circles, {} moved, {} consumes scheduled",
        positions.len(),
        outcome.mutations.len(),
        outcome.scheduled.len()
    );
    outcome
}

/// Top food back up to the target count while anyone is connected
pub fn spawn_food<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    rng: &mut R,
    config: &GameConfig,
) -> Outcome {
    let mut outcome = Outcome::default();
    if snapshot.players.is_empty() {
        return outcome;
    }

    let target = config.target_food_count as usize;
    let missing = target.saturating_sub(snapshot.food_count());
    let mut ids = IdAllocator::new(snapshot);
    let world_size = snapshot.world.size_f32();
    for _ in 0..missing {
        outcome
            .mutations
            .extend(spawn_food_entity(&mut ids, rng, world_size, config));
    }

    if missing > 0 {
        log::debug!("spawned {missing} food (target {target})");
    }
    outcome
}

/// Shrink every circle above the starting mass by one step
pub fn decay_circles(snapshot: &Snapshot, config: &GameConfig) -> Outcome {
    let mutations = decay_masses(snapshot, config);
    log::trace!("decay tick: {} circles shrunk", mutations.len());
    Outcome {
        mutations,
        scheduled: Vec::new(),
    }
}

// === Event handlers ===

/// Split every eligible circle of the player
pub fn player_split(
    snapshot: &Snapshot,
    player_id: PlayerId,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    let mut ids = IdAllocator::new(snapshot);
    let outcome = split_circles(snapshot, player_id, &mut ids, now, config)?;
    if !outcome.is_empty() {
        log::debug!(
            "player {player_id} split into {} circles",
            snapshot.circle_count(player_id)
                + outcome
                    .mutations
                    .iter()
                    .filter(|m| matches!(m, Mutation::InsertCircle(_)))
                    .count()
        );
    }
    Ok(outcome)
}

/// Schedule the merge of the player's recombine-ready circles
pub fn circle_recombine(
    snapshot: &Snapshot,
    player_id: PlayerId,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    recombine_circles(snapshot, player_id, now, config)
}

/// Absorb one entity into another
pub fn consume_entity(
    snapshot: &Snapshot,
    consumer_entity_id: EntityId,
    consumed_entity_id: EntityId,
) -> Result<Outcome, SimError> {
    let mutations = consume(snapshot, consumer_entity_id, consumed_entity_id)?;
    Ok(Outcome {
        mutations,
        scheduled: Vec::new(),
    })
}

// === Collision scheduling ===

/// Whether a circle may absorb `other` on contact
///
/// Own circles never; other players' circles only below the safe mass
/// ratio; food and any other body always.
fn is_consumable(
    snapshot: &Snapshot,
    consumer_circle: &Circle,
    consumer: &Entity,
    other: &Entity,
    config: &GameConfig,
) -> bool {
    match snapshot.circle(other.entity_id) {
        Some(c) if c.player_id == consumer_circle.player_id => false,
        Some(_) => can_consume(consumer.mass, other.mass, config),
        None => true,
    }
}

/// Consumes triggered by overlaps at the post-move positions
///
/// Circles are visited in id order. An entity is scheduled for consumption
/// at most once, and an entity already claimed does not consume in turn.
fn detect_consumes(
    snapshot: &Snapshot,
    positions: &BTreeMap<EntityId, Vec2>,
    now: Timestamp,
    config: &GameConfig,
) -> Vec<ScheduledEvent> {
    let bodies: Vec<Entity> = snapshot
        .entities
        .values()
        .map(|e| match positions.get(&e.entity_id) {
            Some(&position) => Entity::new(e.entity_id, position, e.mass),
            None => e.clone(),
        })
        .collect();
    let by_id: BTreeMap<EntityId, &Entity> = bodies.iter().map(|e| (e.entity_id, e)).collect();

    let mut claimed: BTreeSet<EntityId> = BTreeSet::new();
    let mut scheduled = Vec::new();
    for circle in snapshot.circles.values() {
        let Some(&consumer) = by_id.get(&circle.entity_id) else {
            continue;
        };
        if claimed.contains(&consumer.entity_id) {
            continue;
        }
        for other in overlapping_entities(consumer, bodies.iter(), config) {
            if claimed.contains(&other.entity_id)
                || !is_consumable(snapshot, circle, consumer, other, config)
            {
                continue;
            }
            claimed.insert(other.entity_id);
            scheduled.push(ScheduledEvent::Consume {
                consumer_entity_id: consumer.entity_id,
                consumed_entity_id: other.entity_id,
                fire_at: now,
            });
        }
    }
    scheduled
}
