//! Player commands
//!
//! Requests a connected player makes between ticks. Inputs are validated
//! here and rejected with the offending field; nothing is coerced.

use glam::Vec2;
use rand::Rng;

use super::lifecycle::{destroy_player_circles, spawn_player_circle};
use super::state::{IdAllocator, Mutation, Outcome, PlayerId, Snapshot};
use super::vector::Vector2Ext;
use crate::Timestamp;
use crate::config::GameConfig;
use crate::error::SimError;

/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 32;

fn validate_name(name: &str) -> Result<&str, SimError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SimError::invalid("name", "name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(SimError::invalid(
            "name",
            format!("name longer than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed)
}

/// Name the player and spawn their first circle
pub fn enter_game<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    player_id: PlayerId,
    name: &str,
    rng: &mut R,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    let name = validate_name(name)?;
    snapshot.require_player(player_id)?;

    let mut outcome = Outcome {
        mutations: vec![Mutation::SetPlayerName {
            player_id,
            name: name.to_string(),
        }],
        scheduled: Vec::new(),
    };
    outcome.extend(respawn(snapshot, player_id, rng, now, config)?);
    Ok(outcome)
}

/// Spawn a fresh starting circle for the player
pub fn respawn<R: Rng + ?Sized>(
    snapshot: &Snapshot,
    player_id: PlayerId,
    rng: &mut R,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    snapshot.require_player(player_id)?;
    let mut ids = IdAllocator::new(snapshot);
    let world_size = snapshot.world.size_f32();
    Ok(Outcome {
        mutations: spawn_player_circle(&mut ids, rng, player_id, world_size, now, config).to_vec(),
        scheduled: Vec::new(),
    })
}

/// Destroy all of the player's circles
pub fn suicide(snapshot: &Snapshot, player_id: PlayerId) -> Result<Outcome, SimError> {
    snapshot.require_player(player_id)?;
    Ok(Outcome {
        mutations: destroy_player_circles(snapshot, player_id),
        scheduled: Vec::new(),
    })
}

/// Remove the player's circles on disconnect
///
/// The player row itself is the host's to move or drop.
pub fn leave_arena(snapshot: &Snapshot, player_id: PlayerId) -> Result<Outcome, SimError> {
    suicide(snapshot, player_id)
}

/// Steer all of the player's circles
///
/// Direction is the normalized input, speed its length clamped to [0, 1].
pub fn update_player_input(
    snapshot: &Snapshot,
    player_id: PlayerId,
    direction: Vec2,
) -> Result<Outcome, SimError> {
    if !direction.is_valid() {
        return Err(SimError::invalid(
            "direction",
            format!("non-finite input direction {direction}"),
        ));
    }
    snapshot.require_player(player_id)?;

    let normalized = direction.normalize_or_zero();
    let speed = direction.length().clamp(0.0, 1.0);
    let mutations = snapshot
        .circles_of(player_id)
        .map(|c| Mutation::SetInput {
            entity_id: c.entity_id,
            direction: normalized,
            speed,
        })
        .collect();
    Ok(Outcome {
        mutations,
        scheduled: Vec::new(),
    })
}
