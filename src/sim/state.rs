//! World snapshot and the rows it is made of
//!
//! A `Snapshot` is the consistent view an entry point reads. Entry points
//! never mutate it; they return an `Outcome` of mutations and scheduled
//! events which the host applies and fires.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::mass_to_radius;
use super::vector::Vector2Ext;
use crate::Timestamp;
use crate::error::SimError;

pub type EntityId = u32;
pub type PlayerId = u32;

/// A physical body with position and mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: EntityId,
    pub position: Vec2,
    pub mass: u32,
}

impl Entity {
    pub fn new(entity_id: EntityId, position: Vec2, mass: u32) -> Self {
        Self {
            entity_id,
            position,
            mass,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        mass_to_radius(self.mass)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !self.position.is_valid() {
            return Err(SimError::invalid(
                "position",
                format!("entity {} has non-finite position {}", self.entity_id, self.position),
            ));
        }
        if self.mass == 0 {
            return Err(SimError::invalid(
                "mass",
                format!("entity {} has zero mass", self.entity_id),
            ));
        }
        Ok(())
    }
}

/// Player-controlled annotation on an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub entity_id: EntityId,
    pub player_id: PlayerId,
    /// Last normalized input direction
    pub direction: Vec2,
    /// Last input magnitude, 0..=1
    pub speed: f32,
    /// Most recent split affecting this circle (creation time by default)
    pub last_split_time: Timestamp,
}

impl Circle {
    /// Fresh circle facing up and standing still
    pub fn new(entity_id: EntityId, player_id: PlayerId, created_at: Timestamp) -> Self {
        Self {
            entity_id,
            player_id,
            direction: Vec2::Y,
            speed: 0.0,
            last_split_time: created_at,
        }
    }

    /// Movement input for this tick: direction scaled by speed
    #[inline]
    pub fn velocity_input(&self) -> Vec2 {
        self.direction * self.speed
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !self.direction.is_valid() {
            return Err(SimError::invalid(
                "direction",
                format!("circle {} has non-finite direction {}", self.entity_id, self.direction),
            ));
        }
        if !(0.0..=1.0).contains(&self.speed) {
            return Err(SimError::invalid(
                "speed",
                format!("circle {} speed {} outside [0, 1]", self.entity_id, self.speed),
            ));
        }
        Ok(())
    }
}

/// Food annotation; carries no data beyond its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub entity_id: EntityId,
}

/// Player identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// External identity assigned by the host
    pub identity: u128,
    pub player_id: PlayerId,
    /// Empty until the player enters the game
    pub name: String,
}

impl Player {
    pub fn new(identity: u128, player_id: PlayerId) -> Self {
        Self {
            identity,
            player_id,
            name: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.identity == 0 {
            return Err(SimError::invalid("identity", "identity cannot be zero"));
        }
        Ok(())
    }
}

/// World parameters row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub world_size: u64,
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.world_size == 0 {
            return Err(SimError::invalid("world_size", "world_size must be greater than 0"));
        }
        Ok(())
    }

    #[inline]
    pub fn size_f32(&self) -> f32 {
        self.world_size as f32
    }
}

/// State mutation requested by an entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    InsertEntity(Entity),
    InsertCircle(Circle),
    InsertFood(Food),
    SetPosition {
        entity_id: EntityId,
        position: Vec2,
    },
    SetMass {
        entity_id: EntityId,
        mass: u32,
    },
    SetLastSplitTime {
        entity_id: EntityId,
        at: Timestamp,
    },
    SetInput {
        entity_id: EntityId,
        direction: Vec2,
        speed: f32,
    },
    SetPlayerName {
        player_id: PlayerId,
        name: String,
    },
    DeleteFood(EntityId),
    DeleteCircle(EntityId),
    DeleteEntity(EntityId),
}

/// Follow-up work the host must fire back into the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledEvent {
    Recombine {
        player_id: PlayerId,
        fire_at: Timestamp,
    },
    Consume {
        consumer_entity_id: EntityId,
        consumed_entity_id: EntityId,
        fire_at: Timestamp,
    },
}

impl ScheduledEvent {
    #[inline]
    pub fn fire_at(&self) -> Timestamp {
        match *self {
            ScheduledEvent::Recombine { fire_at, .. } => fire_at,
            ScheduledEvent::Consume { fire_at, .. } => fire_at,
        }
    }
}

/// Result of one entry-point invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub mutations: Vec<Mutation>,
    pub scheduled: Vec<ScheduledEvent>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.scheduled.is_empty()
    }

    pub fn extend(&mut self, other: Outcome) {
        self.mutations.extend(other.mutations);
        self.scheduled.extend(other.scheduled);
    }
}

/// Consistent read of all simulation rows
///
/// Rows are keyed by id in ordered maps so every iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub world: WorldConfig,
    pub entities: BTreeMap<EntityId, Entity>,
    pub circles: BTreeMap<EntityId, Circle>,
    pub foods: BTreeMap<EntityId, Food>,
    pub players: BTreeMap<PlayerId, Player>,
    /// Next id handed out to a spawned entity
    next_entity_id: EntityId,
}

impl Snapshot {
    pub fn new(world: WorldConfig) -> Self {
        Self {
            world,
            entities: BTreeMap::new(),
            circles: BTreeMap::new(),
            foods: BTreeMap::new(),
            players: BTreeMap::new(),
            next_entity_id: 1,
        }
    }

    #[inline]
    pub fn next_entity_id(&self) -> EntityId {
        self.next_entity_id
    }

    #[inline]
    pub fn entity(&self, entity_id: EntityId) -> Option<&Entity> {
        self.entities.get(&entity_id)
    }

    #[inline]
    pub fn circle(&self, entity_id: EntityId) -> Option<&Circle> {
        self.circles.get(&entity_id)
    }

    #[inline]
    pub fn is_food(&self, entity_id: EntityId) -> bool {
        self.foods.contains_key(&entity_id)
    }

    #[inline]
    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    pub fn require_player(&self, player_id: PlayerId) -> Result<&Player, SimError> {
        self.player(player_id)
            .ok_or(SimError::MissingPlayer { player_id })
    }

    pub fn require_entity(&self, entity_id: EntityId) -> Result<&Entity, SimError> {
        self.entity(entity_id)
            .ok_or(SimError::MissingEntity { entity_id })
    }

    /// Circles of one player in entity-id order
    pub fn circles_of(&self, player_id: PlayerId) -> impl Iterator<Item = &Circle> {
        self.circles
            .values()
            .filter(move |c| c.player_id == player_id)
    }

    /// Circles of one player paired with their entities (circles without an entity are skipped)
    pub fn player_bodies(&self, player_id: PlayerId) -> Vec<(&Circle, &Entity)> {
        self.circles_of(player_id)
            .filter_map(|c| self.entity(c.entity_id).map(|e| (c, e)))
            .collect()
    }

    pub fn circle_count(&self, player_id: PlayerId) -> usize {
        self.circles_of(player_id).count()
    }

    #[inline]
    pub fn food_count(&self) -> usize {
        self.foods.len()
    }

    // --- Host-side construction (validated) ---

    pub fn insert_player(&mut self, player: Player) -> Result<(), SimError> {
        player.validate()?;
        self.players.insert(player.player_id, player);
        Ok(())
    }

    pub fn insert_entity(&mut self, entity: Entity) -> Result<(), SimError> {
        entity.validate()?;
        self.next_entity_id = self.next_entity_id.max(entity.entity_id.saturating_add(1));
        self.entities.insert(entity.entity_id, entity);
        Ok(())
    }

    /// Insert a circle; its entity must already exist
    pub fn insert_circle(&mut self, circle: Circle) -> Result<(), SimError> {
        circle.validate()?;
        self.require_entity(circle.entity_id)?;
        self.circles.insert(circle.entity_id, circle);
        Ok(())
    }

    /// Insert a food annotation; its entity must already exist
    pub fn insert_food(&mut self, food: Food) -> Result<(), SimError> {
        self.require_entity(food.entity_id)?;
        self.foods.insert(food.entity_id, food);
        Ok(())
    }

    /// Remove a player row; their circles are left to the caller
    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Player> {
        self.players.remove(&player_id)
    }

    /// Apply one mutation. Targets that no longer exist are ignored.
    ///
    /// Returns whether the mutation changed anything.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::InsertEntity(entity) => {
                self.next_entity_id = self.next_entity_id.max(entity.entity_id.saturating_add(1));
                self.entities.insert(entity.entity_id, entity);
                true
            }
            Mutation::InsertCircle(circle) => {
                if !self.entities.contains_key(&circle.entity_id) {
                    return false;
                }
                self.circles.insert(circle.entity_id, circle);
                true
            }
            Mutation::InsertFood(food) => {
                if !self.entities.contains_key(&food.entity_id) {
                    return false;
                }
                self.foods.insert(food.entity_id, food);
                true
            }
            Mutation::SetPosition {
                entity_id,
                position,
            } => match self.entities.get_mut(&entity_id) {
                Some(entity) => {
                    entity.position = position;
                    true
                }
                None => false,
            },
            Mutation::SetMass { entity_id, mass } => match self.entities.get_mut(&entity_id) {
                Some(entity) => {
                    entity.mass = mass;
                    true
                }
                None => false,
            },
            Mutation::SetLastSplitTime { entity_id, at } => {
                match self.circles.get_mut(&entity_id) {
                    Some(circle) => {
                        circle.last_split_time = at;
                        true
                    }
                    None => false,
                }
            }
            Mutation::SetInput {
                entity_id,
                direction,
                speed,
            } => match self.circles.get_mut(&entity_id) {
                Some(circle) => {
                    circle.direction = direction;
                    circle.speed = speed;
                    true
                }
                None => false,
            },
            Mutation::SetPlayerName { player_id, name } => {
                match self.players.get_mut(&player_id) {
                    Some(player) => {
                        player.name = name;
                        true
                    }
                    None => false,
                }
            }
            Mutation::DeleteFood(entity_id) => self.foods.remove(&entity_id).is_some(),
            Mutation::DeleteCircle(entity_id) => self.circles.remove(&entity_id).is_some(),
            Mutation::DeleteEntity(entity_id) => self.entities.remove(&entity_id).is_some(),
        }
    }

    /// Apply every mutation of an outcome in order, returning how many took effect
    pub fn apply_all(&mut self, mutations: impl IntoIterator<Item = Mutation>) -> usize {
        mutations
            .into_iter()
            .map(|m| self.apply(m))
            .filter(|applied| *applied)
            .count()
    }
}

/// Hands out consecutive entity ids within one invocation
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: EntityId,
}

impl IdAllocator {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self {
            next: snapshot.next_entity_id(),
        }
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }
}
