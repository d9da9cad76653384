//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Explicit `now` only, never a wall clock
//! - Seeded RNG only, supplied by the host
//! - Stable iteration order (by entity ID)
//! - Reads a snapshot, returns mutations; never writes state itself

pub mod collision;
pub mod commands;
pub mod debug;
pub mod forces;
pub mod lifecycle;
pub mod movement;
pub mod physics;
pub mod state;
pub mod tick;
pub mod vector;

pub use collision::{
    Bounds, clamp_position_to_world, entity_bounds, fast_collision_filter, is_overlapping,
};
pub use commands::{enter_game, leave_arena, respawn, suicide, update_player_input};
pub use debug::{CircleDebugInfo, EntityDebugInfo, WorldDebugInfo};
pub use forces::{gravity_pull, separation_force};
pub use lifecycle::{center_of_mass, destroy_entity_mutations, validate_entity_position};
pub use movement::update_circle_position;
pub use physics::{can_consume, can_split, mass_to_max_move_speed, mass_to_radius};
pub use state::{
    Circle, Entity, EntityId, Food, IdAllocator, Mutation, Outcome, Player, PlayerId,
    ScheduledEvent, Snapshot, WorldConfig,
};
pub use tick::{
    TickKind, circle_recombine, consume_entity, decay_circles, fire_event, move_all_circles,
    player_split, spawn_food, tick,
};
pub use vector::Vector2Ext;
