//! Entity lifecycle and mass transfer
//!
//! Spawning, splitting, recombining, consuming, decaying and destroying.
//! Functions here read the snapshot and return mutations; nothing is applied
//! in place.

use glam::Vec2;
use rand::Rng;

use super::physics::{
    can_split, decayed_mass, mass_to_radius, should_decay, split_half_mass,
};
use super::state::{
    Circle, Entity, EntityId, Food, IdAllocator, Mutation, Outcome, PlayerId, ScheduledEvent,
    Snapshot,
};
use super::vector::Vector2Ext;
use crate::Timestamp;
use crate::config::GameConfig;
use crate::error::SimError;

// === Random helpers ===

/// Uniform float in [min, max); `min` when the range is empty or not finite
pub fn range_f32<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if !(max - min).is_finite() || max <= min {
        return min;
    }
    rng.random_range(min..max)
}

/// Uniform integer in [min, max]; `min` when the range is empty
pub fn range_u32<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    rng.random_range(min..=max)
}

/// Random position keeping a body of `radius` fully inside the world
pub fn random_position<R: Rng + ?Sized>(rng: &mut R, radius: f32, world_size: f32) -> Vec2 {
    let x = range_f32(rng, radius, world_size - radius);
    let y = range_f32(rng, radius, world_size - radius);
    Vec2::new(x, y)
}

// === Spawning ===

/// Entity and circle rows for a new circle facing up at rest
pub fn spawn_circle_at(
    ids: &mut IdAllocator,
    player_id: PlayerId,
    mass: u32,
    position: Vec2,
    now: Timestamp,
) -> (Entity, Circle) {
    let entity_id = ids.next_id();
    (
        Entity::new(entity_id, position, mass),
        Circle::new(entity_id, player_id, now),
    )
}

/// A player's starting circle at a random position
pub fn spawn_player_circle<R: Rng + ?Sized>(
    ids: &mut IdAllocator,
    rng: &mut R,
    player_id: PlayerId,
    world_size: f32,
    now: Timestamp,
    config: &GameConfig,
) -> [Mutation; 2] {
    let mass = config.start_player_mass;
    let position = random_position(rng, mass_to_radius(mass), world_size);
    let (entity, circle) = spawn_circle_at(ids, player_id, mass, position, now);
    [Mutation::InsertEntity(entity), Mutation::InsertCircle(circle)]
}

/// One food pellet of random mass at a random position
pub fn spawn_food_entity<R: Rng + ?Sized>(
    ids: &mut IdAllocator,
    rng: &mut R,
    world_size: f32,
    config: &GameConfig,
) -> [Mutation; 2] {
    let mass = range_u32(rng, config.food_mass_min, config.food_mass_max);
    let position = random_position(rng, mass_to_radius(mass), world_size);
    let entity_id = ids.next_id();
    [
        Mutation::InsertEntity(Entity::new(entity_id, position, mass)),
        Mutation::InsertFood(Food { entity_id }),
    ]
}

// === Destruction ===

/// Dependents first, entity last
#[inline]
pub fn destroy_entity_mutations(entity_id: EntityId) -> [Mutation; 3] {
    [
        Mutation::DeleteFood(entity_id),
        Mutation::DeleteCircle(entity_id),
        Mutation::DeleteEntity(entity_id),
    ]
}

/// Destroy every circle the player owns
pub fn destroy_player_circles(snapshot: &Snapshot, player_id: PlayerId) -> Vec<Mutation> {
    snapshot
        .circles_of(player_id)
        .flat_map(|c| destroy_entity_mutations(c.entity_id))
        .collect()
}

// === Split / recombine ===

/// Split every eligible circle of a player in id order
///
/// Stops once the player reaches the circle cap. A recombine is scheduled
/// only when at least one circle actually split.
pub fn split_circles(
    snapshot: &Snapshot,
    player_id: PlayerId,
    ids: &mut IdAllocator,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    snapshot.require_player(player_id)?;

    let bodies = snapshot.player_bodies(player_id);
    let mut circle_count = u32::try_from(bodies.len()).unwrap_or(u32::MAX);
    let mut outcome = Outcome::default();
    if circle_count >= config.max_circles_per_player {
        return Ok(outcome);
    }

    for (circle, entity) in bodies {
        if !can_split(entity.mass, circle_count, config) {
            continue;
        }
        let half = split_half_mass(entity.mass);
        let position = entity.position + circle.direction;
        let (new_entity, new_circle) = spawn_circle_at(ids, player_id, half, position, now);

        outcome.mutations.extend([
            Mutation::InsertEntity(new_entity),
            Mutation::InsertCircle(new_circle),
            Mutation::SetMass {
                entity_id: entity.entity_id,
                mass: entity.mass - half,
            },
            Mutation::SetLastSplitTime {
                entity_id: circle.entity_id,
                at: now,
            },
        ]);

        circle_count += 1;
        if circle_count >= config.max_circles_per_player {
            break;
        }
    }

    if !outcome.mutations.is_empty() {
        outcome.scheduled.push(ScheduledEvent::Recombine {
            player_id,
            fire_at: now + config.recombine_delay(),
        });
    }
    Ok(outcome)
}

/// The recombine timer for this circle has elapsed
#[inline]
pub fn should_recombine(last_split_time: Timestamp, now: Timestamp, config: &GameConfig) -> bool {
    now.saturating_since(last_split_time) >= config.recombine_delay()
}

/// Schedule merging of every recombine-ready circle into the lowest-id one
pub fn recombine_circles(
    snapshot: &Snapshot,
    player_id: PlayerId,
    now: Timestamp,
    config: &GameConfig,
) -> Result<Outcome, SimError> {
    snapshot.require_player(player_id)?;

    let ready: Vec<EntityId> = snapshot
        .circles_of(player_id)
        .filter(|c| should_recombine(c.last_split_time, now, config))
        .map(|c| c.entity_id)
        .collect();

    let mut outcome = Outcome::default();
    let Some((&base, others)) = ready.split_first() else {
        return Ok(outcome);
    };
    outcome
        .scheduled
        .extend(others.iter().map(|&other| ScheduledEvent::Consume {
            consumer_entity_id: base,
            consumed_entity_id: other,
            fire_at: now,
        }));
    Ok(outcome)
}

// === Consume / decay ===

/// Move the consumed entity's mass into the consumer and destroy it
///
/// No ratio check: callers decide eligibility before scheduling.
pub fn consume(
    snapshot: &Snapshot,
    consumer_entity_id: EntityId,
    consumed_entity_id: EntityId,
) -> Result<Vec<Mutation>, SimError> {
    if consumer_entity_id == consumed_entity_id {
        return Err(SimError::invalid(
            "consumed_entity_id",
            format!("entity {consumer_entity_id} cannot consume itself"),
        ));
    }
    let consumed = snapshot.require_entity(consumed_entity_id)?;
    let consumer = snapshot.require_entity(consumer_entity_id)?;

    let mut mutations = vec![Mutation::SetMass {
        entity_id: consumer.entity_id,
        mass: consumer.mass.saturating_add(consumed.mass),
    }];
    mutations.extend(destroy_entity_mutations(consumed.entity_id));
    Ok(mutations)
}

/// One decay step for every circle above the starting mass
pub fn decay_masses(snapshot: &Snapshot, config: &GameConfig) -> Vec<Mutation> {
    snapshot
        .circles
        .keys()
        .filter_map(|&id| snapshot.entity(id))
        .filter(|e| should_decay(e.mass, config))
        .map(|e| Mutation::SetMass {
            entity_id: e.entity_id,
            mass: decayed_mass(e.mass),
        })
        .collect()
}

// === Queries ===

/// Mass-weighted mean position; zero for no entities or zero total mass
pub fn center_of_mass<'a, I>(entities: I) -> Vec2
where
    I: IntoIterator<Item = &'a Entity>,
{
    let (weighted, total) = entities
        .into_iter()
        .fold((Vec2::ZERO, 0u64), |(sum, total), e| {
            (sum + e.position * e.mass as f32, total + u64::from(e.mass))
        });
    weighted.safe_div(total as f32)
}

/// Finite position with the whole body inside the world
pub fn validate_entity_position(entity: &Entity, world_size: u64) -> Result<(), SimError> {
    let p = entity.position;
    if !p.is_valid() {
        return Err(SimError::invalid(
            "position",
            format!("entity {} has invalid position {}", entity.entity_id, p),
        ));
    }
    let radius = entity.radius();
    let world = world_size as f32;
    if p.x - radius < 0.0 || p.x + radius > world {
        return Err(SimError::invalid(
            "position",
            format!(
                "entity {} x {} out of bounds (radius {}, world {})",
                entity.entity_id, p.x, radius, world
            ),
        ));
    }
    if p.y - radius < 0.0 || p.y + radius > world {
        return Err(SimError::invalid(
            "position",
            format!(
                "entity {} y {} out of bounds (radius {}, world {})",
                entity.entity_id, p.y, radius, world
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Player, WorldConfig};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn world_with_player(player_id: PlayerId) -> Snapshot {
        let mut snapshot = Snapshot::new(WorldConfig { world_size: 1000 });
        snapshot
            .insert_player(Player::new(u128::from(player_id) + 100, player_id))
            .unwrap();
        snapshot
    }

    fn add_circle(snapshot: &mut Snapshot, id: EntityId, player_id: PlayerId, mass: u32, at: Timestamp) {
        snapshot
            .insert_entity(Entity::new(id, Vec2::new(500.0, 500.0), mass))
            .unwrap();
        snapshot.insert_circle(Circle::new(id, player_id, at)).unwrap();
    }

    #[test]
    fn test_range_helpers_handle_empty_ranges() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(range_f32(&mut rng, 5.0, 5.0), 5.0);
        assert_eq!(range_f32(&mut rng, 6.0, 5.0), 6.0);
        assert_eq!(range_f32(&mut rng, 0.0, f32::NAN), 0.0);
        assert_eq!(range_u32(&mut rng, 3, 3), 3);
        for _ in 0..100 {
            let v = range_u32(&mut rng, 2, 4);
            assert!((2..=4).contains(&v));
        }
    }

    #[test]
    fn test_spawn_player_circle_inside_world() {
        let config = GameConfig::default();
        let snapshot = world_with_player(1);
        let mut ids = IdAllocator::new(&snapshot);
        let mut rng = Pcg32::seed_from_u64(7);
        let now = Timestamp::from_micros(42);

        let [insert_entity, insert_circle] =
            spawn_player_circle(&mut ids, &mut rng, 1, 1000.0, now, &config);
        let Mutation::InsertEntity(entity) = insert_entity else {
            panic!("expected entity insert");
        };
        let Mutation::InsertCircle(circle) = insert_circle else {
            panic!("expected circle insert");
        };
        assert_eq!(entity.mass, 15);
        assert_eq!(circle.entity_id, entity.entity_id);
        assert_eq!(circle.direction, Vec2::Y);
        assert_eq!(circle.speed, 0.0);
        assert_eq!(circle.last_split_time, now);
        validate_entity_position(&entity, 1000).unwrap();
    }

    #[test]
    fn test_spawn_food_mass_in_range() {
        let config = GameConfig::default();
        let snapshot = world_with_player(1);
        let mut ids = IdAllocator::new(&snapshot);
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..50 {
            let [Mutation::InsertEntity(entity), Mutation::InsertFood(food)] =
                spawn_food_entity(&mut ids, &mut rng, 1000.0, &config)
            else {
                panic!("unexpected food mutations");
            };
            assert!((2..=4).contains(&entity.mass));
            assert_eq!(food.entity_id, entity.entity_id);
            validate_entity_position(&entity, 1000).unwrap();
        }
    }

    #[test]
    fn test_split_sixty_into_thirty_and_thirty() {
        let config = GameConfig::default();
        let mut snapshot = world_with_player(1);
        add_circle(&mut snapshot, 1, 1, 60, Timestamp::ZERO);
        let now = Timestamp::from_secs_f32(10.0);
        let mut ids = IdAllocator::new(&snapshot);

        let outcome = split_circles(&snapshot, 1, &mut ids, now, &config).unwrap();
        assert_eq!(
            outcome.scheduled,
            vec![ScheduledEvent::Recombine {
                player_id: 1,
                fire_at: Timestamp::from_secs_f32(15.0),
            }]
        );

        snapshot.apply_all(outcome.mutations);
        let masses: Vec<u32> = snapshot.player_bodies(1).iter().map(|(_, e)| e.mass).collect();
        assert_eq!(masses, vec![30, 30]);
        assert!(snapshot.circles_of(1).all(|c| c.last_split_time == now));
        // New circle sits one direction vector away
        assert_eq!(snapshot.entity(2).unwrap().position, Vec2::new(500.0, 501.0));
    }

    #[test]
    fn test_split_respects_circle_cap() {
        let mut config = GameConfig::default();
        config.max_circles_per_player = 3;
        let mut snapshot = world_with_player(1);
        for id in 1..=3 {
            add_circle(&mut snapshot, id, 1, 100, Timestamp::ZERO);
        }
        let mut ids = IdAllocator::new(&snapshot);
        let outcome = split_circles(&snapshot, 1, &mut ids, Timestamp::ZERO, &config).unwrap();
        assert!(outcome.is_empty());

        // Two circles and room for one more: only the first splits
        snapshot.apply_all(destroy_entity_mutations(3));
        let mut ids = IdAllocator::new(&snapshot);
        let outcome = split_circles(&snapshot, 1, &mut ids, Timestamp::ZERO, &config).unwrap();
        snapshot.apply_all(outcome.mutations);
        assert_eq!(snapshot.circle_count(1), 3);
        assert_eq!(snapshot.entity(1).unwrap().mass, 50);
        assert_eq!(snapshot.entity(2).unwrap().mass, 100);
    }

    #[test]
    fn test_split_too_light_schedules_nothing() {
        let config = GameConfig::default();
        let mut snapshot = world_with_player(1);
        add_circle(&mut snapshot, 1, 1, 59, Timestamp::ZERO);
        let mut ids = IdAllocator::new(&snapshot);
        let outcome = split_circles(&snapshot, 1, &mut ids, Timestamp::ZERO, &config).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_split_unknown_player_is_missing_reference() {
        let config = GameConfig::default();
        let snapshot = world_with_player(1);
        let mut ids = IdAllocator::new(&snapshot);
        let err = split_circles(&snapshot, 9, &mut ids, Timestamp::ZERO, &config).unwrap_err();
        assert!(err.is_missing_reference());
    }

    #[test]
    fn test_recombine_timing_boundary() {
        let config = GameConfig::default();
        let mut snapshot = world_with_player(1);
        let split_at = Timestamp::from_secs_f32(1.0);
        for id in 1..=3 {
            add_circle(&mut snapshot, id, 1, 30, split_at);
        }

        let early = Timestamp::from_micros(6_000_000 - 1_000);
        let outcome = recombine_circles(&snapshot, 1, early, &config).unwrap();
        assert!(outcome.is_empty());

        let late = Timestamp::from_micros(6_000_000 + 1_000);
        let outcome = recombine_circles(&snapshot, 1, late, &config).unwrap();
        assert_eq!(
            outcome.scheduled,
            vec![
                ScheduledEvent::Consume {
                    consumer_entity_id: 1,
                    consumed_entity_id: 2,
                    fire_at: late,
                },
                ScheduledEvent::Consume {
                    consumer_entity_id: 1,
                    consumed_entity_id: 3,
                    fire_at: late,
                },
            ]
        );
    }

    #[test]
    fn test_recombine_single_ready_circle_is_noop() {
        let config = GameConfig::default();
        let mut snapshot = world_with_player(1);
        add_circle(&mut snapshot, 1, 1, 30, Timestamp::ZERO);
        add_circle(&mut snapshot, 2, 1, 30, Timestamp::from_secs_f32(20.0));
        let outcome =
            recombine_circles(&snapshot, 1, Timestamp::from_secs_f32(21.0), &config).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_consume_transfers_mass_and_destroys() {
        let mut snapshot = world_with_player(1);
        add_circle(&mut snapshot, 1, 1, 40, Timestamp::ZERO);
        snapshot
            .insert_entity(Entity::new(2, Vec2::new(501.0, 500.0), 3))
            .unwrap();
        snapshot.insert_food(Food { entity_id: 2 }).unwrap();

        let mutations = consume(&snapshot, 1, 2).unwrap();
        snapshot.apply_all(mutations);
        assert_eq!(snapshot.entity(1).unwrap().mass, 43);
        assert!(snapshot.entity(2).is_none());
        assert!(!snapshot.is_food(2));
    }

    #[test]
    fn test_consume_missing_or_self_is_rejected() {
        let mut snapshot = world_with_player(1);
        add_circle(&mut snapshot, 1, 1, 40, Timestamp::ZERO);
        assert_eq!(
            consume(&snapshot, 1, 5).unwrap_err(),
            SimError::MissingEntity { entity_id: 5 }
        );
        assert_eq!(
            consume(&snapshot, 5, 1).unwrap_err(),
            SimError::MissingEntity { entity_id: 5 }
        );
        assert!(matches!(
            consume(&snapshot, 1, 1).unwrap_err(),
            SimError::InvalidInput { field: "consumed_entity_id", .. }
        ));
    }

    #[test]
    fn test_decay_only_above_start_mass() {
        let config = GameConfig::default();
        let mut snapshot = world_with_player(1);
        add_circle(&mut snapshot, 1, 1, 15, Timestamp::ZERO);
        add_circle(&mut snapshot, 2, 1, 200, Timestamp::ZERO);
        // Food never decays
        snapshot
            .insert_entity(Entity::new(3, Vec2::new(10.0, 10.0), 400))
            .unwrap();
        snapshot.insert_food(Food { entity_id: 3 }).unwrap();

        assert_eq!(
            decay_masses(&snapshot, &config),
            vec![Mutation::SetMass {
                entity_id: 2,
                mass: 198
            }]
        );
    }

    #[test]
    fn test_center_of_mass() {
        let a = Entity::new(1, Vec2::new(0.0, 0.0), 1);
        let b = Entity::new(2, Vec2::new(4.0, 0.0), 3);
        assert_eq!(center_of_mass([&a, &b]), Vec2::new(3.0, 0.0));
        assert_eq!(center_of_mass(std::iter::empty()), Vec2::ZERO);
    }

    #[test]
    fn test_position_validation() {
        let inside = Entity::new(1, Vec2::new(5.0, 995.0), 25);
        assert!(validate_entity_position(&inside, 1000).is_ok());
        let outside = Entity::new(2, Vec2::new(4.0, 500.0), 25);
        assert!(validate_entity_position(&outside, 1000).is_err());
        let nan = Entity::new(3, Vec2::new(f32::NAN, 500.0), 25);
        assert!(validate_entity_position(&nan, 1000).is_err());
    }

    proptest! {
        #[test]
        fn proptest_split_conserves_mass(mass in 60u32..1_000_000) {
            let config = GameConfig::default();
            let mut snapshot = world_with_player(1);
            add_circle(&mut snapshot, 1, 1, mass, Timestamp::ZERO);
            let mut ids = IdAllocator::new(&snapshot);
            let outcome = split_circles(&snapshot, 1, &mut ids, Timestamp::ZERO, &config).unwrap();
            snapshot.apply_all(outcome.mutations);
            let total: u32 = snapshot.player_bodies(1).iter().map(|(_, e)| e.mass).sum();
            prop_assert_eq!(snapshot.circle_count(1), 2);
            prop_assert_eq!(total, mass);
        }

        #[test]
        fn proptest_consume_conserves_mass(a in 1u32..1_000_000, b in 1u32..1_000_000) {
            let mut snapshot = world_with_player(1);
            add_circle(&mut snapshot, 1, 1, a, Timestamp::ZERO);
            add_circle(&mut snapshot, 2, 1, b, Timestamp::ZERO);
            let mutations = consume(&snapshot, 1, 2).unwrap();
            snapshot.apply_all(mutations);
            prop_assert_eq!(snapshot.entity(1).unwrap().mass, a + b);
            prop_assert!(snapshot.entity(2).is_none());
            prop_assert!(snapshot.circle(2).is_none());
        }

        #[test]
        fn proptest_decay_never_touches_small_circles(mass in 1u32..=15) {
            let config = GameConfig::default();
            let mut snapshot = world_with_player(1);
            add_circle(&mut snapshot, 1, 1, mass, Timestamp::ZERO);
            prop_assert!(decay_masses(&snapshot, &config).is_empty());
        }
    }
}
