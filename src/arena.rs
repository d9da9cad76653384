//! In-memory reference host
//!
//! Owns the world snapshot, a seeded RNG and the event queue, and drives the
//! simulation entry points in time order. Single-threaded: every invocation
//! sees the state left by the previous one.

use std::collections::BTreeMap;
use std::time::Duration;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::Timestamp;
use crate::config::GameConfig;
use crate::error::{ConfigError, SimError};
use crate::sim::commands;
use crate::sim::debug::WorldDebugInfo;
use crate::sim::state::{Outcome, Player, PlayerId, ScheduledEvent, Snapshot, WorldConfig};
use crate::sim::tick::{TickKind, fire_event, player_split, tick};

/// A periodic tick and when it next runs
#[derive(Debug, Clone, Copy)]
struct Timer {
    kind: TickKind,
    interval: Duration,
    next_due: Timestamp,
}

/// Reference host for the simulation
#[derive(Debug, Clone)]
pub struct Arena {
    config: GameConfig,
    snapshot: Snapshot,
    rng: Pcg32,
    now: Timestamp,

    // === Scheduling ===
    timers: Vec<Timer>,
    /// Pending events ordered by due time, then by insertion
    pending: BTreeMap<(Timestamp, u64), ScheduledEvent>,
    next_seq: u64,

    next_player_id: PlayerId,
}

impl Arena {
    /// Empty world sized from the config
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        let world = WorldConfig {
            world_size: config.default_world_size,
        };
        Self::with_snapshot(config, Snapshot::new(world), seed)
    }

    /// Resume from an existing snapshot
    pub fn with_snapshot(
        config: GameConfig,
        snapshot: Snapshot,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        snapshot.world.validate().map_err(ConfigError::InvalidWorld)?;

        let timers = [
            (TickKind::MoveAllCircles, config.move_interval()),
            (TickKind::SpawnFood, config.food_interval()),
            (TickKind::DecayCircles, config.decay_interval()),
        ]
        .into_iter()
        .map(|(kind, interval)| Timer {
            kind,
            interval,
            next_due: Timestamp::ZERO + interval,
        })
        .collect();

        let next_player_id = snapshot
            .players
            .keys()
            .next_back()
            .map_or(1, |id| id.saturating_add(1));

        log::info!(
            "Arena initialized: world {}, seed {}",
            snapshot.world.world_size,
            seed
        );

        Ok(Self {
            config,
            snapshot,
            rng: Pcg32::seed_from_u64(seed),
            now: Timestamp::ZERO,
            timers,
            pending: BTreeMap::new(),
            next_seq: 0,
            next_player_id,
        })
    }

    // === Accessors ===

    #[inline]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[inline]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Scheduled events not yet fired
    pub fn pending_events(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.pending.values()
    }

    pub fn debug_info(&self) -> WorldDebugInfo {
        WorldDebugInfo::new(&self.snapshot)
    }

    // === Player commands ===

    /// Register a client; reconnecting with a known identity returns the same player
    pub fn connect(&mut self, identity: u128) -> Result<PlayerId, SimError> {
        if let Some(player) = self.snapshot.players.values().find(|p| p.identity == identity) {
            return Ok(player.player_id);
        }
        let player_id = self.next_player_id;
        self.snapshot.insert_player(Player::new(identity, player_id))?;
        self.next_player_id = self.next_player_id.saturating_add(1);
        log::info!("Player {player_id} connected");
        Ok(player_id)
    }

    pub fn enter_game(&mut self, player_id: PlayerId, name: &str) -> Result<(), SimError> {
        let result = commands::enter_game(
            &self.snapshot,
            player_id,
            name,
            &mut self.rng,
            self.now,
            &self.config,
        );
        self.commit("enter_game", result)?;
        log::info!("Player {player_id} entered as '{}'", name.trim());
        Ok(())
    }

    pub fn respawn(&mut self, player_id: PlayerId) -> Result<(), SimError> {
        let result = commands::respawn(
            &self.snapshot,
            player_id,
            &mut self.rng,
            self.now,
            &self.config,
        );
        self.commit("respawn", result)
    }

    pub fn update_input(&mut self, player_id: PlayerId, direction: Vec2) -> Result<(), SimError> {
        let result = commands::update_player_input(&self.snapshot, player_id, direction);
        self.commit("update_input", result)
    }

    pub fn split(&mut self, player_id: PlayerId) -> Result<(), SimError> {
        let result = player_split(&self.snapshot, player_id, self.now, &self.config);
        self.commit("split", result)
    }

    pub fn suicide(&mut self, player_id: PlayerId) -> Result<(), SimError> {
        let result = commands::suicide(&self.snapshot, player_id);
        self.commit("suicide", result)
    }

    /// Drop the player's circles and forget the player
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), SimError> {
        let result = commands::leave_arena(&self.snapshot, player_id);
        self.commit("disconnect", result)?;
        self.snapshot.remove_player(player_id);
        log::info!("Player {player_id} disconnected");
        Ok(())
    }

    // === Time ===

    /// Fire every timer and event due up to `target`, in time order
    ///
    /// At equal times pending events run before periodic ticks. Moving
    /// backwards is a no-op.
    pub fn advance_to(&mut self, target: Timestamp) {
        loop {
            let next_event = self
                .pending
                .first_key_value()
                .map(|(&(at, _), _)| at)
                .filter(|&at| at <= target);
            let next_timer = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.next_due <= target)
                .min_by_key(|(i, t)| (t.next_due, *i))
                .map(|(i, t)| (i, t.next_due));

            match (next_event, next_timer) {
                (Some(at), Some((_, due))) if at <= due => self.fire_next_event(),
                (Some(_), None) => self.fire_next_event(),
                (_, Some((index, _))) => self.run_timer(index),
                (None, None) => break,
            }
        }
        self.now = self.now.max(target);
    }

    /// Advance by a duration from the current time
    pub fn advance_by(&mut self, duration: Duration) {
        self.advance_to(self.now + duration);
    }

    fn run_timer(&mut self, index: usize) {
        let Some(timer) = self.timers.get_mut(index) else {
            return;
        };
        let due = timer.next_due;
        let kind = timer.kind;
        timer.next_due = due + timer.interval;

        self.now = self.now.max(due);
        let outcome = tick(kind, &self.snapshot, &mut self.rng, self.now, &self.config);
        self.apply(outcome);
    }

    fn fire_next_event(&mut self) {
        let Some(((at, _), event)) = self.pending.pop_first() else {
            return;
        };
        self.now = self.now.max(at);
        let result = fire_event(event, &self.snapshot, self.now, &self.config);
        // Stale handles are expected; the error was already logged
        let _ = self.commit("scheduled event", result);
    }

    // === Commit ===

    fn commit(&mut self, what: &str, result: Result<Outcome, SimError>) -> Result<(), SimError> {
        match result {
            Ok(outcome) => {
                self.apply(outcome);
                Ok(())
            }
            Err(err) => {
                if err.is_missing_reference() {
                    log::debug!("{what} skipped: {err}");
                } else {
                    log::warn!("{what} rejected: {err}");
                }
                Err(err)
            }
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        self.snapshot.apply_all(outcome.mutations);
        for event in outcome.scheduled {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.pending.insert((event.fire_at(), seq), event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Circle, Entity};

    fn quiet_config() -> GameConfig {
        GameConfig {
            target_food_count: 1,
            circle_decay_interval_ms: 1_000_000,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = GameConfig {
            start_player_mass: 0,
            ..GameConfig::default()
        };
        assert!(Arena::new(config, 1).is_err());
    }

    #[test]
    fn test_rejects_zero_sized_world() {
        let snapshot = Snapshot::new(WorldConfig { world_size: 0 });
        let result = Arena::with_snapshot(GameConfig::default(), snapshot, 1);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidWorld(SimError::InvalidInput {
                field: "world_size",
                ..
            }))
        ));
    }

    #[test]
    fn test_connect_is_idempotent_per_identity() {
        let mut arena = Arena::new(GameConfig::default(), 1).unwrap();
        let a = arena.connect(1001).unwrap();
        let b = arena.connect(1002).unwrap();
        assert_ne!(a, b);
        assert_eq!(arena.connect(1001).unwrap(), a);
        assert!(arena.connect(0).is_err());
    }

    #[test]
    fn test_food_spawns_once_someone_connects() {
        let mut arena = Arena::new(GameConfig::default(), 3).unwrap();
        arena.advance_by(Duration::from_secs(1));
        assert_eq!(arena.snapshot().food_count(), 0);

        arena.connect(7).unwrap();
        arena.advance_by(Duration::from_secs(1));
        assert_eq!(arena.snapshot().food_count(), 600);
    }

    #[test]
    fn test_input_moves_circle() {
        let mut arena = Arena::new(quiet_config(), 5).unwrap();
        let player = arena.connect(7).unwrap();
        arena.enter_game(player, "mover").unwrap();
        let start = arena.snapshot().player_bodies(player)[0].1.position;

        arena.update_input(player, Vec2::new(1.0, 0.0)).unwrap();
        arena.advance_by(Duration::from_millis(500));

        let end = arena.snapshot().player_bodies(player)[0].1.position;
        assert!(end.x > start.x || end.x >= 1000.0 - 4.0);
        assert_eq!(end.y, start.y);
    }

    #[test]
    fn test_invalid_input_is_reported() {
        let mut arena = Arena::new(GameConfig::default(), 5).unwrap();
        let player = arena.connect(7).unwrap();
        let err = arena.enter_game(player, "").unwrap_err();
        assert!(matches!(err, SimError::InvalidInput { field: "name", .. }));
        let err = arena.split(99).unwrap_err();
        assert!(err.is_missing_reference());
    }

    #[test]
    fn test_split_recombine_cycle() {
        let config = quiet_config();
        let mut snapshot = Snapshot::new(WorldConfig { world_size: 1000 });
        snapshot.insert_player(Player::new(77, 1)).unwrap();
        snapshot
            .insert_entity(Entity::new(1, Vec2::new(500.0, 500.0), 60))
            .unwrap();
        snapshot
            .insert_circle(Circle::new(1, 1, Timestamp::ZERO))
            .unwrap();
        let mut arena = Arena::with_snapshot(config, snapshot, 11).unwrap();

        arena.split(1).unwrap();
        assert_eq!(arena.snapshot().circle_count(1), 2);
        assert_eq!(arena.pending_events().count(), 1);

        arena.advance_to(Timestamp::from_secs_f32(4.9));
        assert_eq!(arena.snapshot().circle_count(1), 2);

        arena.advance_to(Timestamp::from_secs_f32(5.5));
        assert_eq!(arena.snapshot().circle_count(1), 1);
        let (_, body) = arena.snapshot().player_bodies(1)[0];
        assert!(body.mass >= 60);
        assert_eq!(arena.pending_events().count(), 0);
    }

    #[test]
    fn test_fractional_recombine_delay_still_merges() {
        let config = GameConfig {
            split_recombine_delay_sec: 1.1,
            split_grav_pull_before_recombine_sec: 0.5,
            ..quiet_config()
        };
        let mut snapshot = Snapshot::new(WorldConfig { world_size: 1000 });
        snapshot.insert_player(Player::new(77, 1)).unwrap();
        snapshot
            .insert_entity(Entity::new(1, Vec2::new(500.0, 500.0), 60))
            .unwrap();
        snapshot
            .insert_circle(Circle::new(1, 1, Timestamp::ZERO))
            .unwrap();
        let mut arena = Arena::with_snapshot(config, snapshot, 11).unwrap();

        arena.split(1).unwrap();
        let fire_at = arena.pending_events().next().map(|e| e.fire_at());
        assert_eq!(fire_at, Some(Timestamp::from_micros(1_100_000)));

        arena.advance_to(Timestamp::from_micros(1_100_000));
        assert_eq!(arena.snapshot().circle_count(1), 1);
        assert_eq!(arena.pending_events().count(), 0);
    }

    #[test]
    fn test_disconnect_removes_player_and_circles() {
        let mut arena = Arena::new(quiet_config(), 5).unwrap();
        let player = arena.connect(7).unwrap();
        arena.enter_game(player, "leaver").unwrap();
        arena.disconnect(player).unwrap();
        assert!(arena.snapshot().player(player).is_none());
        assert_eq!(arena.snapshot().circle_count(player), 0);
        assert!(arena.disconnect(player).unwrap_err().is_missing_reference());
    }

    #[test]
    fn test_same_seed_same_world() {
        let run = |seed: u64| {
            let mut arena = Arena::new(GameConfig::default(), seed).unwrap();
            let a = arena.connect(1).unwrap();
            let b = arena.connect(2).unwrap();
            arena.enter_game(a, "a").unwrap();
            arena.enter_game(b, "b").unwrap();
            arena.update_input(a, Vec2::new(0.3, -0.7)).unwrap();
            arena.update_input(b, Vec2::new(-1.0, 0.2)).unwrap();
            arena.advance_to(Timestamp::from_secs_f32(12.0));
            arena.snapshot().clone()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
