//! Overlap detection between bodies
//!
//! A cheap bounding-box prefilter narrows candidates, then the threshold
//! test decides. The prefilter only ever over-approximates.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{mass_to_radius, overlap_threshold};
use super::state::Entity;
use crate::config::GameConfig;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Square of half-size `radius` centred on `center`
    #[inline]
    pub fn around(center: Vec2, radius: f32) -> Self {
        let half = Vec2::splat(radius);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Inclusive overlap test (touching boxes overlap)
    #[inline]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Bounding box of an entity's body
#[inline]
pub fn entity_bounds(entity: &Entity) -> Bounds {
    Bounds::around(entity.position, entity.radius())
}

/// Squared centre distance within the threshold for the given overlap percentage
#[inline]
pub fn bodies_overlap(
    pos_a: Vec2,
    mass_a: u32,
    pos_b: Vec2,
    mass_b: u32,
    overlap_pct: f32,
) -> bool {
    let distance_sq = pos_a.distance_squared(pos_b);
    distance_sq <= overlap_threshold(mass_to_radius(mass_a), mass_to_radius(mass_b), overlap_pct)
}

/// Authoritative overlap predicate for consumption
#[inline]
pub fn is_overlapping(a: &Entity, b: &Entity, config: &GameConfig) -> bool {
    bodies_overlap(
        a.position,
        a.mass,
        b.position,
        b.mass,
        config.min_overlap_pct_to_consume,
    )
}

/// Candidates (other than `entity` itself) whose bounding box touches `entity`'s
pub fn fast_collision_filter<'a, I>(entity: &Entity, candidates: I) -> Vec<&'a Entity>
where
    I: IntoIterator<Item = &'a Entity>,
{
    let bounds = entity_bounds(entity);
    candidates
        .into_iter()
        .filter(|c| c.entity_id != entity.entity_id)
        .filter(|c| bounds.overlaps(&entity_bounds(c)))
        .collect()
}

/// Prefilter followed by the precise test
pub fn overlapping_entities<'a, I>(
    entity: &Entity,
    candidates: I,
    config: &GameConfig,
) -> Vec<&'a Entity>
where
    I: IntoIterator<Item = &'a Entity>,
{
    fast_collision_filter(entity, candidates)
        .into_iter()
        .filter(|other| is_overlapping(entity, other, config))
        .collect()
}

/// Constrain each axis to [radius, world_size - radius]
#[inline]
pub fn clamp_position_to_world(position: Vec2, radius: f32, world_size: f32) -> Vec2 {
    // An oversized body sits at the centre instead of inverting the range
    let low = radius.min(world_size / 2.0);
    let high = (world_size - radius).max(low);
    Vec2::new(position.x.clamp(low, high), position.y.clamp(low, high))
}
