//! Perception capability: which entities an observer currently sees.
//!
//! The core filters what perception returns by hostility and aliveness, so
//! implementations only answer the geometric question.

use std::fmt;

use crate::entity::{Body, EntityId, EntityStorage};

/// Field-of-view provider.
pub trait Perception: fmt::Debug {
    /// Entities other than `observer` that it can currently see.
    ///
    /// The result must be in ascending id order so simulations stay
    /// deterministic.
    fn visible_entities(&self, observer: &Body, entities: &EntityStorage) -> Vec<EntityId>;
}

/// Sees every interactive entity within the observer's vision radius.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadiusPerception;

impl Perception for RadiusPerception {
    fn visible_entities(&self, observer: &Body, entities: &EntityStorage) -> Vec<EntityId> {
        let radius_sq = observer.vision_radius() * observer.vision_radius();
        let mut seen: Vec<EntityId> = entities
            .iter()
            .filter(|(&id, other)| {
                id != observer.id
                    && other.body.interactive
                    && other.body.position.distance_squared(observer.position) <= radius_sq
            })
            .map(|(&id, _)| id)
            .collect();
        seen.sort_unstable();
        seen
    }
}
