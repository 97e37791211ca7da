//! What an entity may see and touch while it takes its turn in a tick.
//!
//! The world lends its collaborators out for the duration of one entity's
//! step. The stepping entity itself is held outside of `entities`, so every
//! lookup here is about *other* entities.

use crate::config::WorldConfig;
use crate::entity::{Body, EntityId, EntityStorage};
use crate::factions::FactionRegistry;
use crate::math::{Fixed, Vec3};
use crate::navigation::Navigation;
use crate::perception::Perception;
use crate::presentation::{Signal, TickEvents};
use crate::scheduler::{Procedure, Scheduler};

/// Borrowed world state for one entity step.
pub(crate) struct StepContext<'a> {
    pub entities: &'a EntityStorage,
    pub live: &'a [EntityId],
    pub factions: &'a FactionRegistry,
    pub perception: &'a dyn Perception,
    pub navigation: &'a mut dyn Navigation,
    pub scheduler: &'a mut Scheduler,
    pub events: &'a mut TickEvents,
    pub config: &'a WorldConfig,
    pub now: Fixed,
    pub dt: Fixed,
}

impl StepContext<'_> {
    /// Whether `id` is a live entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Position of another entity.
    pub fn position_of(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(id).map(|e| e.body.position)
    }

    /// Whether `other` is alive and hostile to `me`.
    pub fn is_live_hostile(&self, me: &Body, other: EntityId) -> bool {
        self.entities.get(other).is_some_and(|e| {
            !e.is_dead() && self.factions.is_hostile(me.faction, e.body.faction)
        })
    }

    /// Live hostiles within `radius` of `me`, in registration order.
    pub fn hostiles_within(&self, me: &Body, radius: f32) -> Vec<EntityId> {
        let radius_sq = radius * radius;
        self.live
            .iter()
            .copied()
            .filter(|&id| id != me.id && self.is_live_hostile(me, id))
            .filter(|&id| {
                self.position_of(id)
                    .is_some_and(|p| p.distance_squared(me.position) <= radius_sq)
            })
            .collect()
    }

    /// Nearest live hostile `me` can currently see.
    pub fn nearest_visible_hostile(&self, me: &Body) -> Option<EntityId> {
        self.perception
            .visible_entities(me, self.entities)
            .into_iter()
            .filter(|&id| self.is_live_hostile(me, id))
            .filter_map(|id| Some((id, self.position_of(id)?.distance_squared(me.position))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Blend the combat-ready stance toward ready (1) or relaxed (0).
    pub fn blend_combat_ready(&mut self, body: &Body, ready: bool) {
        let target = if ready { 1.0 } else { 0.0 };
        self.scheduler.start(
            body.id,
            Procedure::CombatReadyBlend {
                target,
                rate: self.config.combat_ready_switch_rate,
            },
        );
    }

    /// Record a presentation signal.
    pub fn signal(&mut self, signal: Signal) {
        self.events.signal(signal);
    }

    /// Tick length in seconds.
    pub fn dt_secs(&self) -> f32 {
        self.dt.to_num()
    }
}
