//! Fire-and-forget signals for whatever renders the simulation.
//!
//! The core never reads these back. A renderer drains them from the
//! [`TickEvents`] returned by each tick.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// One presentation signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    /// The attack animation started (`true`) or stopped (`false`).
    AttackAnimation {
        /// Attacker.
        entity: EntityId,
        /// Whether the animation is playing.
        active: bool,
    },
    /// Play the death animation.
    DeathTrigger {
        /// Entity that died.
        entity: EntityId,
    },
    /// Movement speed changed.
    Speed {
        /// Moving entity.
        entity: EntityId,
        /// Current speed in world units per second.
        value: f32,
    },
    /// Visibility to the player changed.
    Visibility {
        /// Entity whose visibility changed.
        entity: EntityId,
        /// New visibility.
        visible: bool,
    },
    /// Show the health bar of a freshly revealed entity.
    HealthbarShown {
        /// Revealed entity.
        entity: EntityId,
    },
    /// A hostile slipped back into the fog.
    DisappearedInFog {
        /// Hidden entity.
        entity: EntityId,
    },
    /// Selection marker toggled.
    Selected {
        /// Entity whose selection changed.
        entity: EntityId,
        /// New selection state.
        selected: bool,
    },
    /// Opacity of the vision radius decal.
    VisionAlpha {
        /// Entity owning the decal.
        entity: EntityId,
        /// Opacity in `[0, 1]`.
        alpha: f32,
    },
    /// Combat-ready animation blend.
    CombatReady {
        /// Blending entity.
        entity: EntityId,
        /// Blend weight in `[0, 1]`.
        value: f32,
    },
    /// One burn effect of a building started or stopped.
    BurnEffect {
        /// Burning building.
        entity: EntityId,
        /// Burn point index.
        point: u8,
        /// Whether the effect is playing.
        lit: bool,
    },
    /// A projectile left its shooter.
    ProjectileLaunched {
        /// Shooter.
        source: EntityId,
        /// Target.
        target: EntityId,
    },
}

/// Damage applied to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Attacker, if known.
    pub source: Option<EntityId>,
    /// Entity that took the damage.
    pub target: EntityId,
    /// Damage dealt after clamping to remaining health.
    pub amount: u32,
}

/// Everything that happened since the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Presentation signals in emission order.
    pub signals: Vec<Signal>,
    /// Damage applied.
    pub damage: Vec<DamageEvent>,
    /// Entities that ran the death procedure.
    pub deaths: Vec<EntityId>,
    /// Corpses removed from the world.
    pub despawned: Vec<EntityId>,
}

impl TickEvents {
    /// Record a signal.
    pub fn signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
            && self.damage.is_empty()
            && self.deaths.is_empty()
            && self.despawned.is_empty()
    }

    /// Signals concerning one entity.
    pub fn signals_for(&self, entity: EntityId) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(move |s| s.entity() == entity)
    }
}

impl Signal {
    /// The entity the signal is about.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match *self {
            Self::AttackAnimation { entity, .. }
            | Self::DeathTrigger { entity }
            | Self::Speed { entity, .. }
            | Self::Visibility { entity, .. }
            | Self::HealthbarShown { entity }
            | Self::DisappearedInFog { entity }
            | Self::Selected { entity, .. }
            | Self::VisionAlpha { entity, .. }
            | Self::CombatReady { entity, .. }
            | Self::BurnEffect { entity, .. } => entity,
            Self::ProjectileLaunched { source, .. } => source,
        }
    }
}
