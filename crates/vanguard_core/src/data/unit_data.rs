//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Inclusive integer damage range. Each hit rolls uniformly in `[min, max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DamageRange {
    /// Lowest possible damage.
    pub min: u32,
    /// Highest possible damage.
    pub max: u32,
}

impl DamageRange {
    /// A range that always yields `value`.
    #[must_use]
    pub const fn fixed(value: u32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }
}

/// Ranged attack: damage travels on a homing projectile instead of landing
/// immediately.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProjectileData {
    /// Travel speed in world units per second.
    pub speed: f32,
}

/// Data-driven unit definition.
///
/// Shared by every unit spawned from it. Units copy the definition at spawn
/// time, so damage taken at runtime never touches this value.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "footman",
///     name: "Footman",
///     health: 60,
///     speed: 3.5,
///     engage_distance: 1.5,
///     guard_distance: 8.0,
///     damage: (min: 4, max: 7),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitData {
    /// Unique string identifier for this unit type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Maximum health points.
    pub health: u32,

    /// Movement speed in world units per second.
    pub speed: f32,

    /// Distance from the destination at which navigation reports arrival.
    #[serde(default = "default_stopping_distance")]
    pub stopping_distance: f32,

    /// Range at which the unit stops approaching and starts attacking.
    pub engage_distance: f32,

    /// Radius in which the unit spots and engages hostiles. Also its vision
    /// radius.
    pub guard_distance: f32,

    /// Damage per hit.
    pub damage: DamageRange,

    /// Ranged attack (None for melee units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectile: Option<ProjectileData>,

    /// Tags for categorization (e.g., "infantry", "ranged").
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Default stopping distance for units without explicit one.
const fn default_stopping_distance() -> f32 {
    0.1
}

impl UnitData {
    /// Check if this unit has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Check if this unit attacks with projectiles.
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.projectile.is_some()
    }

    /// Validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(GameError::InvalidData(format!("unit '{}': {msg}", self.id)));

        if self.health == 0 {
            return fail("health must be positive");
        }
        if self.damage.min > self.damage.max {
            return fail("damage min exceeds max");
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return fail("speed must be a non-negative number");
        }
        if !(self.engage_distance.is_finite() && self.engage_distance > 0.0) {
            return fail("engage distance must be positive");
        }
        if !(self.guard_distance.is_finite() && self.guard_distance >= self.engage_distance) {
            return fail("guard distance must be at least the engage distance");
        }
        if let Some(projectile) = self.projectile {
            if !(projectile.speed.is_finite() && projectile.speed > 0.0) {
                return fail("projectile speed must be positive");
            }
        }
        Ok(())
    }
}
