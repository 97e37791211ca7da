//! Building data structures for data-driven building definitions.

use serde::{Deserialize, Serialize};

use super::unit_data::{DamageRange, ProjectileData};
use crate::error::{GameError, Result};

/// Number of burn points a building needs for tiered burn effects.
pub const BURN_POINT_COUNT: u8 = 4;

/// Weapon mounted on a building (towers).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeaponData {
    /// Damage per hit.
    pub damage: DamageRange,

    /// Range at which the building engages a target.
    pub engage_distance: f32,

    /// Ranged attack (None for instant hits).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectile: Option<ProjectileData>,
}

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     id: "watch_tower",
///     name: "Watch Tower",
///     health: 400,
///     guard_distance: 10.0,
///     weapon: Some((
///         damage: (min: 5, max: 8),
///         engage_distance: 9.0,
///         projectile: Some((speed: 15.0)),
///     )),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingData {
    /// Unique string identifier for this building type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Maximum health points.
    pub health: u32,

    /// Vision radius.
    pub guard_distance: f32,

    /// Weapon (None for buildings that cannot attack).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponData>,

    /// Number of burn effect points on the model.
    #[serde(default = "default_burn_points")]
    pub burn_points: u8,

    /// Tags for categorization (e.g., "production", "defense").
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Default burn point count.
const fn default_burn_points() -> u8 {
    BURN_POINT_COUNT
}

impl BuildingData {
    /// Check if this building has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Check if this building can attack.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.weapon.is_some()
    }

    /// Validate the definition.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| {
            Err(GameError::InvalidData(format!(
                "building '{}': {msg}",
                self.id
            )))
        };

        if self.health == 0 {
            return fail("health must be positive");
        }
        if !(self.guard_distance.is_finite() && self.guard_distance >= 0.0) {
            return fail("guard distance must be a non-negative number");
        }
        if let Some(weapon) = &self.weapon {
            if weapon.damage.min > weapon.damage.max {
                return fail("damage min exceeds max");
            }
            if !(weapon.engage_distance.is_finite() && weapon.engage_distance > 0.0) {
                return fail("engage distance must be positive");
            }
            if let Some(projectile) = weapon.projectile {
                if !(projectile.speed.is_finite() && projectile.speed > 0.0) {
                    return fail("projectile speed must be positive");
                }
            }
        }
        Ok(())
    }
}
