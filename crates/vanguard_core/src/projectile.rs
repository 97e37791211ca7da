//! Homing projectiles carrying deferred damage.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityStorage};
use crate::math::Vec3;

/// Distance at which a projectile counts as hitting.
const HIT_RADIUS: f32 = 0.05;

/// A shot in flight toward a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Shooter.
    pub source: EntityId,
    /// Entity the projectile homes in on.
    pub target: EntityId,
    /// Current position.
    pub position: Vec3,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Damage applied on impact.
    pub damage: u32,
}

/// What happened to a projectile this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// Still travelling.
    InFlight,
    /// Reached the target; apply damage.
    Hit,
    /// Target gone or dead; drop the projectile.
    Fizzled,
}

impl Projectile {
    /// Move toward the target's current position.
    pub fn advance(&mut self, entities: &EntityStorage, dt: f32) -> Flight {
        let Some(target) = entities.get(self.target).filter(|e| !e.is_dead()) else {
            return Flight::Fizzled;
        };
        let aim = target.body.position;
        self.position = self.position.move_towards(aim, self.speed * dt);
        if self.position.distance(aim) <= HIT_RADIUS {
            Flight::Hit
        } else {
            Flight::InFlight
        }
    }
}
