//! Orders issued to units.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::Vec3;

/// The kind of a [`Command`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    /// Move to a spot, then idle.
    MoveTo,
    /// Move to a spot, engaging hostiles seen on the way, then guard.
    AttackMoveTo,
    /// Chase and attack one entity.
    AttackTarget,
    /// Hold a spot and engage hostiles that come close.
    Guard,
    /// Drop every order and idle.
    Stop,
    /// Die on the spot.
    Die,
}

/// A single order.
///
/// Commands are values: once built they never change. The payload carries
/// exactly what the type needs, a destination for movement and guard
/// orders, a target for attacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Move to a spot, then idle.
    MoveTo(Vec3),
    /// Move to a spot, engaging hostiles seen on the way, then guard.
    AttackMoveTo(Vec3),
    /// Chase and attack one entity.
    AttackTarget(EntityId),
    /// Hold a spot and engage hostiles that come close.
    Guard(Vec3),
    /// Drop every order and idle. Never enqueued.
    Stop,
    /// Die on the spot.
    Die,
}

impl Command {
    /// The command's type.
    #[must_use]
    pub const fn kind(&self) -> CommandType {
        match self {
            Self::MoveTo(_) => CommandType::MoveTo,
            Self::AttackMoveTo(_) => CommandType::AttackMoveTo,
            Self::AttackTarget(_) => CommandType::AttackTarget,
            Self::Guard(_) => CommandType::Guard,
            Self::Stop => CommandType::Stop,
            Self::Die => CommandType::Die,
        }
    }

    /// Destination for `MoveTo`, `AttackMoveTo` and `Guard`.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec3> {
        match self {
            Self::MoveTo(dest) | Self::AttackMoveTo(dest) | Self::Guard(dest) => Some(*dest),
            _ => None,
        }
    }

    /// Target for `AttackTarget`.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        match self {
            Self::AttackTarget(target) => Some(*target),
            _ => None,
        }
    }

    /// Check whether this is a standing guard order.
    #[must_use]
    pub const fn is_guard(&self) -> bool {
        matches!(self, Self::Guard(_))
    }

    /// Decide whether `issuer` would accept this command.
    ///
    /// Pure: `is_alive` answers whether an entity id refers to a live
    /// entity. Movement and guard orders need a finite destination; attacks
    /// need a live target other than the issuer itself.
    pub fn is_viable(&self, issuer: EntityId, is_alive: impl Fn(EntityId) -> bool) -> bool {
        match self {
            Self::MoveTo(dest) | Self::AttackMoveTo(dest) | Self::Guard(dest) => dest.is_finite(),
            Self::AttackTarget(target) => *target != issuer && is_alive(*target),
            Self::Stop | Self::Die => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accessors() {
        let dest = Vec3::new(1.0, 0.0, 2.0);
        assert_eq!(Command::MoveTo(dest).destination(), Some(dest));
        assert_eq!(Command::Guard(dest).kind(), CommandType::Guard);
        assert_eq!(Command::AttackTarget(7).target(), Some(7));
        assert_eq!(Command::AttackTarget(7).destination(), None);
        assert_eq!(Command::Stop.target(), None);
    }

    #[test]
    fn test_destination_must_be_finite() {
        let alive = |_| true;
        assert!(Command::MoveTo(Vec3::ZERO).is_viable(1, alive));
        assert!(!Command::MoveTo(Vec3::NAN).is_viable(1, alive));
        assert!(!Command::AttackMoveTo(Vec3::new(0.0, f32::NAN, 0.0)).is_viable(1, alive));
        assert!(!Command::Guard(Vec3::new(f32::INFINITY, 0.0, 0.0)).is_viable(1, alive));
    }

    #[test]
    fn test_attack_target_rules() {
        assert!(Command::AttackTarget(2).is_viable(1, |_| true));
        assert!(!Command::AttackTarget(1).is_viable(1, |_| true));
        assert!(!Command::AttackTarget(2).is_viable(1, |_| false));
    }

    #[test]
    fn test_stop_and_die_always_viable() {
        assert!(Command::Stop.is_viable(1, |_| false));
        assert!(Command::Die.is_viable(1, |_| false));
    }
}
