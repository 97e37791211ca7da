//! Groups of units ordered together.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// An ordered group of unit ids.
///
/// Members are weak references: the world drops dead members from the
/// selection platoon, other platoons are pruned through death listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platoon {
    units: Vec<EntityId>,
}

impl Platoon {
    /// Create an empty platoon.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit unless it is already a member.
    pub fn add(&mut self, unit: EntityId) -> bool {
        if self.units.contains(&unit) {
            false
        } else {
            self.units.push(unit);
            true
        }
    }

    /// Remove a unit, returning whether it was a member.
    pub fn remove(&mut self, unit: EntityId) -> bool {
        let before = self.units.len();
        self.units.retain(|&id| id != unit);
        self.units.len() != before
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Whether `unit` is a member.
    #[must_use]
    pub fn contains(&self, unit: EntityId) -> bool {
        self.units.contains(&unit)
    }

    /// Members in insertion order.
    #[must_use]
    pub fn units(&self) -> &[EntityId] {
        &self.units
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the platoon has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
