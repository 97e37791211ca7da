//! Factions, alliances and per-faction membership bookkeeping.
//!
//! Hostility is derived from alliance identifiers: two different factions are
//! allied only if they share a non-zero alliance id. Alliance id `0` means
//! "allied with nobody", not even with another faction that also uses `0`.
//! A faction is always allied with itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::FactionData;
use crate::entity::EntityId;
use crate::error::{GameError, Result};

/// Unique identifier for factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub u32);

/// Alliance id meaning "no alliance".
pub const NO_ALLIANCE: u32 = 0;

/// Team color used by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactionColor {
    /// Black.
    #[default]
    Black,
    /// Blue.
    Blue,
    /// Brown.
    Brown,
    /// Green.
    Green,
    /// Purple.
    Purple,
    /// Red.
    Red,
    /// Orange.
    Orange,
    /// White.
    White,
}

/// A faction at runtime: its definition plus the entities registered to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faction {
    /// Faction identifier.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Team color.
    pub color: FactionColor,
    /// Alliance identifier, `0` for none.
    pub alliance_id: u32,
    units: Vec<EntityId>,
    buildings: Vec<EntityId>,
}

impl Faction {
    /// Create a faction with no members from its data definition.
    #[must_use]
    pub fn from_data(data: &FactionData) -> Self {
        Self {
            id: data.id,
            name: data.name.clone(),
            color: data.color,
            alliance_id: data.alliance_id,
            units: Vec::new(),
            buildings: Vec::new(),
        }
    }

    /// Live units registered to this faction.
    #[must_use]
    pub fn units(&self) -> &[EntityId] {
        &self.units
    }

    /// Live buildings registered to this faction.
    #[must_use]
    pub fn buildings(&self) -> &[EntityId] {
        &self.buildings
    }

    /// Check if this faction is allied with another.
    #[must_use]
    pub fn is_allied_with(&self, other: &Self) -> bool {
        is_allied(self.id, self.alliance_id, other.id, other.alliance_id)
    }
}

/// The hostility predicate on raw identifiers.
///
/// Symmetric by construction.
#[must_use]
pub const fn is_allied(a: FactionId, a_alliance: u32, b: FactionId, b_alliance: u32) -> bool {
    if a.0 == b.0 {
        return true;
    }
    a_alliance != NO_ALLIANCE && a_alliance == b_alliance
}

/// Which membership list an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Mobile unit.
    Unit,
    /// Static building.
    Building,
}

/// All factions in a world.
#[derive(Debug, Clone, Default)]
pub struct FactionRegistry {
    factions: BTreeMap<FactionId, Faction>,
}

impl FactionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from faction definitions.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] if two definitions share an id.
    pub fn from_data(data: &[FactionData]) -> Result<Self> {
        let mut registry = Self::new();
        for faction in data {
            if registry.factions.contains_key(&faction.id) {
                return Err(GameError::InvalidData(format!(
                    "duplicate faction id {}",
                    faction.id.0
                )));
            }
            registry
                .factions
                .insert(faction.id, Faction::from_data(faction));
        }
        Ok(registry)
    }

    /// Look up a faction.
    #[must_use]
    pub fn get(&self, id: FactionId) -> Option<&Faction> {
        self.factions.get(&id)
    }

    /// Check whether a faction exists.
    #[must_use]
    pub fn contains(&self, id: FactionId) -> bool {
        self.factions.contains_key(&id)
    }

    /// Iterate over factions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }

    /// Answer "are these two factions allied".
    ///
    /// Unknown factions are allied with nobody but themselves.
    #[must_use]
    pub fn is_allied_with(&self, a: FactionId, b: FactionId) -> bool {
        let alliance = |id| self.factions.get(&id).map_or(NO_ALLIANCE, |f| f.alliance_id);
        is_allied(a, alliance(a), b, alliance(b))
    }

    /// Answer "are these two factions hostile".
    #[must_use]
    pub fn is_hostile(&self, a: FactionId, b: FactionId) -> bool {
        !self.is_allied_with(a, b)
    }

    pub(crate) fn register(&mut self, faction: FactionId, entity: EntityId, kind: MemberKind) {
        if let Some(f) = self.factions.get_mut(&faction) {
            match kind {
                MemberKind::Unit => f.units.push(entity),
                MemberKind::Building => f.buildings.push(entity),
            }
        }
    }

    pub(crate) fn unregister(&mut self, faction: FactionId, entity: EntityId) {
        if let Some(f) = self.factions.get_mut(&faction) {
            f.units.retain(|&id| id != entity);
            f.buildings.retain(|&id| id != entity);
        }
    }
}
