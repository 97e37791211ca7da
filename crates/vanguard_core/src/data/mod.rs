//! Data structures for unit, building and faction definitions.
//!
//! All structs are designed to be deserialized from RON. The shared
//! definitions live in a [`TemplateLibrary`]; every spawned entity takes its
//! own copy.
//!
//! **Note:** This module contains no IO - it only defines data types and
//! parses strings. File loading is handled by `vanguard_tools`.

mod building_data;
mod faction_data;
mod unit_data;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::error::{GameError, Result};

pub use building_data::{BuildingData, WeaponData, BURN_POINT_COUNT};
pub use faction_data::FactionData;
pub use unit_data::{DamageRange, ProjectileData, UnitData};

/// Parse a RON document, tagging errors with a logical source name.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] if the document is malformed.
pub fn parse_ron<T: DeserializeOwned>(source: &str, text: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| GameError::DataParseError {
        path: source.to_string(),
        message: e.to_string(),
    })
}

/// Shared unit and building definitions, keyed by template id.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    units: BTreeMap<String, UnitData>,
    buildings: BTreeMap<String, BuildingData>,
}

impl TemplateLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a library from two RON lists (`[UnitData(..), ..]` and
    /// `[BuildingData(..), ..]`).
    ///
    /// # Errors
    ///
    /// Returns an error if either document fails to parse, a definition is
    /// invalid, or an id is duplicated.
    pub fn from_ron(units: &str, buildings: &str) -> Result<Self> {
        let units: Vec<UnitData> = parse_ron("units.ron", units)?;
        let buildings: Vec<BuildingData> = parse_ron("buildings.ron", buildings)?;

        let mut library = Self::new();
        for unit in units {
            library.insert_unit(unit)?;
        }
        for building in buildings {
            library.insert_building(building)?;
        }
        Ok(library)
    }

    /// Add a validated unit definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid or the id is taken.
    pub fn insert_unit(&mut self, unit: UnitData) -> Result<()> {
        unit.validate()?;
        if self.units.contains_key(&unit.id) {
            return Err(GameError::InvalidData(format!(
                "duplicate unit template '{}'",
                unit.id
            )));
        }
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Add a validated building definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid or the id is taken.
    pub fn insert_building(&mut self, building: BuildingData) -> Result<()> {
        building.validate()?;
        if self.buildings.contains_key(&building.id) {
            return Err(GameError::InvalidData(format!(
                "duplicate building template '{}'",
                building.id
            )));
        }
        self.buildings.insert(building.id.clone(), building);
        Ok(())
    }

    /// Look up a unit definition.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitData> {
        self.units.get(id)
    }

    /// Look up a building definition.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&BuildingData> {
        self.buildings.get(id)
    }

    /// All unit definitions in id order.
    pub fn units(&self) -> impl Iterator<Item = &UnitData> {
        self.units.values()
    }

    /// All building definitions in id order.
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingData> {
        self.buildings.values()
    }
}
