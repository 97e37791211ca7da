//! Data validation.
//!
//! Loads a data directory the same way a game would, then looks for
//! problems the loader accepts but a designer probably did not intend.
//! Scenarios under `scenarios/` are checked against the data as well.

use std::fs;
use std::path::{Path, PathBuf};

use vanguard_core::data::BURN_POINT_COUNT;
use vanguard_core::factions::FactionRegistry;
use vanguard_core::world::World;

use crate::loader::{DataSet, ToolError};
use crate::scenario::Scenario;

/// Subdirectory holding scenario files.
pub const SCENARIO_DIR: &str = "scenarios";

/// Result of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Factions defined.
    pub factions: usize,
    /// Unit templates defined.
    pub units: usize,
    /// Building templates defined.
    pub buildings: usize,
    /// Scenario files checked.
    pub scenarios: Vec<PathBuf>,
    /// Suspicious but legal data.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether the data is free of warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate every data file in `path`.
///
/// Hard errors (missing files, malformed RON, invalid templates, duplicate
/// faction ids, broken scenarios) fail the call. Softer findings are
/// collected as warnings.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport, ToolError> {
    let data = DataSet::load(path)?;
    let registry = FactionRegistry::from_data(&data.factions)?;
    World::new(data.config.clone(), &data.factions, data.templates.clone())?;

    let mut report = ValidationReport {
        factions: data.factions.len(),
        units: data.templates.units().count(),
        buildings: data.templates.buildings().count(),
        ..ValidationReport::default()
    };

    if data.factions.is_empty() {
        report.warnings.push("no factions defined".to_string());
    }
    let hostile_pair = data.factions.iter().any(|a| {
        data.factions
            .iter()
            .any(|b| registry.is_hostile(a.id, b.id))
    });
    if data.factions.len() > 1 && !hostile_pair {
        report
            .warnings
            .push("every faction is allied; nothing will ever fight".to_string());
    }

    for unit in data.templates.units() {
        if unit.speed <= 0.0 {
            report
                .warnings
                .push(format!("unit '{}' cannot move (speed 0)", unit.id));
        }
        if unit.is_ranged() && unit.engage_distance <= 2.0 * unit.stopping_distance {
            report.warnings.push(format!(
                "ranged unit '{}' engages inside its stopping distance",
                unit.id
            ));
        }
    }
    for building in data.templates.buildings() {
        if building.burn_points != BURN_POINT_COUNT {
            report.warnings.push(format!(
                "building '{}' has {} burn points; burn effects need {}",
                building.id,
                building.burn_points,
                BURN_POINT_COUNT
            ));
        }
        if let Some(weapon) = &building.weapon {
            if weapon.engage_distance > building.guard_distance {
                report.warnings.push(format!(
                    "building '{}' engages beyond its vision",
                    building.id
                ));
            }
        }
    }

    let scenario_dir = path.join(SCENARIO_DIR);
    if scenario_dir.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(&scenario_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "ron"))
            .collect();
        files.sort();
        for file in files {
            let scenario = Scenario::load(&file)?;
            scenario.check(&data)?;
            tracing::debug!(path = %file.display(), "scenario ok");
            report.scenarios.push(file);
        }
    }

    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FACTIONS: &str = r#"[
        FactionData(id: 1, name: "Blue", alliance_id: 1),
        FactionData(id: 2, name: "Red", alliance_id: 2),
    ]"#;

    const UNITS: &str = r#"[
        UnitData(
            id: "archer",
            name: "Archer",
            health: 40,
            speed: 3.0,
            engage_distance: 5.0,
            guard_distance: 8.0,
            damage: (min: 3, max: 5),
            projectile: Some((speed: 12.0)),
        ),
    ]"#;

    fn data_dir(factions: &str, buildings: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("factions.ron"), factions).unwrap();
        fs::write(dir.path().join("units.ron"), UNITS).unwrap();
        fs::write(dir.path().join("buildings.ron"), buildings).unwrap();
        dir
    }

    #[test]
    fn test_clean_directory() {
        let dir = data_dir(FACTIONS, "[]");
        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.factions, 2);
        assert_eq!(report.units, 1);
        assert!(report.is_clean(), "{:?}", report.warnings);
    }

    #[test]
    fn test_all_allied_warns() {
        let dir = data_dir(
            r#"[FactionData(id: 1, name: "A", alliance_id: 5), FactionData(id: 2, name: "B", alliance_id: 5)]"#,
            "[]",
        );
        let report = validate_data_directory(dir.path()).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("allied")));
    }

    #[test]
    fn test_odd_burn_points_warns() {
        let dir = data_dir(
            FACTIONS,
            r#"[BuildingData(id: "hut", name: "Hut", health: 50, guard_distance: 3.0, burn_points: 2)]"#,
        );
        let report = validate_data_directory(dir.path()).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("burn points")));
    }

    #[test]
    fn test_duplicate_faction_fails() {
        let dir = data_dir(
            r#"[FactionData(id: 1, name: "A"), FactionData(id: 1, name: "B")]"#,
            "[]",
        );
        assert!(matches!(
            validate_data_directory(dir.path()),
            Err(ToolError::Game(_))
        ));
    }

    #[test]
    fn test_broken_scenario_fails() {
        let dir = data_dir(FACTIONS, "[]");
        let scenarios = dir.path().join(SCENARIO_DIR);
        fs::create_dir(&scenarios).unwrap();
        fs::write(
            scenarios.join("bad.ron"),
            r#"Scenario(name: "Bad", units: [(template: "knight", faction: 1, position: (0.0, 0.0))])"#,
        )
        .unwrap();

        assert!(matches!(
            validate_data_directory(dir.path()),
            Err(ToolError::InvalidScenario(_))
        ));
    }
}
