//! Skirmish scenarios.
//!
//! A scenario places labelled units and buildings on the ground plane and
//! gives them their opening orders. Templates and factions come from a
//! [`DataSet`]; the scenario only refers to them by id.
//!
//! ```ron
//! Scenario(
//!     name: "Bridge ambush",
//!     ticks: 600,
//!     units: [
//!         (label: Some("sentry"), template: "footman", faction: 1, position: (0.0, 0.0), guarding: true),
//!         (label: Some("raider"), template: "archer", faction: 2, position: (0.0, 20.0)),
//!     ],
//!     orders: [
//!         (unit: "raider", order: AttackMoveTo((0.0, -5.0))),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vanguard_core::command::Command;
use vanguard_core::entity::EntityId;
use vanguard_core::factions::FactionId;
use vanguard_core::math::Vec3;
use vanguard_core::world::{BuildingSpawn, UnitSpawn, World};

use crate::loader::{DataSet, ToolError};

/// Ticks simulated when a scenario does not say.
pub const DEFAULT_SCENARIO_TICKS: u64 = 1200;

const fn default_ticks() -> u64 {
    DEFAULT_SCENARIO_TICKS
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Damage seed; overrides the data directory's world config.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Ticks to simulate.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Faction the fog of war is computed for.
    #[serde(default)]
    pub player: Option<FactionId>,
    /// Starting units.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Starting buildings.
    #[serde(default)]
    pub buildings: Vec<BuildingPlacement>,
    /// Opening orders, issued in order after everything is placed.
    #[serde(default)]
    pub orders: Vec<ScenarioOrder>,
}

/// A unit placed on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Name other entries use to refer to this unit.
    #[serde(default)]
    pub label: Option<String>,
    /// Unit template id.
    pub template: String,
    /// Owning faction.
    pub faction: FactionId,
    /// Ground position `(x, z)`.
    pub position: (f32, f32),
    /// Spawn guarding the spawn point instead of idling.
    #[serde(default)]
    pub guarding: bool,
}

/// A building placed on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingPlacement {
    /// Name other entries use to refer to this building.
    #[serde(default)]
    pub label: Option<String>,
    /// Building template id.
    pub template: String,
    /// Owning faction.
    pub faction: FactionId,
    /// Ground position `(x, z)`.
    pub position: (f32, f32),
}

/// An opening order for a labelled unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOrder {
    /// Label of the unit receiving the order.
    pub unit: String,
    /// The order.
    pub order: OrderKind,
    /// Append to the queue instead of replacing it.
    #[serde(default)]
    pub queued: bool,
}

/// Orders expressible in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Move to a ground position.
    MoveTo((f32, f32)),
    /// Attack-move to a ground position.
    AttackMoveTo((f32, f32)),
    /// Guard a ground position.
    Guard((f32, f32)),
    /// Attack a labelled unit or building.
    AttackTarget(String),
    /// Drop every order.
    Stop,
}

/// A scenario placed into a fresh world.
#[derive(Debug)]
pub struct Deployment {
    /// The populated world.
    pub world: World,
    /// Entity ids by label.
    pub labels: BTreeMap<String, EntityId>,
    /// Orders the units refused.
    pub refused_orders: usize,
}

const fn ground((x, z): (f32, f32)) -> Vec3 {
    Vec3::new(x, 0.0, z)
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ToolError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ToolError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ToolError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Check every reference in the scenario against a data set.
    ///
    /// Returns the first problem found.
    pub fn check(&self, data: &DataSet) -> Result<(), ToolError> {
        let faction_known = |id: FactionId| data.factions.iter().any(|f| f.id == id);
        let mut labels = Vec::new();

        for unit in &self.units {
            if data.templates.unit(&unit.template).is_none() {
                return Err(invalid(format!("unknown unit template '{}'", unit.template)));
            }
            if !faction_known(unit.faction) {
                return Err(invalid(format!("unknown faction {}", unit.faction.0)));
            }
            labels.extend(unit.label.iter().cloned());
        }
        for building in &self.buildings {
            if data.templates.building(&building.template).is_none() {
                return Err(invalid(format!(
                    "unknown building template '{}'",
                    building.template
                )));
            }
            if !faction_known(building.faction) {
                return Err(invalid(format!("unknown faction {}", building.faction.0)));
            }
            labels.extend(building.label.iter().cloned());
        }

        let label_count = labels.len();
        labels.sort();
        labels.dedup();
        if labels.len() != label_count {
            return Err(invalid("duplicate label".to_string()));
        }

        if let Some(player) = self.player {
            if !faction_known(player) {
                return Err(invalid(format!("unknown player faction {}", player.0)));
            }
        }

        let unit_labels: Vec<&str> = self
            .units
            .iter()
            .filter_map(|u| u.label.as_deref())
            .collect();
        for order in &self.orders {
            if !unit_labels.contains(&order.unit.as_str()) {
                return Err(invalid(format!("order for unknown unit '{}'", order.unit)));
            }
            if let OrderKind::AttackTarget(target) = &order.order {
                if labels.binary_search(target).is_err() {
                    return Err(invalid(format!("attack on unknown label '{target}'")));
                }
            }
        }
        Ok(())
    }

    /// Build a world from `data` and place the scenario in it.
    ///
    /// `seed` overrides both the scenario's and the data set's seed.
    pub fn deploy(&self, data: &DataSet, seed: Option<u64>) -> Result<Deployment, ToolError> {
        self.check(data)?;
        let mut world = data.build_world(seed.or(self.seed))?;
        if let Some(player) = self.player {
            world.set_player_faction(player)?;
        }

        let mut labels = BTreeMap::new();
        for placement in &self.units {
            let mut spawn = UnitSpawn::new(
                placement.template.as_str(),
                placement.faction,
                ground(placement.position),
            );
            if placement.guarding {
                spawn = spawn.guarding();
            }
            let id = world.spawn_unit(spawn)?;
            if let Some(label) = &placement.label {
                labels.insert(label.clone(), id);
            }
        }
        for placement in &self.buildings {
            let id = world.spawn_building(BuildingSpawn::new(
                placement.template.as_str(),
                placement.faction,
                ground(placement.position),
            ))?;
            if let Some(label) = &placement.label {
                labels.insert(label.clone(), id);
            }
        }

        let mut refused_orders = 0;
        for order in &self.orders {
            let unit = lookup(&labels, &order.unit)?;
            let command = match &order.order {
                OrderKind::MoveTo(at) => Command::MoveTo(ground(*at)),
                OrderKind::AttackMoveTo(at) => Command::AttackMoveTo(ground(*at)),
                OrderKind::Guard(at) => Command::Guard(ground(*at)),
                OrderKind::AttackTarget(target) => Command::AttackTarget(lookup(&labels, target)?),
                OrderKind::Stop => Command::Stop,
            };
            if !world.issue_command(unit, command, !order.queued)? {
                tracing::warn!(unit = %order.unit, ?command, "order refused");
                refused_orders += 1;
            }
        }

        tracing::info!(
            scenario = %self.name,
            units = self.units.len(),
            buildings = self.buildings.len(),
            orders = self.orders.len(),
            "scenario deployed"
        );

        Ok(Deployment {
            world,
            labels,
            refused_orders,
        })
    }
}

fn lookup(labels: &BTreeMap<String, EntityId>, label: &str) -> Result<EntityId, ToolError> {
    labels
        .get(label)
        .copied()
        .ok_or_else(|| invalid(format!("unknown label '{label}'")))
}

fn invalid(message: String) -> ToolError {
    ToolError::InvalidScenario(message)
}
