//! Data directory loading.
//!
//! A data directory holds the RON files a world is built from:
//!
//! ```text
//! data/
//! ├── factions.ron   [FactionData(..), ..]
//! ├── units.ron      [UnitData(..), ..]
//! ├── buildings.ron  [BuildingData(..), ..]   (optional)
//! └── world.ron      WorldConfig(..)          (optional)
//! ```
//!
//! The core crate only parses strings; this module owns the file IO.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use vanguard_core::config::WorldConfig;
use vanguard_core::data::{FactionData, TemplateLibrary};
use vanguard_core::error::GameError;
use vanguard_core::factions::FactionId;
use vanguard_core::world::World;

/// File listing faction definitions.
pub const FACTIONS_FILE: &str = "factions.ron";
/// File listing unit templates.
pub const UNITS_FILE: &str = "units.ron";
/// File listing building templates.
pub const BUILDINGS_FILE: &str = "buildings.ron";
/// File holding world tuning.
pub const WORLD_FILE: &str = "world.ron";

/// Error type for the tools crate.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required file or directory does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Error reading a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a RON document.
    #[error("Failed to parse RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The data parsed but the simulation rejected it.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Error writing a JSON report.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A scenario refers to something that does not exist.
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
}

/// Everything loaded from one data directory.
#[derive(Debug, Clone)]
pub struct DataSet {
    /// Directory the data came from.
    pub root: PathBuf,
    /// Faction definitions in file order.
    pub factions: Vec<FactionData>,
    /// Unit and building templates.
    pub templates: TemplateLibrary,
    /// World tuning, defaulted when `world.ron` is absent.
    pub config: WorldConfig,
}

impl DataSet {
    /// Load and validate a data directory.
    ///
    /// `factions.ron` and `units.ron` are required; `buildings.ron` and
    /// `world.ron` fall back to empty and default values.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ToolError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ToolError::FileNotFound(dir.display().to_string()));
        }

        let factions: Vec<FactionData> = ron::from_str(&read_required(dir, FACTIONS_FILE)?)?;
        let units = read_required(dir, UNITS_FILE)?;
        let buildings = read_optional(dir, BUILDINGS_FILE)?.unwrap_or_else(|| "[]".to_string());
        let templates = TemplateLibrary::from_ron(&units, &buildings)?;

        let config = match read_optional(dir, WORLD_FILE)? {
            Some(text) => WorldConfig::from_ron(&text)?,
            None => WorldConfig::default(),
        };

        tracing::debug!(
            dir = %dir.display(),
            factions = factions.len(),
            units = templates.units().count(),
            buildings = templates.buildings().count(),
            "loaded data directory"
        );

        Ok(Self {
            root: dir.to_path_buf(),
            factions,
            templates,
            config,
        })
    }

    /// Build a world from this data, overriding the damage seed if given.
    pub fn build_world(&self, seed: Option<u64>) -> Result<World, ToolError> {
        let mut config = self.config.clone();
        if let Some(seed) = seed {
            config.seed = seed;
        }
        Ok(World::new(config, &self.factions, self.templates.clone())?)
    }

    /// Display name of a faction, or its numeric id if unknown.
    pub fn faction_name(&self, id: FactionId) -> String {
        self.factions
            .iter()
            .find(|f| f.id == id)
            .map_or_else(|| format!("faction {}", id.0), |f| f.name.clone())
    }
}

fn read_required(dir: &Path, file: &str) -> Result<String, ToolError> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(ToolError::FileNotFound(path.display().to_string()));
    }
    Ok(fs::read_to_string(path)?)
}

fn read_optional(dir: &Path, file: &str) -> Result<Option<String>, ToolError> {
    let path = dir.join(file);
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "optional data file absent");
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}
