//! Faction data structure.

use serde::{Deserialize, Serialize};

use crate::factions::{FactionColor, FactionId};

/// Faction definition.
///
/// # Example RON
///
/// ```ron
/// FactionData(
///     id: 1,
///     name: "Kingdom of Aldren",
///     color: blue,
///     alliance_id: 1,
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FactionData {
    /// Faction identifier.
    pub id: FactionId,

    /// Display name.
    pub name: String,

    /// Team color.
    #[serde(default)]
    pub color: FactionColor,

    /// Alliance identifier. Factions sharing a non-zero id are allies;
    /// `0` allies with nobody.
    #[serde(default)]
    pub alliance_id: u32,
}
