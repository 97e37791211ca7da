//! Error types for the simulation core.
//!
//! Note that a *rejected command* is not an error: units refuse invalid
//! orders silently. These variants cover caller mistakes (unknown ids,
//! unknown templates) and bad data files.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// The entity exists but has no command queue (e.g. a building).
    #[error("Entity {0} does not accept commands")]
    NotCommandable(u64),

    /// No template registered under this id.
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// No faction registered under this id.
    #[error("Unknown faction: {0}")]
    UnknownFaction(u32),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or logical name) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data parsed but violates a rule (negative ranges, zero health, ...).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid simulation state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
