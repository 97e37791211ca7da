//! # Vanguard Development Tools
//!
//! File-facing tooling around the simulation core:
//! - Data directory loading ([`loader`])
//! - Data validation ([`validate`])
//! - Scenario files ([`scenario`])
//! - Headless skirmish runs ([`skirmish`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod loader;
pub mod scenario;
pub mod skirmish;
pub mod validate;

pub use loader::{DataSet, ToolError};
