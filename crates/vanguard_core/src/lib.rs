//! # Vanguard Core
//!
//! Unit command and combat AI for a real-time-strategy game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering (presentation is a stream of [`presentation::Signal`]s)
//! - No IO (data is parsed from strings, files are the caller's business)
//! - No system randomness (damage rolls use a seeded RNG)
//!
//! Units accept discrete orders into a per-unit command queue. A dequeue
//! loop feeds the queue to a state machine that runs every tick, consults
//! navigation and perception, interrupts itself when hostiles show up and
//! resolves combat, death and decay.
//!
//! ## Crate Structure
//!
//! - [`command`] / [`command_queue`] - Orders, the queue and the dequeue loop
//! - [`unit`] / [`building`] - Entity state machines
//! - [`world`] - Entity registry and the tick
//! - [`factions`] - Alliance predicate and membership
//! - [`scheduler`] - Timers and timed procedures
//! - [`navigation`] / [`perception`] - Collaborator contracts
//! - [`data`] / [`config`] - RON templates and tuning

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod building;
pub mod command;
pub mod command_queue;
pub mod config;
mod context;
pub mod data;
pub mod entity;
pub mod error;
pub mod factions;
pub mod math;
pub mod navigation;
pub mod perception;
pub mod platoon;
pub mod presentation;
pub mod projectile;
pub mod scheduler;
pub mod unit;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::building::{Building, BuildingState};
    pub use crate::command::{Command, CommandType};
    pub use crate::command_queue::CommandQueue;
    pub use crate::config::WorldConfig;
    pub use crate::data::{
        BuildingData, DamageRange, FactionData, ProjectileData, TemplateLibrary, UnitData,
        WeaponData,
    };
    pub use crate::entity::{Body, Entity, EntityId, Health, Lifecycle};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{is_allied, FactionColor, FactionId, FactionRegistry};
    pub use crate::math::{Fixed, Vec3};
    pub use crate::navigation::{AgentParams, DirectNavigation, Navigation};
    pub use crate::perception::{Perception, RadiusPerception};
    pub use crate::platoon::Platoon;
    pub use crate::presentation::{DamageEvent, Signal, TickEvents};
    pub use crate::unit::{Unit, UnitState};
    pub use crate::world::{BuildingSpawn, UnitSpawn, World};
}
