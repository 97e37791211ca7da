//! The destructible entity shape shared by units and buildings, and the
//! storage that owns every entity of a world.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::factions::FactionId;
use crate::math::Vec3;
use crate::unit::Unit;

/// Unique identifier for entities.
pub type EntityId = u64;

/// Health of a destructible entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health at full.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if health is depleted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction so health bottoms out at zero.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }

    /// Health as a fraction of maximum in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }
}

/// Where an entity is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Registered and taking part in the simulation.
    Alive,
    /// Death procedure ran; the corpse is fading and sinking.
    Decaying,
}

/// State every destructible entity carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Entity identifier.
    pub id: EntityId,
    /// Template display name.
    pub name: String,
    /// Owning faction (not owned by the entity).
    pub faction: FactionId,
    /// World position.
    pub position: Vec3,
    /// Facing direction (unit length).
    pub forward: Vec3,
    /// Runtime health, copied from the template at spawn.
    pub health: Health,
    /// Vision and guard radius.
    pub guard_distance: f32,
    /// Whether the player faction can currently see this entity.
    pub visible: bool,
    /// Whether the entity takes part in collision and selection.
    pub interactive: bool,
    /// Whether the entity currently reveals hostiles to the player.
    pub reveals: bool,
    /// Whether the entity is selected.
    pub selected: bool,
    /// Opacity of the vision radius decal, `[0, 1]`.
    pub vision_alpha: f32,
    /// Combat-ready animation blend, `[0, 1]`.
    pub combat_ready: f32,
    /// Depth sunk into the ground while decaying.
    pub sunk: f32,
    /// Life stage.
    pub lifecycle: Lifecycle,
}

impl Body {
    /// Create a body at full health.
    #[must_use]
    pub fn new(name: String, faction: FactionId, position: Vec3, health: u32) -> Self {
        Self {
            id: 0,
            name,
            faction,
            position,
            forward: Vec3::FORWARD,
            health: Health::new(health),
            guard_distance: 0.0,
            visible: false,
            interactive: true,
            reveals: false,
            selected: false,
            vision_alpha: 0.0,
            combat_ready: 0.0,
            sunk: 0.0,
            lifecycle: Lifecycle::Alive,
        }
    }

    /// Radius within which this entity sees others.
    #[must_use]
    pub fn vision_radius(&self) -> f32 {
        self.guard_distance
    }
}

/// The behavior half of an entity.
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// A mobile unit with a command queue.
    Unit(Box<Unit>),
    /// A static building.
    Building(Box<Building>),
}

/// A unit or building.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Shared destructible state.
    pub body: Body,
    /// Unit or building behavior.
    pub kind: EntityKind,
}

impl Entity {
    /// Entity identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.body.id
    }

    /// Whether the entity's state machine is in its dead state.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        match &self.kind {
            EntityKind::Unit(unit) => unit.is_dead(),
            EntityKind::Building(building) => building.is_dead(),
        }
    }

    /// The unit behavior, if this is a unit.
    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Building(_) => None,
        }
    }

    /// The unit behavior, mutably.
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Building(_) => None,
        }
    }

    /// The building behavior, if this is a building.
    #[must_use]
    pub fn as_building(&self) -> Option<&Building> {
        match &self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) => None,
        }
    }
}

/// Storage for all entities of a world, alive or decaying.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when processing systems.
#[derive(Debug, Clone, Default)]
pub struct EntityStorage {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.body.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Take an entity out for exclusive processing.
    ///
    /// Must be followed by [`restore`](Self::restore).
    pub(crate) fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Put back an entity previously taken out.
    pub(crate) fn restore(&mut self, entity: Entity) {
        self.entities.insert(entity.id(), entity);
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    /// `true` if the id refers to an entity that is not dead.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| !e.is_dead())
    }
}
