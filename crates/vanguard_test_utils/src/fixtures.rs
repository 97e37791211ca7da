//! Test fixtures and helpers.
//!
//! Pre-built templates, factions and worlds for consistent testing, plus a
//! perception stand-in whose sight lines tests script by hand.
//!
//! Fixture factions:
//!
//! | id | name  | alliance | relation to [`BLUE`] |
//! |----|-------|----------|----------------------|
//! | 1  | Blue  | 1        | self                 |
//! | 2  | Red   | 2        | hostile              |
//! | 3  | Green | 1        | allied               |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use fixed::types::I32F32;
use vanguard_core::entity::{Body, EntityId, EntityStorage};
use vanguard_core::prelude::*;

/// The player faction of fixture worlds.
pub const BLUE: FactionId = FactionId(1);
/// Hostile to [`BLUE`] and [`GREEN`].
pub const RED: FactionId = FactionId(2);
/// Allied with [`BLUE`].
pub const GREEN: FactionId = FactionId(3);

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats for time.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A point on the ground plane.
#[must_use]
pub const fn ground(x: f32, z: f32) -> Vec3 {
    Vec3::new(x, 0.0, z)
}

/// Melee infantry: 60 health, engages at 1.5, guards 6.
#[must_use]
pub fn footman() -> UnitData {
    UnitData {
        id: "footman".into(),
        name: "Footman".into(),
        health: 60,
        speed: 3.0,
        stopping_distance: 0.1,
        engage_distance: 1.5,
        guard_distance: 6.0,
        damage: DamageRange { min: 4, max: 7 },
        projectile: None,
        tags: vec!["infantry".into()],
    }
}

/// Ranged infantry firing projectiles at 12 units per second.
#[must_use]
pub fn archer() -> UnitData {
    UnitData {
        id: "archer".into(),
        name: "Archer".into(),
        health: 40,
        speed: 3.0,
        stopping_distance: 0.1,
        engage_distance: 5.0,
        guard_distance: 8.0,
        damage: DamageRange { min: 3, max: 5 },
        projectile: Some(ProjectileData { speed: 12.0 }),
        tags: vec!["infantry".into(), "ranged".into()],
    }
}

/// A unit with exactly 10 health that deals a fixed 5 damage.
#[must_use]
pub fn peasant() -> UnitData {
    UnitData {
        id: "peasant".into(),
        name: "Peasant".into(),
        health: 10,
        speed: 2.0,
        stopping_distance: 0.1,
        engage_distance: 1.0,
        guard_distance: 3.0,
        damage: DamageRange::fixed(5),
        projectile: None,
        tags: Vec::new(),
    }
}

/// An armed tower shooting arrows within 7 units.
#[must_use]
pub fn guard_tower() -> BuildingData {
    BuildingData {
        id: "guard_tower".into(),
        name: "Guard Tower".into(),
        health: 200,
        guard_distance: 9.0,
        weapon: Some(WeaponData {
            damage: DamageRange { min: 6, max: 9 },
            engage_distance: 7.0,
            projectile: Some(ProjectileData { speed: 15.0 }),
        }),
        burn_points: 4,
        tags: vec!["defense".into()],
    }
}

/// An unarmed building with the standard four burn points.
#[must_use]
pub fn farm() -> BuildingData {
    BuildingData {
        id: "farm".into(),
        name: "Farm".into(),
        health: 100,
        guard_distance: 4.0,
        weapon: None,
        burn_points: 4,
        tags: Vec::new(),
    }
}

/// Every fixture template.
///
/// # Panics
///
/// Panics if a fixture template fails validation.
#[must_use]
pub fn template_library() -> TemplateLibrary {
    let mut library = TemplateLibrary::new();
    for unit in [footman(), archer(), peasant()] {
        library.insert_unit(unit).expect("fixture unit is valid");
    }
    for building in [guard_tower(), farm()] {
        library
            .insert_building(building)
            .expect("fixture building is valid");
    }
    library
}

/// Blue, Red and Green; Blue and Green share an alliance.
#[must_use]
pub fn faction_data() -> Vec<FactionData> {
    vec![
        FactionData {
            id: BLUE,
            name: "Blue".into(),
            color: FactionColor::Blue,
            alliance_id: 1,
        },
        FactionData {
            id: RED,
            name: "Red".into(),
            color: FactionColor::Red,
            alliance_id: 2,
        },
        FactionData {
            id: GREEN,
            name: "Green".into(),
            color: FactionColor::Green,
            alliance_id: 1,
        },
    ]
}

/// Default configuration at 20 ticks per second.
#[must_use]
pub fn test_config() -> WorldConfig {
    WorldConfig {
        tick_rate: 20,
        ..WorldConfig::default()
    }
}

/// A fixture world with default collaborators.
///
/// # Panics
///
/// Panics if the fixture configuration is rejected.
#[must_use]
pub fn test_world() -> World {
    test_world_with(test_config())
}

/// A fixture world with a custom configuration.
///
/// # Panics
///
/// Panics if `config` is rejected.
#[must_use]
pub fn test_world_with(config: WorldConfig) -> World {
    World::new(config, &faction_data(), template_library()).expect("fixture world")
}

/// Spawn a unit from a fixture template.
///
/// # Panics
///
/// Panics if the spawn is rejected.
pub fn spawn(world: &mut World, template: &str, faction: FactionId, position: Vec3) -> EntityId {
    world
        .spawn_unit(UnitSpawn::new(template, faction, position))
        .expect("fixture spawn")
}

/// Spawn a unit that starts on guard at `position`.
///
/// # Panics
///
/// Panics if the spawn is rejected.
pub fn spawn_guard(
    world: &mut World,
    template: &str,
    faction: FactionId,
    position: Vec3,
) -> EntityId {
    world
        .spawn_unit(UnitSpawn::new(template, faction, position).guarding())
        .expect("fixture spawn")
}

/// Run `ticks` ticks and collect their events.
pub fn run_ticks(world: &mut World, ticks: u64) -> Vec<TickEvents> {
    (0..ticks).map(|_| world.tick()).collect()
}

/// Tick until `done` holds, returning how many ticks it took.
///
/// Returns `None` if `done` still fails after `max_ticks`.
pub fn run_until(
    world: &mut World,
    max_ticks: u64,
    mut done: impl FnMut(&World) -> bool,
) -> Option<u64> {
    for ran in 0..=max_ticks {
        if done(world) {
            return Some(ran);
        }
        world.tick();
    }
    None
}

/// Perception whose sight lines are set by the test.
///
/// Clones share the same script, so a test keeps one handle after handing
/// another to the world. Observers with no script see nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPerception {
    sight: Rc<RefCell<BTreeMap<EntityId, Vec<EntityId>>>>,
}

impl ScriptedPerception {
    /// A perception where nobody sees anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `observer` see exactly `seen`.
    pub fn set_visible(&self, observer: EntityId, seen: &[EntityId]) {
        let mut seen = seen.to_vec();
        seen.sort_unstable();
        seen.dedup();
        self.sight.borrow_mut().insert(observer, seen);
    }

    /// Blind `observer`.
    pub fn clear(&self, observer: EntityId) {
        self.sight.borrow_mut().remove(&observer);
    }
}

impl Perception for ScriptedPerception {
    fn visible_entities(&self, observer: &Body, entities: &EntityStorage) -> Vec<EntityId> {
        self.sight
            .borrow()
            .get(&observer.id)
            .map(|seen| {
                seen.iter()
                    .copied()
                    .filter(|&id| id != observer.id && entities.contains(id))
                    .collect()
            })
            .unwrap_or_default()
    }
}
