//! World tests: spawning, fog of war, selection, factions and determinism.

use std::cell::RefCell;
use std::rc::Rc;

use vanguard_core::prelude::*;
use vanguard_test_utils::determinism::{find_first_divergence, verify_world_determinism};
use vanguard_test_utils::fixtures::{
    faction_data, ground, run_ticks, spawn, spawn_guard, template_library, test_config, test_world,
    test_world_with, BLUE, GREEN, RED,
};
use vanguard_test_utils::proptest::prelude::*;

fn visible(world: &World, id: EntityId) -> bool {
    world.entity(id).expect("entity exists").body.visible
}

// =============================================================================
// Spawning
// =============================================================================

#[test]
fn test_spawn_registers_in_live_list_and_faction() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let farm = world
        .spawn_building(BuildingSpawn::new("farm", BLUE, ground(4.0, 0.0)))
        .unwrap();

    assert_eq!(world.live_entities(), &[unit, farm]);
    let blue = world.factions().get(BLUE).unwrap();
    assert_eq!(blue.units(), &[unit]);
    assert_eq!(blue.buildings(), &[farm]);
    assert!(world.navigation().remaining_distance(unit) <= f32::EPSILON);
}

#[test]
fn test_spawned_unit_owns_template_copy() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    world.suffer_attack(unit, 10).unwrap();

    assert_eq!(world.unit(unit).unwrap().template().health, 60);
    assert_eq!(world.templates().unit("footman").unwrap().health, 60);
    assert_eq!(world.entity(unit).unwrap().body.health.current, 50);
}

#[test]
fn test_spawn_rejects_bad_input() {
    let mut world = test_world();

    assert!(matches!(
        world.spawn_unit(UnitSpawn::new("dragon", BLUE, Vec3::ZERO)),
        Err(GameError::UnknownTemplate(name)) if name == "dragon"
    ));
    assert!(matches!(
        world.spawn_unit(UnitSpawn::new("footman", FactionId(9), Vec3::ZERO)),
        Err(GameError::UnknownFaction(9))
    ));
    assert!(matches!(
        world.spawn_unit(UnitSpawn::new("footman", BLUE, Vec3::NAN)),
        Err(GameError::InvalidData(_))
    ));
    assert!(matches!(
        world.spawn_building(BuildingSpawn::new("castle", BLUE, Vec3::ZERO)),
        Err(GameError::UnknownTemplate(_))
    ));
    assert!(world.live_entities().is_empty());
}

#[test]
fn test_invalid_initial_state_spawns_idle() {
    let mut world = test_world();
    let mut request = UnitSpawn::new("footman", BLUE, Vec3::ZERO);
    request.initial_state = UnitState::Attacking;
    let unit = world.spawn_unit(request).unwrap();

    assert_eq!(world.unit(unit).unwrap().state(), UnitState::Idle);
    assert!(world.unit(unit).unwrap().queue().is_empty());
}

#[test]
fn test_guarding_spawn_dispatches_guard_on_first_tick() {
    let mut world = test_world();
    let unit = spawn_guard(&mut world, "footman", BLUE, ground(2.0, 3.0));

    assert_eq!(world.unit(unit).unwrap().state(), UnitState::Idle);
    world.tick();
    assert_eq!(world.unit(unit).unwrap().state(), UnitState::Guarding);
}

#[test]
fn test_duplicate_faction_ids_rejected() {
    let mut factions = faction_data();
    factions.push(factions[0].clone());
    let result = World::new(test_config(), &factions, template_library());
    assert!(matches!(result, Err(GameError::InvalidData(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let config = WorldConfig {
        tick_rate: 0,
        ..WorldConfig::default()
    };
    assert!(World::new(config, &faction_data(), TemplateLibrary::new()).is_err());
}

// =============================================================================
// Fog of war
// =============================================================================

#[test]
fn test_hostile_revealed_and_hidden_by_vision_radius() {
    let mut world = test_world();
    let scout = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(20.0, 0.0));

    assert!(visible(&world, scout));
    world.tick();
    assert!(!visible(&world, hostile));

    world.teleport(hostile, ground(3.0, 0.0)).unwrap();
    let events = world.tick();
    assert!(visible(&world, hostile));
    assert!(events.signals.contains(&Signal::Visibility {
        entity: hostile,
        visible: true,
    }));
    assert!(events
        .signals
        .contains(&Signal::HealthbarShown { entity: hostile }));

    world.teleport(hostile, ground(20.0, 0.0)).unwrap();
    let events = world.tick();
    assert!(!visible(&world, hostile));
    assert!(events
        .signals
        .contains(&Signal::DisappearedInFog { entity: hostile }));
}

#[test]
fn test_allies_always_visible() {
    let mut world = test_world();
    let ally = spawn(&mut world, "footman", GREEN, ground(90.0, 90.0));
    run_ticks(&mut world, 3);
    assert!(visible(&world, ally));
    assert!(world.entity(ally).unwrap().body.reveals);
}

#[test]
fn test_corpse_reveals_until_hide_delay() {
    let mut world = test_world();
    let scout = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(3.0, 0.0));
    world.tick();
    assert!(visible(&world, hostile));

    world.kill(scout).unwrap();
    world.tick();
    assert!(visible(&world, hostile));

    run_ticks(&mut world, 20);
    assert!(!visible(&world, hostile));
}

#[test]
fn test_player_allied_units_fade_vision_in() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(50.0, 0.0));

    run_ticks(&mut world, 30);
    assert!((world.entity(unit).unwrap().body.vision_alpha - 1.0).abs() <= f32::EPSILON);
    assert!(world.entity(hostile).unwrap().body.vision_alpha.abs() <= f32::EPSILON);
}

#[test]
fn test_switching_player_faction_recomputes_fog() {
    let mut world = test_world();
    let blue = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let red = spawn(&mut world, "footman", RED, ground(40.0, 0.0));
    world.tick();

    world.set_player_faction(RED).unwrap();
    assert_eq!(world.player_faction(), RED);
    assert!(visible(&world, red));
    assert!(!visible(&world, blue));

    assert!(matches!(
        world.set_player_faction(FactionId(42)),
        Err(GameError::UnknownFaction(42))
    ));
}

// =============================================================================
// Selection and platoons
// =============================================================================

#[test]
fn test_select_only_live_units() {
    let mut world = test_world();
    let a = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let b = spawn(&mut world, "footman", BLUE, ground(1.0, 0.0));
    let dead = spawn(&mut world, "footman", BLUE, ground(2.0, 0.0));
    let farm = world
        .spawn_building(BuildingSpawn::new("farm", BLUE, ground(4.0, 0.0)))
        .unwrap();
    world.kill(dead).unwrap();

    assert_eq!(world.select(&[a, b, b, dead, farm, 999]), 2);
    assert_eq!(world.selection().units(), &[a, b]);
    assert!(world.entity(a).unwrap().body.selected);

    let events = world.tick();
    assert!(events.signals.contains(&Signal::Selected {
        entity: a,
        selected: true,
    }));
}

#[test]
fn test_orders_to_selection() {
    let mut world = test_world();
    let a = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let b = spawn(&mut world, "footman", BLUE, ground(1.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(10.0, 0.0));
    world.select(&[a, b]);

    assert_eq!(world.move_selection_to(ground(5.0, 5.0), false), 2);
    assert_eq!(world.attack_move_selection_to(ground(8.0, 0.0), true), 2);
    assert_eq!(
        world.unit(a).unwrap().queue().iter().copied().collect::<Vec<_>>(),
        vec![
            Command::MoveTo(ground(5.0, 5.0)),
            Command::AttackMoveTo(ground(8.0, 0.0)),
        ]
    );

    assert_eq!(world.attack_target_with_selection(hostile, false), 2);
    assert_eq!(
        world.unit(b).unwrap().queue().current(),
        Some(&Command::AttackTarget(hostile))
    );
    assert_eq!(world.unit(b).unwrap().queue().len(), 1);
}

#[test]
fn test_death_removes_from_selection_and_platoons() {
    let mut world = test_world();
    let a = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let b = spawn(&mut world, "footman", BLUE, ground(1.0, 0.0));

    let platoon = Rc::new(RefCell::new(Platoon::new()));
    platoon.borrow_mut().add(a);
    platoon.borrow_mut().add(b);
    let members = Rc::clone(&platoon);
    world.on_death(move |id| {
        members.borrow_mut().remove(id);
    });

    world.select(&[a, b]);
    world.kill(a).unwrap();

    assert_eq!(world.selection().units(), &[b]);
    assert_eq!(platoon.borrow().units(), &[b]);
    assert!(!world.entity(a).unwrap().body.selected);

    let events = world.tick();
    assert!(events.signals.contains(&Signal::Selected {
        entity: a,
        selected: false,
    }));
}

#[test]
fn test_clear_selection_deselects() {
    let mut world = test_world();
    let a = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    world.select(&[a]);
    world.clear_selection();

    assert!(world.selection().is_empty());
    assert!(!world.entity(a).unwrap().body.selected);
    assert_eq!(world.move_selection_to(ground(1.0, 0.0), false), 0);
}

// =============================================================================
// Clock and determinism
// =============================================================================

#[test]
fn test_clock_advances_by_tick_duration() {
    let mut world = test_world_with(WorldConfig {
        tick_rate: 10,
        ..test_config()
    });
    run_ticks(&mut world, 10);
    assert_eq!(world.current_tick(), 10);
    assert_eq!(world.time(), Fixed::from_num(1));

    run_ticks(&mut world, 36_000);
    assert_eq!(world.time(), Fixed::from_num(3601));
}

#[test]
fn test_guard_scan_fires_on_the_tick_its_interval_ends() {
    let mut world = test_world();
    let guard = spawn_guard(&mut world, "footman", BLUE, ground(0.0, 0.0));
    spawn(&mut world, "footman", RED, ground(2.0, 0.0));

    // 20 Hz with a one second interval: ticks 0 through 19 hold the post.
    run_ticks(&mut world, 20);
    assert_eq!(world.time(), Fixed::from_num(1));
    assert_eq!(world.unit(guard).unwrap().queue().len(), 1);

    world.tick();
    assert_eq!(world.unit(guard).unwrap().queue().len(), 2);
}

fn battle() -> World {
    let mut world = test_world();
    for i in 0..6 {
        let x = i as f32 * 1.5;
        spawn_guard(&mut world, "footman", BLUE, ground(x, 0.0));
        let raider = spawn(&mut world, "footman", RED, ground(x, 10.0));
        world
            .issue_command(raider, Command::AttackMoveTo(ground(x, -5.0)), false)
            .unwrap();
    }
    world
        .spawn_building(BuildingSpawn::new("guard_tower", BLUE, ground(4.0, -2.0)))
        .unwrap();
    world
}

#[test]
fn test_battle_is_deterministic() {
    assert!(verify_world_determinism(battle, 400));
    assert_eq!(find_first_divergence(battle, 200), None);
}

#[test]
fn test_battle_engages_both_sides() {
    let mut world = battle();
    run_ticks(&mut world, 200);

    let engaged = world
        .live_entities()
        .iter()
        .filter_map(|&id| world.unit(id))
        .filter(|unit| {
            matches!(
                unit.state(),
                UnitState::Attacking | UnitState::MovingToTarget
            )
        })
        .count();
    assert!(engaged > 0);
}

#[test]
fn test_different_seeds_diverge_under_combat() {
    let fight = |seed: u64| {
        let mut world = test_world_with(WorldConfig {
            seed,
            ..test_config()
        });
        let a = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
        let b = spawn(&mut world, "footman", RED, ground(0.0, 1.0));
        world
            .issue_command(a, Command::AttackTarget(b), false)
            .unwrap();
        world.tick();
        let mut dealt = Vec::new();
        for _ in 0..8 {
            world.trigger_attack_anim_event(a).unwrap();
            dealt.extend(world.tick().damage.iter().map(|d| d.amount));
        }
        dealt
    };
    assert_eq!(fight(7), fight(7));
    let rolls: Vec<Vec<u32>> = (0..6).map(fight).collect();
    assert!(rolls.windows(2).any(|w| w[0] != w[1]));
}

// =============================================================================
// Property tests
// =============================================================================

proptest! {
    #[test]
    fn prop_alliance_symmetric(a in 0u32..6, aa in 0u32..4, b in 0u32..6, ba in 0u32..4) {
        let (fa, fb) = (FactionId(a), FactionId(b));
        prop_assert_eq!(is_allied(fa, aa, fb, ba), is_allied(fb, ba, fa, aa));
    }

    #[test]
    fn prop_no_alliance_allies_nobody_else(a in 0u32..6, b in 0u32..6, ba in 0u32..4) {
        prop_assume!(a != b);
        prop_assert!(!is_allied(FactionId(a), 0, FactionId(b), ba));
    }

    #[test]
    fn prop_faction_allied_with_itself(a in 0u32..6, aa in 0u32..4) {
        prop_assert!(is_allied(FactionId(a), aa, FactionId(a), aa));
    }
}
