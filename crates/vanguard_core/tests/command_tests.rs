//! Command pipeline tests: issuing, rejection, the dequeue loop and the
//! unit state machine driven through a real world.

use vanguard_core::prelude::*;
use vanguard_test_utils::fixtures::{
    ground, run_ticks, run_until, spawn, spawn_guard, test_world, ScriptedPerception, BLUE, GREEN,
    RED,
};
use vanguard_test_utils::determinism::strategies;
use vanguard_test_utils::proptest::prelude::*;

fn queue_of(world: &World, id: EntityId) -> Vec<Command> {
    world
        .unit(id)
        .expect("unit exists")
        .queue()
        .iter()
        .copied()
        .collect()
}

fn state_of(world: &World, id: EntityId) -> UnitState {
    world.unit(id).expect("unit exists").state()
}

// =============================================================================
// Movement
// =============================================================================

#[test]
fn test_move_to_arrives_then_idles_with_empty_queue() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let target = ground(3.0, 0.0);

    assert!(world
        .issue_command(unit, Command::MoveTo(target), false)
        .unwrap());
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::MovingToSpot);

    let ticks = run_until(&mut world, 100, |w| state_of(w, unit) == UnitState::Idle);
    assert!(ticks.is_some(), "unit never arrived");
    let position = world.entity(unit).unwrap().body.position;
    assert!(position.distance(target) <= 0.1 + 1e-4);

    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::Idle);
    assert!(world.unit(unit).unwrap().queue().is_empty());
}

#[test]
fn test_move_commands_queue_in_order() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));

    world
        .issue_command(unit, Command::MoveTo(ground(1.0, 0.0)), false)
        .unwrap();
    world
        .issue_command(unit, Command::MoveTo(ground(1.0, 1.0)), false)
        .unwrap();
    assert_eq!(queue_of(&world, unit).len(), 2);

    run_until(&mut world, 200, |w| {
        w.unit(unit).unwrap().queue().is_empty() && state_of(w, unit) == UnitState::Idle
    })
    .expect("both moves complete");
    let position = world.entity(unit).unwrap().body.position;
    assert!(position.distance(ground(1.0, 1.0)) <= 0.1 + 1e-4);
}

#[test]
fn test_clear_replaces_pending_orders() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));

    world
        .issue_command(unit, Command::MoveTo(ground(5.0, 0.0)), false)
        .unwrap();
    world
        .issue_command(unit, Command::MoveTo(ground(9.0, 0.0)), false)
        .unwrap();
    world
        .issue_command(unit, Command::MoveTo(ground(0.0, 4.0)), true)
        .unwrap();

    assert_eq!(queue_of(&world, unit), vec![Command::MoveTo(ground(0.0, 4.0))]);
}

#[test]
fn test_insert_command_goes_ahead_of_head() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));

    world
        .issue_command(unit, Command::MoveTo(ground(5.0, 0.0)), false)
        .unwrap();
    world
        .insert_command(unit, Command::Guard(ground(1.0, 1.0)), 0)
        .unwrap();
    world
        .insert_command(unit, Command::MoveTo(ground(2.0, 2.0)), 99)
        .unwrap();

    assert_eq!(
        queue_of(&world, unit),
        vec![
            Command::Guard(ground(1.0, 1.0)),
            Command::MoveTo(ground(5.0, 0.0)),
            Command::MoveTo(ground(2.0, 2.0)),
        ]
    );
}

// =============================================================================
// Stop
// =============================================================================

#[test]
fn test_stop_idles_moving_unit() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));

    world
        .issue_command(unit, Command::MoveTo(ground(20.0, 0.0)), false)
        .unwrap();
    run_ticks(&mut world, 5);
    assert_eq!(state_of(&world, unit), UnitState::MovingToSpot);

    assert!(world.issue_command(unit, Command::Stop, false).unwrap());
    assert!(world.unit(unit).unwrap().queue().is_empty());

    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::Idle);
    assert!(world.unit(unit).unwrap().queue().is_empty());

    let before = world.entity(unit).unwrap().body.position;
    run_ticks(&mut world, 10);
    assert_eq!(world.entity(unit).unwrap().body.position, before);
}

#[test]
fn test_stop_idles_guarding_unit() {
    let mut world = test_world();
    let unit = spawn_guard(&mut world, "footman", BLUE, ground(0.0, 0.0));
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::Guarding);

    world.issue_command(unit, Command::Stop, false).unwrap();
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::Idle);
    assert!(world.unit(unit).unwrap().queue().is_empty());
}

// =============================================================================
// Guard
// =============================================================================

#[test]
fn test_lone_guard_is_never_popped() {
    let mut world = test_world();
    let unit = spawn_guard(&mut world, "footman", BLUE, ground(0.0, 0.0));

    for _ in 0..100 {
        world.tick();
        assert_eq!(
            queue_of(&world, unit),
            vec![Command::Guard(ground(0.0, 0.0))]
        );
    }
    assert_eq!(state_of(&world, unit), UnitState::Guarding);
}

#[test]
fn test_guard_interrupts_stack_last_found_first() {
    let mut world = test_world();
    let guard = spawn_guard(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let first = spawn(&mut world, "footman", RED, ground(2.0, 0.0));
    let second = spawn(&mut world, "footman", RED, ground(4.0, 0.0));
    let far = spawn(&mut world, "footman", RED, ground(30.0, 0.0));

    run_until(&mut world, 60, |w| w.unit(guard).unwrap().queue().len() > 1)
        .expect("guard scan never fired");

    let post = ground(0.0, 0.0);
    assert_eq!(
        queue_of(&world, guard),
        vec![
            Command::AttackTarget(second),
            Command::AttackTarget(first),
            Command::Guard(post),
        ]
    );
    assert!(!queue_of(&world, guard).contains(&Command::AttackTarget(far)));

    world.tick();
    assert_eq!(state_of(&world, guard), UnitState::MovingToTarget);
    assert_eq!(world.unit(guard).unwrap().target(), Some(second));
}

#[test]
fn test_guard_ignores_allies() {
    let mut world = test_world();
    let guard = spawn_guard(&mut world, "footman", BLUE, ground(0.0, 0.0));
    spawn(&mut world, "footman", BLUE, ground(1.0, 0.0));
    spawn(&mut world, "footman", GREEN, ground(2.0, 0.0));

    run_ticks(&mut world, 80);
    assert_eq!(queue_of(&world, guard).len(), 1);
    assert_eq!(state_of(&world, guard), UnitState::Guarding);
}

#[test]
fn test_guard_resumes_after_target_dies() {
    let mut world = test_world();
    let guard = spawn_guard(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let intruder = spawn(&mut world, "footman", RED, ground(3.0, 0.0));

    run_until(&mut world, 60, |w| state_of(w, guard) == UnitState::MovingToTarget)
        .expect("guard engages");
    world.kill(intruder).unwrap();

    run_until(&mut world, 200, |w| {
        state_of(w, guard) == UnitState::Guarding && w.unit(guard).unwrap().queue().len() == 1
    })
    .expect("guard resumes");
    assert_eq!(
        queue_of(&world, guard),
        vec![Command::Guard(ground(0.0, 0.0))]
    );
}

// =============================================================================
// Attack-move
// =============================================================================

#[test]
fn test_attack_move_interrupted_by_visible_hostile() {
    let perception = ScriptedPerception::new();
    let sight = perception.clone();
    let mut world = test_world().with_perception(perception);
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(10.0, 5.0));
    let destination = ground(20.0, 0.0);

    world
        .issue_command(unit, Command::AttackMoveTo(destination), false)
        .unwrap();
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::AttackMovingToSpot);

    sight.set_visible(unit, &[hostile]);
    world.tick();
    assert_eq!(
        queue_of(&world, unit),
        vec![
            Command::AttackTarget(hostile),
            Command::AttackMoveTo(destination),
        ]
    );

    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::MovingToTarget);
    assert_eq!(world.unit(unit).unwrap().target(), Some(hostile));
}

#[test]
fn test_attack_move_picks_nearest_visible_hostile() {
    let perception = ScriptedPerception::new();
    let sight = perception.clone();
    let mut world = test_world().with_perception(perception);
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let far = spawn(&mut world, "footman", RED, ground(9.0, 0.0));
    let near = spawn(&mut world, "footman", RED, ground(4.0, 0.0));

    sight.set_visible(unit, &[far, near]);
    world
        .issue_command(unit, Command::AttackMoveTo(ground(20.0, 0.0)), false)
        .unwrap();
    world.tick();

    assert_eq!(queue_of(&world, unit)[0], Command::AttackTarget(near));
}

#[test]
fn test_attack_move_arrival_holds_guard_at_destination() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));

    world
        .issue_command(unit, Command::AttackMoveTo(ground(2.0, 0.0)), false)
        .unwrap();
    run_until(&mut world, 100, |w| state_of(w, unit) == UnitState::Guarding)
        .expect("attack-move ends on guard");

    let queue = queue_of(&world, unit);
    assert_eq!(queue.len(), 1);
    let Command::Guard(post) = queue[0] else {
        panic!("expected a guard order, got {queue:?}");
    };
    assert!(post.distance(ground(2.0, 0.0)) <= 0.1 + 1e-4);

    run_ticks(&mut world, 40);
    assert_eq!(queue_of(&world, unit).len(), 1);
}

// =============================================================================
// Attack target
// =============================================================================

#[test]
fn test_attacker_turns_around_to_target_behind() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(0.0, -1.0));
    assert_eq!(world.entity(unit).unwrap().body.forward, Vec3::FORWARD);

    world
        .issue_command(unit, Command::AttackTarget(hostile), false)
        .unwrap();
    for _ in 0..40 {
        world.tick();
        let forward = world.entity(unit).unwrap().body.forward;
        assert!(
            (forward.length() - 1.0).abs() < 1e-4,
            "facing collapsed to {forward:?}"
        );
        if world.unit(unit).unwrap().is_attack_animation_active() {
            break;
        }
    }

    assert!(world.unit(unit).unwrap().is_attack_animation_active());
    let forward = world.entity(unit).unwrap().body.forward;
    assert!(forward.angle_to(Vec3::new(0.0, 0.0, -1.0)) <= 10.0);
}

#[test]
fn test_attacking_guard_holds_fight_within_leash_then_walks_back() {
    let mut world = test_world();
    let post = ground(0.0, 0.0);
    let guard = spawn_guard(&mut world, "footman", BLUE, post);
    let hostile = spawn(&mut world, "footman", RED, ground(3.0, 0.0));

    run_until(&mut world, 80, |w| state_of(w, guard) == UnitState::Attacking)
        .expect("guard engages the hostile");
    run_ticks(&mut world, 10);

    // Well past a tenth of a unit from the post, still inside one guard distance.
    let position = world.entity(guard).unwrap().body.position;
    assert!(position.distance(post) > 1.0);
    assert_eq!(state_of(&world, guard), UnitState::Attacking);
    assert!(world.unit(guard).unwrap().is_attack_animation_active());
    assert_eq!(
        queue_of(&world, guard),
        vec![Command::AttackTarget(hostile), Command::Guard(post)]
    );

    // Beyond the leash (6 units for a footman) the guard walks back.
    world.teleport(hostile, ground(8.5, 0.0)).unwrap();
    world.teleport(guard, ground(7.5, 0.0)).unwrap();
    world.tick();
    assert!(!world.unit(guard).unwrap().is_attack_animation_active());
    assert!(queue_of(&world, guard).contains(&Command::MoveTo(post)));

    run_until(&mut world, 120, |w| state_of(w, guard) == UnitState::Guarding)
        .expect("guard returns to its post");
    assert!(world.entity(guard).unwrap().body.position.distance(post) < 0.5);
}

#[test]
fn test_lost_target_with_nothing_queued_idles_in_place() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(0.0, 8.0));

    world
        .issue_command(unit, Command::AttackTarget(hostile), false)
        .unwrap();
    run_ticks(&mut world, 10);
    assert_eq!(state_of(&world, unit), UnitState::MovingToTarget);

    world.kill(hostile).unwrap();
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::Idle);
    let stopped_at = world.entity(unit).unwrap().body.position;
    assert!(stopped_at.distance(ground(0.0, 8.0)) > 4.0);

    run_ticks(&mut world, 20);
    assert_eq!(state_of(&world, unit), UnitState::Idle);
    assert!(world.unit(unit).unwrap().queue().is_empty());
    assert!(world.entity(unit).unwrap().body.position.distance(stopped_at) < 1e-4);
}

#[test]
fn test_attack_target_closes_then_attacks() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(0.0, 6.0));

    world
        .issue_command(unit, Command::AttackTarget(hostile), false)
        .unwrap();
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::MovingToTarget);

    run_until(&mut world, 100, |w| state_of(w, unit) == UnitState::Attacking)
        .expect("unit reaches engage range");
    let distance = world
        .entity(unit)
        .unwrap()
        .body
        .position
        .distance(ground(0.0, 6.0));
    assert!(distance <= 1.5 + 0.2);

    let events = world.tick();
    assert!(world.unit(unit).unwrap().is_attack_animation_active());
    assert!(events.signals.contains(&Signal::AttackAnimation {
        entity: unit,
        active: true,
    }));
}

#[test]
fn test_attack_target_that_died_before_dispatch_is_skipped() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(0.0, 6.0));

    world
        .issue_command(unit, Command::AttackTarget(hostile), false)
        .unwrap();
    world
        .issue_command(unit, Command::MoveTo(ground(3.0, 0.0)), false)
        .unwrap();
    world.kill(hostile).unwrap();

    run_ticks(&mut world, 3);
    assert_eq!(state_of(&world, unit), UnitState::MovingToSpot);
    assert_eq!(queue_of(&world, unit), vec![Command::MoveTo(ground(3.0, 0.0))]);
}

#[test]
fn test_target_death_while_attacking_idles() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(0.0, 1.0));

    world
        .issue_command(unit, Command::AttackTarget(hostile), false)
        .unwrap();
    run_until(&mut world, 20, |w| state_of(w, unit) == UnitState::Attacking)
        .expect("in range immediately");

    world.kill(hostile).unwrap();
    world.tick();
    assert_eq!(state_of(&world, unit), UnitState::Idle);
    assert!(!world.unit(unit).unwrap().is_attack_animation_active());
    assert_eq!(world.unit(unit).unwrap().target(), None);
}

// =============================================================================
// Rejection
// =============================================================================

#[test]
fn test_self_target_rejected() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));

    assert!(!world
        .issue_command(unit, Command::AttackTarget(unit), false)
        .unwrap());
    assert!(!world
        .insert_command(unit, Command::AttackTarget(unit), 0)
        .unwrap());
    assert!(world.unit(unit).unwrap().queue().is_empty());
}

#[test]
fn test_nan_destination_leaves_queue_unchanged() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    world
        .issue_command(unit, Command::MoveTo(ground(4.0, 0.0)), false)
        .unwrap();
    let before = queue_of(&world, unit);

    for command in [
        Command::MoveTo(Vec3::NAN),
        Command::AttackMoveTo(Vec3::new(1.0, f32::NAN, 0.0)),
        Command::Guard(Vec3::new(f32::NAN, 0.0, 0.0)),
    ] {
        assert!(!world.issue_command(unit, command, true).unwrap());
    }
    assert_eq!(queue_of(&world, unit), before);
}

#[test]
fn test_attack_on_dead_or_unknown_target_rejected() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    let hostile = spawn(&mut world, "footman", RED, ground(3.0, 0.0));
    world.kill(hostile).unwrap();

    assert!(!world
        .issue_command(unit, Command::AttackTarget(hostile), false)
        .unwrap());
    assert!(!world
        .issue_command(unit, Command::AttackTarget(9_999), false)
        .unwrap());
    assert!(world.unit(unit).unwrap().queue().is_empty());
}

#[test]
fn test_commands_to_unknown_or_building_are_errors() {
    let mut world = test_world();
    let farm = world
        .spawn_building(BuildingSpawn::new("farm", BLUE, ground(0.0, 0.0)))
        .unwrap();

    assert!(matches!(
        world.issue_command(12_345, Command::Stop, false),
        Err(GameError::EntityNotFound(12_345))
    ));
    assert!(matches!(
        world.issue_command(farm, Command::Stop, false),
        Err(GameError::NotCommandable(id)) if id == farm
    ));
}

#[test]
fn test_commands_to_dead_unit_are_refused() {
    let mut world = test_world();
    let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
    world.kill(unit).unwrap();

    assert!(!world
        .issue_command(unit, Command::MoveTo(ground(1.0, 0.0)), false)
        .unwrap());
    assert!(!world.issue_command(unit, Command::Stop, false).unwrap());
    assert!(world.unit(unit).unwrap().queue().is_empty());
}

// =============================================================================
// Property tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_stop_always_idles(
        orders in strategies::arb_command_sequence(8),
        ticks in 0u64..30,
    ) {
        let mut world = test_world();
        let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
        for order in orders {
            world.issue_command(unit, order, false).unwrap();
        }
        run_ticks(&mut world, ticks);

        world.issue_command(unit, Command::Stop, false).unwrap();
        world.tick();
        prop_assert_eq!(state_of(&world, unit), UnitState::Idle);
        prop_assert!(world.unit(unit).unwrap().queue().is_empty());
    }

    #[test]
    fn prop_nan_rejection_never_mutates_queue(
        orders in strategies::arb_command_sequence(6),
        clear in any::<bool>(),
        index in 0usize..8,
    ) {
        let mut world = test_world();
        let unit = spawn(&mut world, "footman", BLUE, ground(0.0, 0.0));
        for order in orders {
            world.issue_command(unit, order, false).unwrap();
        }
        let before = queue_of(&world, unit);

        prop_assert!(!world.issue_command(unit, Command::MoveTo(Vec3::NAN), clear).unwrap());
        prop_assert!(!world.insert_command(unit, Command::Guard(Vec3::NAN), index).unwrap());
        prop_assert!(!world.issue_command(unit, Command::AttackTarget(unit), clear).unwrap());
        prop_assert_eq!(queue_of(&world, unit), before);
    }
}
