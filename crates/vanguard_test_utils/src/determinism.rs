//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a world produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and bug reports are only useful if a world fed the same orders
//! ends up in the same state. Sources of non-determinism include:
//!
//! - **Wall-clock time**: Timers run on the world's fixed-point clock
//!   ([`vanguard_core::math::Fixed`]), never on `Instant`.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities step in sorted id order; scans walk the registration list.
//!
//! - **System randomness**: Damage rolls come from a PRNG seeded by
//!   [`WorldConfig::seed`](vanguard_core::config::WorldConfig::seed).
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual state machines (dequeue loop, scan clock)
//! 2. **Property tests**: Random order streams still replay identically
//! 3. **Integration tests**: Full skirmishes are reproducible


use vanguard_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "World is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```
/// use vanguard_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a world twice from the same setup and compare final state hashes.
///
/// Returns `true` if both runs produced identical hashes.
pub fn verify_world_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> World,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |world| {
            world.tick();
        },
        World::state_hash,
    );
    result.is_deterministic
}

/// Compare two world runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// worlds start to differ.
///
/// # Returns
///
/// `None` if the runs agree on every tick, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> World,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick();
        second.tick();

        if first.state_hash() != second.state_hash() {
            tracing::debug!(tick, "worlds diverged");
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the command pipeline.
pub mod strategies {
    use proptest::prelude::*;
    use vanguard_core::command::Command;
    use vanguard_core::math::Vec3;

    /// Generate a ground-plane coordinate.
    ///
    /// Range: -50 to 50 (a small skirmish map)
    pub fn arb_coordinate() -> impl Strategy<Value = f32> {
        (-50i32..=50i32).prop_map(|n| n as f32)
    }

    /// Generate a point on the ground plane.
    pub fn arb_ground_position() -> impl Strategy<Value = Vec3> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, z)| Vec3::new(x, 0.0, z))
    }

    /// Generate a MoveTo command.
    pub fn arb_move_command() -> impl Strategy<Value = Command> {
        arb_ground_position().prop_map(Command::MoveTo)
    }

    /// Generate an AttackMoveTo command.
    pub fn arb_attack_move_command() -> impl Strategy<Value = Command> {
        arb_ground_position().prop_map(Command::AttackMoveTo)
    }

    /// Generate a Guard command.
    pub fn arb_guard_command() -> impl Strategy<Value = Command> {
        arb_ground_position().prop_map(Command::Guard)
    }

    /// Generate any command that carries no entity reference.
    pub fn arb_positional_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            3 => arb_move_command(),
            3 => arb_attack_move_command(),
            2 => arb_guard_command(),
            1 => Just(Command::Stop),
        ]
    }

    /// Generate a sequence of commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(arb_positional_command(), 0..max_len)
    }

    /// Generate damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..100u32
    }

    /// Generate a damage sequence.
    pub fn arb_damage_sequence(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(arb_damage(), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ground, spawn, spawn_guard, test_world, BLUE, RED};
    use proptest::prelude::*;
    use vanguard_core::command::Command;

    fn skirmish() -> World {
        let mut world = test_world();
        for i in 0..4 {
            let offset = i as f32 * 2.0;
            spawn_guard(&mut world, "footman", BLUE, ground(offset, 0.0));
            let red = spawn(&mut world, "archer", RED, ground(offset, 12.0));
            world
                .issue_command(red, Command::AttackMoveTo(ground(offset, -4.0)), false)
                .expect("red unit accepts orders");
        }
        world
    }

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_unique_hashes_reports_divergence() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![3, 1, 3],
            ticks: 1,
        };
        assert_eq!(result.unique_hashes(), vec![1, 3]);
    }

    #[test]
    fn test_empty_world_determinism() {
        assert!(verify_world_determinism(test_world, 100));
    }

    #[test]
    fn test_skirmish_determinism() {
        assert!(verify_world_determinism(skirmish, 300));
        assert_eq!(find_first_divergence(skirmish, 300), None);
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_command_stream_replays_identically(
            commands in strategies::arb_command_sequence(12),
        ) {
            let setup = || {
                let mut world = skirmish();
                let unit = world.live_entities()[0];
                for command in &commands {
                    world.issue_command(unit, *command, false).expect("unit exists");
                }
                world
            };
            prop_assert!(verify_world_determinism(setup, 120));
        }
    }
}
