//! World-level tuning knobs.
//!
//! Every field has a default, so a RON file only needs to list what it
//! overrides:
//!
//! ```ron
//! WorldConfig(
//!     tick_rate: 30,
//!     seed: 7,
//!     vision_fade_time: 1.5,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::data::parse_ron;
use crate::error::{GameError, Result};
use crate::math::{seconds_serde, Fixed};

/// Default ticks per second.
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Configuration shared by every entity in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,

    /// Seed for damage rolls.
    pub seed: u64,

    /// Seconds between hostile scans of a guarding unit or idle tower.
    #[serde(with = "seconds_serde")]
    pub guard_check_interval: Fixed,

    /// Seconds for the vision radius to fade in on spawn or out on death.
    #[serde(with = "seconds_serde")]
    pub vision_fade_time: Fixed,

    /// Combat-ready blend speed (blend units per second).
    pub combat_ready_switch_rate: f32,

    /// Seconds a dead unit lies on the ground before sinking.
    #[serde(with = "seconds_serde")]
    pub unit_decay_delay: Fixed,

    /// How far a dead unit sinks before removal.
    pub unit_decay_depth: f32,

    /// How far a destroyed building sinks before removal.
    pub building_decay_depth: f32,

    /// Sinking speed in world units per second.
    pub decay_sink_speed: f32,

    /// Maximum facing error (degrees) at which an attacker may strike.
    pub attack_facing_tolerance: f32,

    /// Facing interpolation factor per second while turning to a target.
    pub turn_rate: f32,

    /// A chasing unit abandons the chase when its guard post is more than
    /// this many guard distances away.
    pub chase_leash_factor: f32,

    /// An attacking unit walks back when its guard post is more than this
    /// many guard distances away.
    ///
    /// This is a multiple of the guard distance rather than a fixed 0.1 unit
    /// offset. A fixed offset recalls any guard that takes a step toward an
    /// attacker in engage range, so it could never hold a fight at its post.
    pub attack_leash_factor: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            seed: 0,
            guard_check_interval: Fixed::from_num(1),
            vision_fade_time: Fixed::from_num(1),
            combat_ready_switch_rate: 7.0,
            unit_decay_delay: Fixed::from_num(5),
            unit_decay_depth: 2.0,
            building_decay_depth: 5.0,
            decay_sink_speed: 0.1,
            attack_facing_tolerance: 10.0,
            turn_rate: 10.0,
            chase_leash_factor: 2.0,
            attack_leash_factor: 1.0,
        }
    }
}

impl WorldConfig {
    /// Parse a configuration from RON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text fails to parse or a value is out of range.
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: Self = parse_ron("world.ron", text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidData`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let fail = |field: &str| Err(GameError::InvalidData(format!("world config: bad {field}")));

        if self.tick_rate == 0 {
            return fail("tick_rate");
        }
        if self.guard_check_interval <= Fixed::ZERO {
            return fail("guard_check_interval");
        }
        if self.vision_fade_time < Fixed::ZERO {
            return fail("vision_fade_time");
        }
        if self.unit_decay_delay < Fixed::ZERO {
            return fail("unit_decay_delay");
        }
        if !(self.decay_sink_speed > 0.0) {
            return fail("decay_sink_speed");
        }
        if !(self.combat_ready_switch_rate > 0.0) {
            return fail("combat_ready_switch_rate");
        }
        if !(self.chase_leash_factor > 0.0 && self.attack_leash_factor > 0.0) {
            return fail("leash factor");
        }
        Ok(())
    }

    /// Duration of one tick in fixed-point seconds.
    #[must_use]
    pub fn tick_duration(&self) -> Fixed {
        Fixed::from_num(1) / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Simulated time at the start of tick `tick`.
    ///
    /// Computed from the tick count instead of summing [`Self::tick_duration`],
    /// so whole seconds land exactly on tick boundaries.
    #[must_use]
    pub fn time_at_tick(&self, tick: u64) -> Fixed {
        Fixed::from_num(tick) / Fixed::from_num(self.tick_rate.max(1))
    }
}
