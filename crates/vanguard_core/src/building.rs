//! Building behavior: idle, attacking (armed towers only) and dead, plus
//! health-keyed burn effects.

use serde::{Deserialize, Serialize};

use crate::context::StepContext;
use crate::data::{BuildingData, BURN_POINT_COUNT};
use crate::entity::{Body, EntityId, Health};
use crate::math::Fixed;
use crate::presentation::{Signal, TickEvents};
use crate::scheduler::ScanClock;
use crate::unit::StepOutcome;

/// Health fractions below which each burn point is lit.
const BURN_THRESHOLDS: [f32; BURN_POINT_COUNT as usize] = [0.75, 0.5, 0.25, 0.25];

/// Operating state of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingState {
    /// Standing; armed buildings scan for hostiles.
    Idle,
    /// Shooting at a target in range.
    Attacking,
    /// Terminal.
    Dead,
}

/// A static entity.
#[derive(Debug, Clone)]
pub struct Building {
    template: BuildingData,
    state: BuildingState,
    target: Option<EntityId>,
    scan: ScanClock,
    attack_animation: bool,
    burning: [bool; BURN_POINT_COUNT as usize],
}

impl Building {
    /// Create a building from its own copy of a template.
    #[must_use]
    pub fn new(template: BuildingData, now: Fixed) -> Self {
        Self {
            template,
            state: BuildingState::Idle,
            target: None,
            scan: ScanClock::new(now),
            attack_animation: false,
            burning: [false; BURN_POINT_COUNT as usize],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BuildingState {
        self.state
    }

    /// Whether the building is in its terminal state.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == BuildingState::Dead
    }

    /// Current target of an armed building.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// This building's own copy of its template.
    #[must_use]
    pub const fn template(&self) -> &BuildingData {
        &self.template
    }

    /// Which burn points are lit.
    #[must_use]
    pub const fn burning(&self) -> &[bool; BURN_POINT_COUNT as usize] {
        &self.burning
    }

    /// Overwrite the state without running a transition.
    pub fn force_state(&mut self, state: BuildingState) {
        self.state = state;
    }

    /// The scan timer fired.
    pub(crate) fn on_scan_timer(&mut self) {
        self.scan
            .fire(self.state == BuildingState::Idle && self.template.is_armed());
    }

    /// Light or extinguish burn points to match `health`.
    ///
    /// A dead or wrecked building has every effect stopped. Buildings
    /// without exactly [`BURN_POINT_COUNT`] burn points show no effect.
    pub(crate) fn update_burn_effects(
        &mut self,
        id: EntityId,
        health: Health,
        events: &mut TickEvents,
    ) {
        let fraction = health.fraction();
        let wanted: [bool; BURN_POINT_COUNT as usize] =
            if fraction <= 0.0 || self.is_dead() {
                [false; BURN_POINT_COUNT as usize]
            } else if self.template.burn_points == BURN_POINT_COUNT {
                BURN_THRESHOLDS.map(|threshold| fraction < threshold)
            } else {
                return;
            };

        for (point, (lit, want)) in self.burning.iter_mut().zip(wanted).enumerate() {
            if *lit != want {
                *lit = want;
                events.signal(Signal::BurnEffect {
                    entity: id,
                    point: point as u8,
                    lit: want,
                });
            }
        }
    }

    /// Enter the dead state.
    pub(crate) fn enter_dead(&mut self, id: EntityId, health: Health, events: &mut TickEvents) {
        self.set_attack_animation(id, events, false);
        self.state = BuildingState::Dead;
        self.target = None;
        self.update_burn_effects(id, health, events);
    }

    pub(crate) fn step(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) -> StepOutcome {
        match self.state {
            BuildingState::Dead => {
                if !body.health.is_depleted() {
                    return StepOutcome::Die;
                }
            }
            BuildingState::Idle => self.update_idle(body, ctx),
            BuildingState::Attacking => self.update_attacking(body, ctx),
        }
        StepOutcome::Continue
    }

    fn update_idle(&mut self, body: &Body, ctx: &mut StepContext<'_>) {
        let Some(weapon) = self.template.weapon.as_ref() else {
            return;
        };
        let range = weapon.engage_distance;

        if self.scan.take_due(ctx.now) {
            let nearest = ctx
                .hostiles_within(body, range)
                .into_iter()
                .filter_map(|id| Some((id, ctx.position_of(id)?.distance_squared(body.position))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id);
            if let Some(target) = nearest {
                tracing::trace!(entity = body.id, target, "building engages");
                self.state = BuildingState::Attacking;
                self.target = Some(target);
                return;
            }
        }
        self.scan
            .arm(body.id, ctx.config.guard_check_interval, ctx.now, ctx.scheduler);
    }

    fn update_attacking(&mut self, body: &Body, ctx: &mut StepContext<'_>) {
        let range = self
            .template
            .weapon
            .as_ref()
            .map_or(0.0, |w| w.engage_distance);
        let in_range = self
            .target
            .filter(|&t| ctx.is_alive(t))
            .and_then(|t| ctx.position_of(t))
            .is_some_and(|p| p.distance(body.position) <= range);

        if in_range {
            self.set_attack_animation(body.id, ctx.events, true);
        } else {
            self.set_attack_animation(body.id, ctx.events, false);
            self.state = BuildingState::Idle;
            self.target = None;
            self.scan.reset();
            self.scan
                .arm(body.id, ctx.config.guard_check_interval, ctx.now, ctx.scheduler);
        }
    }

    pub(crate) fn set_attack_animation(
        &mut self,
        id: EntityId,
        events: &mut TickEvents,
        active: bool,
    ) {
        if self.attack_animation != active {
            self.attack_animation = active;
            events.signal(Signal::AttackAnimation { entity: id, active });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farm(burn_points: u8) -> BuildingData {
        BuildingData {
            id: "farm".into(),
            name: "Farm".into(),
            health: 100,
            guard_distance: 4.0,
            weapon: None,
            burn_points,
            tags: Vec::new(),
        }
    }

    fn health(current: u32) -> Health {
        Health { current, max: 100 }
    }

    #[test]
    fn test_burn_tiers_follow_health() {
        let mut building = Building::new(farm(4), Fixed::ZERO);
        let mut events = TickEvents::default();

        building.update_burn_effects(1, health(80), &mut events);
        assert_eq!(building.burning(), &[false; 4]);

        building.update_burn_effects(1, health(74), &mut events);
        assert_eq!(building.burning(), &[true, false, false, false]);

        building.update_burn_effects(1, health(20), &mut events);
        assert_eq!(building.burning(), &[true, true, true, true]);
        assert_eq!(events.signals.len(), 4);
    }

    #[test]
    fn test_odd_burn_point_count_skips_effects() {
        let mut building = Building::new(farm(3), Fixed::ZERO);
        let mut events = TickEvents::default();
        building.update_burn_effects(1, health(10), &mut events);
        assert_eq!(building.burning(), &[false; 4]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_death_stops_all_burning() {
        let mut building = Building::new(farm(4), Fixed::ZERO);
        let mut events = TickEvents::default();
        building.update_burn_effects(1, health(10), &mut events);
        building.enter_dead(1, health(0), &mut events);
        assert!(building.is_dead());
        assert_eq!(building.burning(), &[false; 4]);
    }
}
