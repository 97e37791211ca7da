//! Unit behavior: the command queue API and the per-tick state machine.
//!
//! Each tick a unit first runs its dequeue loop, which may dispatch the
//! head command into a state transition, then runs the step of whatever
//! state it is in. A step may insert interrupt commands ahead of the
//! queue (a hostile spotted, a guard post left behind), which the loop
//! picks up on the next tick.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::command_queue::{CommandQueue, Dequeue, DequeueLoop};
use crate::context::StepContext;
use crate::data::UnitData;
use crate::entity::{Body, EntityId};
use crate::math::{Fixed, Vec3};
use crate::presentation::{Signal, TickEvents};
use crate::scheduler::ScanClock;

/// Operating state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Standing still with nothing to do.
    Idle,
    /// Holding position, scanning for hostiles on an interval.
    Guarding,
    /// In range of the target, facing it and swinging.
    Attacking,
    /// Approaching an attack target.
    MovingToTarget,
    /// Walking to a spot.
    MovingToSpot,
    /// Walking to a spot, engaging hostiles seen on the way.
    AttackMovingToSpot,
    /// Terminal.
    Dead,
}

impl UnitState {
    /// Whether a unit may be spawned in this state.
    #[must_use]
    pub const fn is_valid_initial(self) -> bool {
        matches!(self, Self::Idle | Self::Guarding)
    }
}

/// What the world must do after a unit's step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Continue,
    Die,
}

/// A mobile entity with a command queue.
#[derive(Debug, Clone)]
pub struct Unit {
    template: UnitData,
    state: UnitState,
    queue: CommandQueue,
    dequeue: DequeueLoop,
    target: Option<EntityId>,
    scan: ScanClock,
    attack_animation: bool,
    last_speed: f32,
}

impl Unit {
    /// Create a unit from its own copy of a template.
    ///
    /// Only `Idle` and `Guarding` are valid initial states; anything else
    /// is logged and corrected to `Idle`. A unit starting on guard gets a
    /// standing guard order at `position`.
    #[must_use]
    pub fn new(template: UnitData, initial: UnitState, position: Vec3, now: Fixed) -> Self {
        let initial = if initial.is_valid_initial() {
            initial
        } else {
            tracing::error!(
                template = %template.id,
                state = ?initial,
                "invalid initial unit state, starting idle"
            );
            UnitState::Idle
        };

        let mut unit = Self {
            template,
            state: UnitState::Idle,
            queue: CommandQueue::new(),
            dequeue: DequeueLoop::new(),
            target: None,
            scan: ScanClock::new(now),
            attack_animation: false,
            last_speed: 0.0,
        };
        if initial == UnitState::Guarding {
            unit.enqueue(Command::Guard(position), false);
        }
        unit
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Whether the unit is in its terminal state.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == UnitState::Dead
    }

    /// Pending commands, head first.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Dequeue loop flags.
    #[must_use]
    pub const fn dequeue_loop(&self) -> &DequeueLoop {
        &self.dequeue
    }

    /// Remembered attack target. May refer to an entity that has since died.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// This unit's own copy of its template.
    #[must_use]
    pub const fn template(&self) -> &UnitData {
        &self.template
    }

    /// Whether the attack animation is playing.
    #[must_use]
    pub const fn is_attack_animation_active(&self) -> bool {
        self.attack_animation
    }

    /// Overwrite the state without running a transition.
    ///
    /// Forcing `Dead` on a unit with health left makes it run the death
    /// procedure on its next tick.
    pub fn force_state(&mut self, state: UnitState) {
        self.state = state;
    }

    /// Apply an already validated command through the public queue API.
    pub(crate) fn enqueue(&mut self, command: Command, clear: bool) {
        let is_stop = command == Command::Stop;
        if clear || is_stop {
            self.queue.clear();
        }
        if !is_stop {
            self.queue.push(command);
        }
        self.dequeue.order_added(is_stop);
    }

    /// Insert an already validated command at `index`.
    pub(crate) fn insert(&mut self, command: Command, index: usize) {
        self.queue.insert(index, command);
    }

    /// The guard-scan timer fired.
    pub(crate) fn on_scan_timer(&mut self) {
        self.scan.fire(self.state == UnitState::Guarding);
    }

    /// Enter the dead state: queue cleared, target dropped, loop finished.
    pub(crate) fn enter_dead(&mut self, id: EntityId, events: &mut TickEvents) {
        self.stop_attack_animation(id, events);
        self.state = UnitState::Dead;
        self.queue.clear();
        self.target = None;
    }

    /// Stop the attack animation if it is playing.
    pub(crate) fn stop_attack_animation(&mut self, id: EntityId, events: &mut TickEvents) {
        if self.attack_animation {
            self.attack_animation = false;
            events.signal(Signal::AttackAnimation {
                entity: id,
                active: false,
            });
        }
    }

    /// Run the dequeue loop, then the step of the resulting state.
    pub(crate) fn step(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) -> StepOutcome {
        let dead = self.is_dead();
        match self.dequeue.advance(&mut self.queue, dead) {
            Dequeue::Wait | Dequeue::Finished => {}
            Dequeue::Idle => {
                if self.state != UnitState::Idle {
                    self.idle(body, ctx);
                }
            }
            Dequeue::Dispatch(command) => {
                if self.execute(command, body, ctx) == StepOutcome::Die {
                    return StepOutcome::Die;
                }
            }
        }

        let outcome = self.update(body, ctx);

        let speed = ctx.navigation.velocity(body.id).length();
        if (speed - self.last_speed).abs() > f32::EPSILON {
            self.last_speed = speed;
            ctx.signal(Signal::Speed {
                entity: body.id,
                value: speed,
            });
        }
        outcome
    }

    fn execute(
        &mut self,
        command: Command,
        body: &mut Body,
        ctx: &mut StepContext<'_>,
    ) -> StepOutcome {
        if self.is_dead() {
            tracing::warn!(entity = body.id, ?command, "command dispatched to a dead unit");
            return StepOutcome::Continue;
        }
        tracing::trace!(entity = body.id, ?command, "dispatch");

        match command {
            Command::MoveTo(dest) => self.move_to_spot(body, ctx, dest, UnitState::MovingToSpot),
            Command::AttackMoveTo(dest) => {
                self.move_to_spot(body, ctx, dest, UnitState::AttackMovingToSpot);
            }
            Command::AttackTarget(target) => self.move_to_target(body, ctx, target),
            Command::Guard(_) => self.guard(body, ctx),
            Command::Stop => self.idle(body, ctx),
            Command::Die => return StepOutcome::Die,
        }
        StepOutcome::Continue
    }

    fn update(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) -> StepOutcome {
        match self.state {
            UnitState::Idle => {}
            UnitState::MovingToSpot => {
                if ctx.navigation.has_arrived(body.id) {
                    self.idle(body, ctx);
                }
            }
            UnitState::AttackMovingToSpot => self.update_attack_move(body, ctx),
            UnitState::MovingToTarget => self.update_moving_to_target(body, ctx),
            UnitState::Guarding => self.update_guarding(body, ctx),
            UnitState::Attacking => self.update_attacking(body, ctx),
            UnitState::Dead => {
                if !body.health.is_depleted() {
                    return StepOutcome::Die;
                }
            }
        }
        StepOutcome::Continue
    }

    fn update_attack_move(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) {
        if ctx.navigation.has_arrived(body.id) {
            // The attack-move stays received so it pops; the guard order
            // then holds the destination.
            self.dequeue.mark_executed();
            self.queue.push(Command::Guard(body.position));
            return;
        }

        if let Some(hostile) = ctx.nearest_visible_hostile(body) {
            tracing::trace!(entity = body.id, hostile, "attack-move interrupted");
            self.dequeue.interrupt();
            self.insert(Command::AttackTarget(hostile), 0);
        }
    }

    fn update_moving_to_target(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) {
        let target = match self.target {
            Some(target) if ctx.is_alive(target) => target,
            _ => {
                // Target lost. With nothing queued behind, stand down where
                // we are. The unit does not walk on to the target's last
                // known position, which is where an idle unit would only
                // have to be ordered back from.
                if self.queue.len() <= 1 {
                    self.idle(body, ctx);
                } else {
                    self.dequeue.mark_executed();
                }
                return;
            }
        };

        if let Some(post) = self.trailing_guard_post() {
            let leash = self.template.guard_distance * ctx.config.chase_leash_factor;
            if post.distance(body.position) > leash {
                self.dequeue.mark_executed();
                self.insert(Command::MoveTo(post), 1);
            }
        }

        if ctx.navigation.remaining_distance(body.id) < self.template.engage_distance {
            ctx.navigation.halt(body.id);
            self.start_attacking(body, ctx);
        } else if let Some(pos) = ctx.position_of(target) {
            ctx.navigation.set_destination(body.id, pos);
        }
    }

    fn update_guarding(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) {
        if !self.scan.take_due(ctx.now) {
            return;
        }
        self.scan
            .arm(body.id, ctx.config.guard_check_interval, ctx.now, ctx.scheduler);

        // One interrupt per hostile, each at the head: the hostile found last
        // is engaged first.
        for hostile in ctx.hostiles_within(body, self.template.guard_distance) {
            self.dequeue.interrupt();
            self.insert(Command::AttackTarget(hostile), 0);
        }
    }

    fn update_attacking(&mut self, body: &mut Body, ctx: &mut StepContext<'_>) {
        let Some(target_pos) = self
            .target
            .filter(|&t| ctx.is_alive(t))
            .and_then(|t| ctx.position_of(t))
        else {
            self.set_attack_animation(body.id, ctx, false);
            self.idle(body, ctx);
            return;
        };

        if let Some(post) = self.trailing_guard_post() {
            let leash = self.template.guard_distance * ctx.config.attack_leash_factor;
            if post.distance(body.position) > leash {
                self.set_attack_animation(body.id, ctx, false);
                self.dequeue.mark_executed();
                self.insert(Command::MoveTo(post), 1);
                return;
            }
        }

        if target_pos.distance(body.position) > self.template.engage_distance {
            self.set_attack_animation(body.id, ctx, false);
            if let Some(target) = self.target {
                self.move_to_target(body, ctx, target);
            }
            return;
        }

        let mut desired = target_pos - body.position;
        desired.y = 0.0;
        let desired = desired.normalize();
        if desired != Vec3::ZERO
            && body.forward.angle_to(desired) > ctx.config.attack_facing_tolerance
        {
            let t = ctx.dt_secs() * ctx.config.turn_rate;
            body.forward = turn_towards(body.forward, desired, t);
        } else {
            self.set_attack_animation(body.id, ctx, true);
        }
    }

    fn trailing_guard_post(&self) -> Option<Vec3> {
        match self.queue.get(1) {
            Some(Command::Guard(post)) => Some(*post),
            _ => None,
        }
    }

    fn move_to_spot(
        &mut self,
        body: &Body,
        ctx: &mut StepContext<'_>,
        dest: Vec3,
        state: UnitState,
    ) {
        self.transition(body.id, state);
        self.target = None;
        self.set_attack_animation(body.id, ctx, false);
        ctx.navigation.set_stopped(body.id, false);
        ctx.navigation.set_destination(body.id, dest);
    }

    fn idle(&mut self, body: &Body, ctx: &mut StepContext<'_>) {
        self.transition(body.id, UnitState::Idle);
        self.dequeue.mark_executed();
        self.target = None;
        self.set_attack_animation(body.id, ctx, false);
        ctx.navigation.set_stopped(body.id, true);
        ctx.navigation.halt(body.id);
        ctx.blend_combat_ready(body, false);
    }

    fn guard(&mut self, body: &Body, ctx: &mut StepContext<'_>) {
        self.transition(body.id, UnitState::Guarding);
        self.dequeue.mark_executed();
        self.target = None;
        self.set_attack_animation(body.id, ctx, false);
        ctx.navigation.set_stopped(body.id, true);
        ctx.navigation.halt(body.id);
        ctx.blend_combat_ready(body, false);

        self.scan.reset();
        self.scan
            .arm(body.id, ctx.config.guard_check_interval, ctx.now, ctx.scheduler);
    }

    fn move_to_target(&mut self, body: &Body, ctx: &mut StepContext<'_>, target: EntityId) {
        // The target may have died between queueing and dispatch.
        let Some(pos) = ctx.is_alive(target).then(|| ctx.position_of(target)).flatten() else {
            self.dequeue.mark_executed();
            return;
        };
        if self.state != UnitState::MovingToTarget {
            ctx.blend_combat_ready(body, true);
        }
        self.transition(body.id, UnitState::MovingToTarget);
        self.target = Some(target);
        ctx.navigation.set_stopped(body.id, false);
        ctx.navigation.set_destination(body.id, pos);
    }

    fn start_attacking(&mut self, body: &Body, ctx: &mut StepContext<'_>) {
        if self.target.is_some_and(|t| ctx.is_alive(t)) {
            self.transition(body.id, UnitState::Attacking);
            ctx.navigation.set_stopped(body.id, true);
        } else {
            self.dequeue.mark_executed();
        }
    }

    fn set_attack_animation(&mut self, id: EntityId, ctx: &mut StepContext<'_>, active: bool) {
        if self.attack_animation != active {
            self.attack_animation = active;
            ctx.signal(Signal::AttackAnimation { entity: id, active });
        }
    }

    fn transition(&mut self, id: EntityId, state: UnitState) {
        if self.state != state {
            tracing::trace!(entity = id, from = ?self.state, to = ?state, "unit state");
            self.state = state;
        }
    }
}

/// Blend a facing toward `desired`, never returning a zero vector.
///
/// Facing straight away from `desired` makes the blend pass through zero,
/// so the turn is started a quarter turn to the side instead.
fn turn_towards(forward: Vec3, desired: Vec3, t: f32) -> Vec3 {
    let turned = forward.lerp(desired, t).normalize();
    if turned == Vec3::ZERO {
        Vec3::new(desired.z, 0.0, -desired.x)
    } else {
        turned
    }
}
