//! Timers and resumable procedures advanced once per tick.
//!
//! Timers replace per-tick interval polling: a guarding unit arms a timer
//! and the world fires it on the tick its due time is reached. Procedures
//! are small state machines that pick up where they left off every tick
//! until they report completion (vision fades, corpse decay, stance blends).

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::entity::{Body, EntityId, EntityStorage};
use crate::math::{move_towards, Fixed};
use crate::presentation::{Signal, TickEvents};

/// Event delivered when a timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    /// Time for a guarding unit or idle tower to look for hostiles.
    GuardScan(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    due: Fixed,
    seq: u64,
    event: TimerEvent,
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Discriminant of a [`Procedure`], used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    /// See [`Procedure::VisionFade`].
    VisionFade,
    /// See [`Procedure::HideSeenThings`].
    HideSeenThings,
    /// See [`Procedure::Decay`].
    Decay,
    /// See [`Procedure::CombatReadyBlend`].
    CombatReadyBlend,
}

/// A resumable per-entity procedure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Procedure {
    /// Fade the vision radius decal to `target` over `duration`.
    VisionFade {
        /// Final opacity.
        target: f32,
        /// Total fade time.
        duration: Fixed,
    },
    /// After `delay`, stop revealing hostiles.
    HideSeenThings {
        /// Time left before hiding.
        delay: Fixed,
    },
    /// Lie still for `delay`, then sink at `speed` until `depth`, then despawn.
    Decay {
        /// Time left before sinking starts.
        delay: Fixed,
        /// Depth at which the corpse is removed.
        depth: f32,
        /// Sinking speed.
        speed: f32,
    },
    /// Move the combat-ready blend toward `target` at `rate` per second.
    CombatReadyBlend {
        /// Final blend weight.
        target: f32,
        /// Blend units per second.
        rate: f32,
    },
}

/// Outcome of one procedure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Running,
    Done,
    Despawn,
}

impl Procedure {
    /// The procedure's kind.
    #[must_use]
    pub const fn kind(&self) -> ProcedureKind {
        match self {
            Self::VisionFade { .. } => ProcedureKind::VisionFade,
            Self::HideSeenThings { .. } => ProcedureKind::HideSeenThings,
            Self::Decay { .. } => ProcedureKind::Decay,
            Self::CombatReadyBlend { .. } => ProcedureKind::CombatReadyBlend,
        }
    }

    fn step(&mut self, body: &mut Body, dt: Fixed, events: &mut TickEvents) -> Progress {
        let dt_secs: f32 = dt.to_num();
        match self {
            Self::VisionFade { target, duration } => {
                let rate = if *duration > Fixed::ZERO {
                    dt_secs / duration.to_num::<f32>()
                } else {
                    1.0
                };
                body.vision_alpha = move_towards(body.vision_alpha, *target, rate);
                events.signal(Signal::VisionAlpha {
                    entity: body.id,
                    alpha: body.vision_alpha,
                });
                if (body.vision_alpha - *target).abs() <= f32::EPSILON {
                    Progress::Done
                } else {
                    Progress::Running
                }
            }
            Self::HideSeenThings { delay } => {
                *delay -= dt;
                if *delay <= Fixed::ZERO {
                    body.reveals = false;
                    Progress::Done
                } else {
                    Progress::Running
                }
            }
            Self::Decay {
                delay,
                depth,
                speed,
            } => {
                if *delay > Fixed::ZERO {
                    *delay -= dt;
                    return Progress::Running;
                }
                let sink = *speed * dt_secs;
                body.sunk += sink;
                body.position.y -= sink;
                if body.sunk >= *depth {
                    Progress::Despawn
                } else {
                    Progress::Running
                }
            }
            Self::CombatReadyBlend { target, rate } => {
                body.combat_ready = move_towards(body.combat_ready, *target, *rate * dt_secs);
                events.signal(Signal::CombatReady {
                    entity: body.id,
                    value: body.combat_ready,
                });
                if (body.combat_ready - *target).abs() <= f32::EPSILON {
                    Progress::Done
                } else {
                    Progress::Running
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Running {
    entity: EntityId,
    procedure: Procedure,
}

/// Timer heap and running procedures of one world.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    timers: BinaryHeap<Reverse<Timer>>,
    procedures: Vec<Running>,
    next_seq: u64,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer that fires once `now >= due`.
    pub fn schedule(&mut self, due: Fixed, event: TimerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Reverse(Timer { due, seq, event }));
    }

    /// Pop every timer due at or before `now`, earliest first.
    pub fn expire(&mut self, now: Fixed) -> Vec<TimerEvent> {
        let mut fired = Vec::new();
        while let Some(Reverse(timer)) = self.timers.peek() {
            if timer.due > now {
                break;
            }
            fired.push(timer.event);
            self.timers.pop();
        }
        fired
    }

    /// Number of armed timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Start a procedure for `entity`.
    ///
    /// A combat-ready blend replaces any blend already running for the
    /// entity so two blends never drive the same value.
    pub fn start(&mut self, entity: EntityId, procedure: Procedure) {
        if procedure.kind() == ProcedureKind::CombatReadyBlend {
            self.cancel(entity, ProcedureKind::CombatReadyBlend);
        }
        tracing::trace!(entity, kind = ?procedure.kind(), "procedure started");
        self.procedures.push(Running { entity, procedure });
    }

    /// Stop every procedure of `kind` running for `entity`.
    pub fn cancel(&mut self, entity: EntityId, kind: ProcedureKind) {
        self.procedures
            .retain(|r| !(r.entity == entity && r.procedure.kind() == kind));
    }

    /// Stop every procedure running for `entity`.
    pub fn cancel_all(&mut self, entity: EntityId) {
        self.procedures.retain(|r| r.entity != entity);
    }

    /// Whether a procedure of `kind` is running for `entity`.
    #[must_use]
    pub fn is_running(&self, entity: EntityId, kind: ProcedureKind) -> bool {
        self.procedures
            .iter()
            .any(|r| r.entity == entity && r.procedure.kind() == kind)
    }

    /// Number of running procedures.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.procedures.len()
    }

    /// Advance every procedure by `dt`, returning entities whose decay
    /// finished and must be removed.
    pub fn step(
        &mut self,
        dt: Fixed,
        entities: &mut EntityStorage,
        events: &mut TickEvents,
    ) -> Vec<EntityId> {
        let mut despawn = Vec::new();
        self.procedures.retain_mut(|running| {
            let Some(entity) = entities.get_mut(running.entity) else {
                return false;
            };
            match running.procedure.step(&mut entity.body, dt, events) {
                Progress::Running => true,
                Progress::Done => false,
                Progress::Despawn => {
                    despawn.push(running.entity);
                    false
                }
            }
        });
        for id in &despawn {
            self.cancel_all(*id);
        }
        despawn
    }
}

/// Interval bookkeeping for periodic hostile scans.
///
/// At most one timer is armed per clock. A fired timer only marks a scan
/// due if the owner was still in a scanning state when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanClock {
    last_scan: Fixed,
    armed: bool,
    due: bool,
}

impl ScanClock {
    /// A clock whose first scan comes one interval after `now`.
    #[must_use]
    pub const fn new(now: Fixed) -> Self {
        Self {
            last_scan: now,
            armed: false,
            due: false,
        }
    }

    /// Arm the next scan unless a timer is already pending.
    pub fn arm(&mut self, owner: EntityId, interval: Fixed, now: Fixed, scheduler: &mut Scheduler) {
        if self.armed {
            return;
        }
        self.armed = true;
        let due = (self.last_scan + interval).max(now);
        scheduler.schedule(due, TimerEvent::GuardScan(owner));
    }

    /// The armed timer fired.
    pub fn fire(&mut self, scanning: bool) {
        self.armed = false;
        self.due = scanning;
    }

    /// Drop a pending scan without running it.
    pub fn reset(&mut self) {
        self.due = false;
    }

    /// Consume a due scan, recording `now` as the scan time.
    pub fn take_due(&mut self, now: Fixed) -> bool {
        if self.due {
            self.due = false;
            self.last_scan = now;
            true
        } else {
            false
        }
    }

    /// Whether a timer is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }
}
