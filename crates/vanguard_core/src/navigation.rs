//! Navigation capability consumed by the unit state machine.
//!
//! The core only steers: it sets destinations, stops and resumes agents and
//! asks how far they still have to go. Path planning is the implementor's
//! business. [`DirectNavigation`] walks agents in straight lines and is the
//! default used by worlds and tests.

use std::collections::BTreeMap;
use std::fmt;

use crate::entity::EntityId;
use crate::math::Vec3;

/// Movement parameters of one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentParams {
    /// Top speed in world units per second.
    pub speed: f32,
    /// Distance to the destination at which the agent counts as arrived.
    pub stopping_distance: f32,
}

/// Steering interface for mobile entities.
///
/// Queries about unknown agents answer as if the agent stood still at its
/// destination.
pub trait Navigation: fmt::Debug {
    /// Start tracking an agent at `position`.
    fn add_agent(&mut self, agent: EntityId, position: Vec3, params: AgentParams);

    /// Stop tracking an agent.
    fn remove_agent(&mut self, agent: EntityId);

    /// Steer the agent toward `destination`.
    fn set_destination(&mut self, agent: EntityId, destination: Vec3);

    /// Pause (`true`) or resume (`false`) movement, keeping the destination.
    fn set_stopped(&mut self, agent: EntityId, stopped: bool);

    /// Whether movement is paused.
    fn is_stopped(&self, agent: EntityId) -> bool;

    /// Zero the agent's velocity immediately.
    fn halt(&mut self, agent: EntityId);

    /// Distance left to the current destination.
    fn remaining_distance(&self, agent: EntityId) -> f32;

    /// Arrival threshold of the agent.
    fn stopping_distance(&self, agent: EntityId) -> f32;

    /// Current velocity.
    fn velocity(&self, agent: EntityId) -> Vec3;

    /// Move the agent for `dt` seconds, returning its new position if it moved.
    fn advance(&mut self, agent: EntityId, dt: f32) -> Option<Vec3>;

    /// Place the agent at `position` without moving through the world.
    fn warp(&mut self, agent: EntityId, position: Vec3);

    /// Whether the agent has reached its destination.
    fn has_arrived(&self, agent: EntityId) -> bool {
        self.remaining_distance(agent) <= self.stopping_distance(agent)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Agent {
    position: Vec3,
    destination: Option<Vec3>,
    stopped: bool,
    velocity: Vec3,
    params: AgentParams,
}

impl Agent {
    fn remaining(&self) -> f32 {
        self.destination
            .map_or(0.0, |dest| self.position.distance(dest))
    }
}

/// Straight-line navigation with no obstacles.
#[derive(Debug, Clone, Default)]
pub struct DirectNavigation {
    agents: BTreeMap<EntityId, Agent>,
}

impl DirectNavigation {
    /// Create navigation with no agents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Current destination of an agent.
    #[must_use]
    pub fn destination(&self, agent: EntityId) -> Option<Vec3> {
        self.agents.get(&agent).and_then(|a| a.destination)
    }
}

impl Navigation for DirectNavigation {
    fn add_agent(&mut self, agent: EntityId, position: Vec3, params: AgentParams) {
        self.agents.insert(
            agent,
            Agent {
                position,
                destination: None,
                stopped: false,
                velocity: Vec3::ZERO,
                params,
            },
        );
    }

    fn remove_agent(&mut self, agent: EntityId) {
        self.agents.remove(&agent);
    }

    fn set_destination(&mut self, agent: EntityId, destination: Vec3) {
        if let Some(a) = self.agents.get_mut(&agent) {
            a.destination = Some(destination);
        }
    }

    fn set_stopped(&mut self, agent: EntityId, stopped: bool) {
        if let Some(a) = self.agents.get_mut(&agent) {
            a.stopped = stopped;
            if stopped {
                a.velocity = Vec3::ZERO;
            }
        }
    }

    fn is_stopped(&self, agent: EntityId) -> bool {
        self.agents.get(&agent).map_or(true, |a| a.stopped)
    }

    fn halt(&mut self, agent: EntityId) {
        if let Some(a) = self.agents.get_mut(&agent) {
            a.velocity = Vec3::ZERO;
        }
    }

    fn remaining_distance(&self, agent: EntityId) -> f32 {
        self.agents.get(&agent).map_or(0.0, Agent::remaining)
    }

    fn stopping_distance(&self, agent: EntityId) -> f32 {
        self.agents
            .get(&agent)
            .map_or(0.0, |a| a.params.stopping_distance)
    }

    fn velocity(&self, agent: EntityId) -> Vec3 {
        self.agents.get(&agent).map_or(Vec3::ZERO, |a| a.velocity)
    }

    fn advance(&mut self, agent: EntityId, dt: f32) -> Option<Vec3> {
        let a = self.agents.get_mut(&agent)?;
        let remaining = a.remaining();
        let dest = match a.destination {
            Some(dest) if !a.stopped && remaining > a.params.stopping_distance => dest,
            _ => {
                a.velocity = Vec3::ZERO;
                return None;
            }
        };

        let step = (a.params.speed * dt).min(remaining);
        let next = a.position.move_towards(dest, step);
        a.velocity = if dt > 0.0 {
            (next - a.position) * (1.0 / dt)
        } else {
            Vec3::ZERO
        };
        a.position = next;
        Some(next)
    }

    fn warp(&mut self, agent: EntityId, position: Vec3) {
        if let Some(a) = self.agents.get_mut(&agent) {
            a.position = position;
            a.velocity = Vec3::ZERO;
        }
    }
}
