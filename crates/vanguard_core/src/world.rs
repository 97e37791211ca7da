//! The simulation world: owns every entity and runs the tick.
//!
//! A world is created with its configuration, factions and templates, and
//! torn down by dropping it. Entities register into the live list and their
//! faction's member list on spawn and unregister on death; corpses stay in
//! storage until their decay finishes.
//!
//! # Tick order
//!
//! 1. Expired timers are delivered.
//! 2. Navigation moves agents.
//! 3. Units run their dequeue loop and state step, in id order.
//! 4. Buildings step, in id order.
//! 5. Projectiles fly and land.
//! 6. Timed procedures advance; finished corpses despawn.
//! 7. Fog-of-war visibility is refreshed.
//!
//! # Example
//!
//! ```
//! use vanguard_core::prelude::*;
//!
//! let mut library = TemplateLibrary::new();
//! library
//!     .insert_unit(UnitData {
//!         id: "footman".into(),
//!         name: "Footman".into(),
//!         health: 60,
//!         speed: 3.0,
//!         stopping_distance: 0.1,
//!         engage_distance: 1.5,
//!         guard_distance: 6.0,
//!         damage: DamageRange { min: 4, max: 7 },
//!         projectile: None,
//!         tags: Vec::new(),
//!     })
//!     .unwrap();
//! let factions = [FactionData {
//!     id: FactionId(1),
//!     name: "Blue".into(),
//!     color: FactionColor::Blue,
//!     alliance_id: 1,
//! }];
//!
//! let mut world = World::new(WorldConfig::default(), &factions, library).unwrap();
//! let unit = world
//!     .spawn_unit(UnitSpawn::new("footman", FactionId(1), Vec3::ZERO))
//!     .unwrap();
//!
//! assert!(world.issue_command(unit, Command::MoveTo(Vec3::new(5.0, 0.0, 0.0)), false).unwrap());
//! world.tick();
//! assert_eq!(world.unit(unit).unwrap().state(), UnitState::MovingToSpot);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::building::Building;
use crate::command::Command;
use crate::config::WorldConfig;
use crate::context::StepContext;
use crate::data::{DamageRange, FactionData, ProjectileData, TemplateLibrary};
use crate::entity::{Body, Entity, EntityId, EntityKind, EntityStorage, Lifecycle};
use crate::error::{GameError, Result};
use crate::factions::{FactionId, FactionRegistry, MemberKind};
use crate::math::{Fixed, Vec3};
use crate::navigation::{AgentParams, DirectNavigation, Navigation};
use crate::perception::{Perception, RadiusPerception};
use crate::platoon::Platoon;
use crate::presentation::{DamageEvent, Signal, TickEvents};
use crate::projectile::{Flight, Projectile};
use crate::scheduler::{Procedure, ProcedureKind, Scheduler, TimerEvent};
use crate::unit::{StepOutcome, Unit, UnitState};

/// Callback run with the id of every entity that dies.
pub type DeathListener = Box<dyn FnMut(EntityId)>;

/// Parameters for spawning a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpawn {
    /// Unit template id.
    pub template: String,
    /// Owning faction.
    pub faction: FactionId,
    /// Spawn position.
    pub position: Vec3,
    /// `Idle` or `Guarding`; other states are corrected to `Idle`.
    pub initial_state: UnitState,
}

impl UnitSpawn {
    /// An idle unit.
    #[must_use]
    pub fn new(template: impl Into<String>, faction: FactionId, position: Vec3) -> Self {
        Self {
            template: template.into(),
            faction,
            position,
            initial_state: UnitState::Idle,
        }
    }

    /// Start on guard at the spawn position.
    #[must_use]
    pub fn guarding(mut self) -> Self {
        self.initial_state = UnitState::Guarding;
        self
    }
}

/// Parameters for spawning a building.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingSpawn {
    /// Building template id.
    pub template: String,
    /// Owning faction.
    pub faction: FactionId,
    /// Position.
    pub position: Vec3,
}

impl BuildingSpawn {
    /// A building at `position`.
    #[must_use]
    pub fn new(template: impl Into<String>, faction: FactionId, position: Vec3) -> Self {
        Self {
            template: template.into(),
            faction,
            position,
        }
    }
}

/// One simulation world.
pub struct World {
    config: WorldConfig,
    factions: FactionRegistry,
    templates: TemplateLibrary,
    entities: EntityStorage,
    live: Vec<EntityId>,
    scheduler: Scheduler,
    navigation: Box<dyn Navigation>,
    perception: Box<dyn Perception>,
    projectiles: Vec<Projectile>,
    selection: Platoon,
    death_listeners: Vec<DeathListener>,
    player: FactionId,
    events: TickEvents,
    rng: StdRng,
    tick: u64,
    clock: Fixed,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("entities", &self.entities.len())
            .field("live", &self.live.len())
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create a world with straight-line navigation and radius perception.
    ///
    /// The player faction defaults to the lowest faction id.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or faction ids
    /// are duplicated.
    pub fn new(
        config: WorldConfig,
        factions: &[FactionData],
        templates: TemplateLibrary,
    ) -> Result<Self> {
        config.validate()?;
        let factions = FactionRegistry::from_data(factions)?;
        let player = factions.iter().next().map_or(FactionId(0), |f| f.id);
        let rng = StdRng::seed_from_u64(config.seed);

        tracing::debug!(
            seed = config.seed,
            tick_rate = config.tick_rate,
            factions = factions.iter().count(),
            "world created"
        );

        Ok(Self {
            config,
            factions,
            templates,
            entities: EntityStorage::new(),
            live: Vec::new(),
            scheduler: Scheduler::new(),
            navigation: Box::new(DirectNavigation::new()),
            perception: Box::new(RadiusPerception),
            projectiles: Vec::new(),
            selection: Platoon::new(),
            death_listeners: Vec::new(),
            player,
            events: TickEvents::default(),
            rng,
            tick: 0,
            clock: Fixed::ZERO,
        })
    }

    /// Replace the navigation collaborator. Call before spawning units.
    #[must_use]
    pub fn with_navigation(mut self, navigation: impl Navigation + 'static) -> Self {
        self.navigation = Box::new(navigation);
        self
    }

    /// Replace the perception collaborator.
    #[must_use]
    pub fn with_perception(mut self, perception: impl Perception + 'static) -> Self {
        self.perception = Box::new(perception);
        self
    }

    /// Choose which faction the fog of war is computed for.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownFaction`] if the faction does not exist.
    pub fn set_player_faction(&mut self, faction: FactionId) -> Result<()> {
        self.ensure_faction(faction)?;
        self.player = faction;
        for id in self.entities.sorted_ids() {
            let allied = self.is_player_allied(id);
            if let Some(entity) = self.entities.get_mut(id) {
                if entity.body.lifecycle == Lifecycle::Alive {
                    entity.body.reveals = allied;
                }
            }
        }
        self.refresh_visibility();
        Ok(())
    }

    /// The faction the fog of war is computed for.
    #[must_use]
    pub const fn player_faction(&self) -> FactionId {
        self.player
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Spawn a unit from a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template or faction is unknown or the
    /// position is not finite.
    pub fn spawn_unit(&mut self, spawn: UnitSpawn) -> Result<EntityId> {
        let template = self
            .templates
            .unit(&spawn.template)
            .cloned()
            .ok_or_else(|| GameError::UnknownTemplate(spawn.template.clone()))?;
        self.ensure_faction(spawn.faction)?;
        ensure_finite(spawn.position)?;

        let mut body = Body::new(
            template.name.clone(),
            spawn.faction,
            spawn.position,
            template.health,
        );
        body.guard_distance = template.guard_distance;
        let params = AgentParams {
            speed: template.speed,
            stopping_distance: template.stopping_distance,
        };
        let unit = Unit::new(template, spawn.initial_state, spawn.position, self.clock);

        let id = self.entities.insert(Entity {
            body,
            kind: EntityKind::Unit(Box::new(unit)),
        });
        self.navigation.add_agent(id, spawn.position, params);
        self.register(id, spawn.faction, MemberKind::Unit);

        tracing::debug!(
            entity = id,
            template = %spawn.template,
            faction = spawn.faction.0,
            "unit spawned"
        );
        Ok(id)
    }

    /// Spawn a building from a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template or faction is unknown or the
    /// position is not finite.
    pub fn spawn_building(&mut self, spawn: BuildingSpawn) -> Result<EntityId> {
        let template = self
            .templates
            .building(&spawn.template)
            .cloned()
            .ok_or_else(|| GameError::UnknownTemplate(spawn.template.clone()))?;
        self.ensure_faction(spawn.faction)?;
        ensure_finite(spawn.position)?;

        let mut body = Body::new(
            template.name.clone(),
            spawn.faction,
            spawn.position,
            template.health,
        );
        body.guard_distance = template.guard_distance;
        let building = Building::new(template, self.clock);

        let id = self.entities.insert(Entity {
            body,
            kind: EntityKind::Building(Box::new(building)),
        });
        self.register(id, spawn.faction, MemberKind::Building);

        tracing::debug!(
            entity = id,
            template = %spawn.template,
            faction = spawn.faction.0,
            "building spawned"
        );
        Ok(id)
    }

    fn register(&mut self, id: EntityId, faction: FactionId, kind: MemberKind) {
        self.live.push(id);
        self.factions.register(faction, id, kind);

        let allied = self.factions.is_allied_with(self.player, faction);
        let fade = self.config.vision_fade_time;
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        entity.body.visible = allied;
        entity.body.reveals = allied;
        self.events.signal(Signal::Visibility {
            entity: id,
            visible: allied,
        });
        if allied {
            self.scheduler.start(
                id,
                Procedure::VisionFade {
                    target: 1.0,
                    duration: fade,
                },
            );
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Add a command to a unit's queue.
    ///
    /// With `clear` (or for `Stop`) the queue is emptied first. Returns
    /// `Ok(false)` if the unit refuses the command; a refused command
    /// leaves the queue untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or not a unit.
    pub fn issue_command(&mut self, id: EntityId, command: Command, clear: bool) -> Result<bool> {
        if !self.accepts(id, &command)? {
            return Ok(false);
        }
        self.unit_mut_internal(id)?.enqueue(command, clear);
        Ok(true)
    }

    /// Insert a command at `index` of a unit's queue without clearing it.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or not a unit.
    pub fn insert_command(&mut self, id: EntityId, command: Command, index: usize) -> Result<bool> {
        if !self.accepts(id, &command)? {
            return Ok(false);
        }
        self.unit_mut_internal(id)?.insert(command, index);
        Ok(true)
    }

    fn accepts(&self, id: EntityId, command: &Command) -> Result<bool> {
        let entity = self.entities.get(id).ok_or(GameError::EntityNotFound(id))?;
        let unit = entity.as_unit().ok_or(GameError::NotCommandable(id))?;
        if unit.is_dead() {
            tracing::debug!(entity = id, ?command, "command to dead unit ignored");
            return Ok(false);
        }
        if !command.is_viable(id, |target| self.entities.is_alive(target)) {
            tracing::debug!(entity = id, ?command, "command rejected");
            return Ok(false);
        }
        Ok(true)
    }

    fn unit_mut_internal(&mut self, id: EntityId) -> Result<&mut Unit> {
        self.entities
            .get_mut(id)
            .and_then(Entity::as_unit_mut)
            .ok_or(GameError::NotCommandable(id))
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Apply damage to an entity. Dead entities ignore attacks.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if `id` is unknown.
    pub fn suffer_attack(&mut self, id: EntityId, damage: u32) -> Result<()> {
        if !self.entities.contains(id) {
            return Err(GameError::EntityNotFound(id));
        }
        self.apply_damage(None, id, damage);
        Ok(())
    }

    fn apply_damage(&mut self, source: Option<EntityId>, target: EntityId, damage: u32) {
        let Some(entity) = self.entities.get_mut(target) else {
            return;
        };
        if entity.is_dead() {
            return;
        }

        let dealt = entity.body.health.apply_damage(damage);
        let health = entity.body.health;
        if let EntityKind::Building(building) = &mut entity.kind {
            building.update_burn_effects(target, health, &mut self.events);
        }
        self.events.damage.push(DamageEvent {
            source,
            target,
            amount: dealt,
        });

        if health.is_depleted() {
            self.die(target);
        }
    }

    /// The attacker's animation reached its hit frame.
    ///
    /// Rolls damage from the attacker's range and applies it to the current
    /// target, or launches a projectile carrying it. Stops the attack
    /// animation if the attacker or its target is dead.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if `attacker` is unknown.
    pub fn trigger_attack_anim_event(&mut self, attacker: EntityId) -> Result<()> {
        let entity = self
            .entities
            .get(attacker)
            .ok_or(GameError::EntityNotFound(attacker))?;
        let origin = entity.body.position;
        let (target, damage, projectile) = attack_profile(entity);

        let target = target.filter(|&t| !entity.is_dead() && self.entities.is_alive(t));
        let Some(target) = target else {
            if let Some(entity) = self.entities.get_mut(attacker) {
                match &mut entity.kind {
                    EntityKind::Unit(unit) => {
                        unit.stop_attack_animation(attacker, &mut self.events);
                    }
                    EntityKind::Building(building) => {
                        building.set_attack_animation(attacker, &mut self.events, false);
                    }
                }
            }
            return Ok(());
        };

        let amount = self.rng.random_range(damage.min..=damage.max.max(damage.min));
        match projectile {
            Some(shot) if shot.speed > 0.0 && shot.speed.is_finite() => {
                self.projectiles.push(Projectile {
                    source: attacker,
                    target,
                    position: origin,
                    speed: shot.speed,
                    damage: amount,
                });
                self.events.signal(Signal::ProjectileLaunched {
                    source: attacker,
                    target,
                });
            }
            Some(shot) => {
                tracing::error!(
                    entity = attacker,
                    speed = shot.speed,
                    "projectile misconfigured, shot skipped"
                );
            }
            None => self.apply_damage(Some(attacker), target, amount),
        }
        Ok(())
    }

    /// Run the death procedure. Returns `false` if the entity was already
    /// dead.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if `id` is unknown.
    pub fn kill(&mut self, id: EntityId) -> Result<bool> {
        if !self.entities.contains(id) {
            return Err(GameError::EntityNotFound(id));
        }
        Ok(self.die(id))
    }

    fn die(&mut self, id: EntityId) -> bool {
        let fade = self.config.vision_fade_time;
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if entity.body.lifecycle == Lifecycle::Decaying {
            return false;
        }

        let body = &mut entity.body;
        body.health.current = 0;
        body.interactive = false;
        body.lifecycle = Lifecycle::Decaying;
        let faction = body.faction;
        let was_selected = std::mem::replace(&mut body.selected, false);
        let health = body.health;

        let (hide_delay, decay) = match &mut entity.kind {
            EntityKind::Unit(unit) => {
                unit.enter_dead(id, &mut self.events);
                (
                    fade / Fixed::from_num(2),
                    Procedure::Decay {
                        delay: self.config.unit_decay_delay,
                        depth: self.config.unit_decay_depth,
                        speed: self.config.decay_sink_speed,
                    },
                )
            }
            EntityKind::Building(building) => {
                building.enter_dead(id, health, &mut self.events);
                (
                    fade,
                    Procedure::Decay {
                        delay: Fixed::ZERO,
                        depth: self.config.building_decay_depth,
                        speed: self.config.decay_sink_speed,
                    },
                )
            }
        };

        self.events.signal(Signal::DeathTrigger { entity: id });
        if was_selected {
            self.events.signal(Signal::Selected {
                entity: id,
                selected: false,
            });
        }
        self.selection.remove(id);

        self.live.retain(|&live| live != id);
        self.factions.unregister(faction, id);
        self.navigation.remove_agent(id);
        self.scheduler.cancel_all(id);

        self.scheduler
            .start(id, Procedure::HideSeenThings { delay: hide_delay });
        self.scheduler.start(
            id,
            Procedure::VisionFade {
                target: 0.0,
                duration: fade,
            },
        );
        self.scheduler.start(id, decay);

        self.events.deaths.push(id);
        for listener in &mut self.death_listeners {
            listener(id);
        }

        tracing::debug!(entity = id, tick = self.tick, "entity died");
        true
    }

    /// Register a callback run with the id of every entity that dies.
    pub fn on_death(&mut self, listener: impl FnMut(EntityId) + 'static) {
        self.death_listeners.push(Box::new(listener));
    }

    /// Blend an entity's combat-ready stance toward ready or relaxed.
    ///
    /// Cancels a blend already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EntityNotFound`] if `id` is unknown.
    pub fn set_combat_ready(&mut self, id: EntityId, ready: bool) -> Result<()> {
        if !self.entities.contains(id) {
            return Err(GameError::EntityNotFound(id));
        }
        self.scheduler.start(
            id,
            Procedure::CombatReadyBlend {
                target: if ready { 1.0 } else { 0.0 },
                rate: self.config.combat_ready_switch_rate,
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Replace the selection with `units`. Returns how many were selected.
    pub fn select(&mut self, units: &[EntityId]) -> usize {
        self.clear_selection();
        units
            .iter()
            .filter(|&&id| self.add_to_selection(id))
            .count()
    }

    /// Add a live unit to the selection.
    pub fn add_to_selection(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if entity.as_unit().is_none() || entity.is_dead() || !self.selection.add(id) {
            return false;
        }
        entity.body.selected = true;
        self.events.signal(Signal::Selected {
            entity: id,
            selected: true,
        });
        true
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        for id in self.selection.units().to_vec() {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.body.selected = false;
                self.events.signal(Signal::Selected {
                    entity: id,
                    selected: false,
                });
            }
        }
        self.selection.clear();
    }

    /// The selected units.
    #[must_use]
    pub const fn selection(&self) -> &Platoon {
        &self.selection
    }

    /// Issue a command to every selected unit.
    ///
    /// A follow-up command is queued behind current orders; otherwise the
    /// queues are cleared first. Returns how many units accepted.
    pub fn issue_to_selection(&mut self, command: Command, follow_up: bool) -> usize {
        self.selection
            .units()
            .to_vec()
            .into_iter()
            .filter(|&id| matches!(self.issue_command(id, command, !follow_up), Ok(true)))
            .count()
    }

    /// Order the selection to move.
    pub fn move_selection_to(&mut self, destination: Vec3, follow_up: bool) -> usize {
        self.issue_to_selection(Command::MoveTo(destination), follow_up)
    }

    /// Order the selection to attack-move.
    pub fn attack_move_selection_to(&mut self, destination: Vec3, follow_up: bool) -> usize {
        self.issue_to_selection(Command::AttackMoveTo(destination), follow_up)
    }

    /// Order the selection to attack one entity.
    pub fn attack_target_with_selection(&mut self, target: EntityId, follow_up: bool) -> usize {
        self.issue_to_selection(Command::AttackTarget(target), follow_up)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the world by one tick.
    ///
    /// Returns everything that happened since the previous tick, including
    /// events raised by calls made between ticks.
    pub fn tick(&mut self) -> TickEvents {
        let dt = self.config.tick_duration();
        let now = self.clock;

        // 1. Timers
        for event in self.scheduler.expire(now) {
            match event {
                TimerEvent::GuardScan(id) => {
                    if let Some(entity) = self.entities.get_mut(id) {
                        match &mut entity.kind {
                            EntityKind::Unit(unit) => unit.on_scan_timer(),
                            EntityKind::Building(building) => building.on_scan_timer(),
                        }
                    }
                }
            }
        }

        // 2. Navigation
        let ids = self.entities.sorted_ids();
        self.run_navigation(&ids, dt);

        // 3. Units, 4. Buildings
        for units_pass in [true, false] {
            for &id in &ids {
                let due = self.entities.get(id).is_some_and(|e| {
                    e.body.lifecycle == Lifecycle::Alive && e.as_unit().is_some() == units_pass
                });
                if due {
                    self.step_entity(id, now, dt);
                }
            }
        }

        // 5. Projectiles
        self.run_projectiles(dt);

        // 6. Procedures
        for id in self.scheduler.step(dt, &mut self.entities, &mut self.events) {
            self.entities.remove(id);
            self.events.despawned.push(id);
            tracing::debug!(entity = id, tick = self.tick, "corpse despawned");
        }

        // 7. Visibility
        self.refresh_visibility();

        #[cfg(feature = "debug-validation")]
        self.validate_registry();

        self.tick += 1;
        self.clock = self.config.time_at_tick(self.tick);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "world state hash");
        }

        std::mem::take(&mut self.events)
    }

    fn run_navigation(&mut self, ids: &[EntityId], dt: Fixed) {
        let dt_secs: f32 = dt.to_num();
        for &id in ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if entity.body.lifecycle != Lifecycle::Alive || entity.as_unit().is_none() {
                continue;
            }
            if let Some(position) = self.navigation.advance(id, dt_secs) {
                let mut heading = self.navigation.velocity(id);
                heading.y = 0.0;
                if heading.length() > f32::EPSILON {
                    entity.body.forward = heading.normalize();
                }
                entity.body.position = position;
            }
        }
    }

    fn step_entity(&mut self, id: EntityId, now: Fixed, dt: Fixed) {
        let Some(mut entity) = self.entities.take(id) else {
            return;
        };

        let outcome = {
            let mut ctx = StepContext {
                entities: &self.entities,
                live: &self.live,
                factions: &self.factions,
                perception: self.perception.as_ref(),
                navigation: self.navigation.as_mut(),
                scheduler: &mut self.scheduler,
                events: &mut self.events,
                config: &self.config,
                now,
                dt,
            };
            match &mut entity.kind {
                EntityKind::Unit(unit) => unit.step(&mut entity.body, &mut ctx),
                EntityKind::Building(building) => building.step(&mut entity.body, &mut ctx),
            }
        };

        self.entities.restore(entity);
        if outcome == StepOutcome::Die {
            self.die(id);
        }
    }

    fn run_projectiles(&mut self, dt: Fixed) {
        let dt_secs: f32 = dt.to_num();
        let mut landed = Vec::new();
        let entities = &self.entities;
        self.projectiles
            .retain_mut(|shot| match shot.advance(entities, dt_secs) {
                Flight::InFlight => true,
                Flight::Hit => {
                    landed.push(*shot);
                    false
                }
                Flight::Fizzled => false,
            });
        for shot in landed {
            self.apply_damage(Some(shot.source), shot.target, shot.damage);
        }
    }

    fn refresh_visibility(&mut self) {
        let mut seen = BTreeSet::new();
        for (_, entity) in self.entities.iter() {
            if entity.body.reveals {
                seen.extend(self.perception.visible_entities(&entity.body, &self.entities));
            }
        }

        for id in self.entities.sorted_ids() {
            let allied = self.is_player_allied(id);
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let visible = allied || seen.contains(&id);
            if entity.body.visible == visible {
                continue;
            }
            entity.body.visible = visible;
            self.events.signal(Signal::Visibility {
                entity: id,
                visible,
            });
            self.events.signal(if visible {
                Signal::HealthbarShown { entity: id }
            } else {
                Signal::DisappearedInFog { entity: id }
            });
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate_registry(&self) {
        for &id in &self.live {
            let entity = self.entities.get(id);
            debug_assert!(
                entity.is_some_and(|e| e.body.lifecycle == Lifecycle::Alive),
                "live registry holds entity {id} that is not alive"
            );
            if let Some(entity) = entity {
                let faction = self.factions.get(entity.body.faction);
                debug_assert!(
                    faction.map_or(true, |f| f.units().contains(&id) || f.buildings().contains(&id)),
                    "entity {id} missing from its faction"
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// `true` if `id` is absent, unknown or refers to a dead entity.
    #[must_use]
    pub fn is_dead_or_null(&self, id: Option<EntityId>) -> bool {
        id.map_or(true, |id| !self.entities.is_alive(id))
    }

    /// `true` if `id` refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Look up any entity, alive or decaying.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.entities.get(id).and_then(Entity::as_unit)
    }

    /// Mutable access to a unit, for inspection tooling and tests.
    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.entities.get_mut(id).and_then(Entity::as_unit_mut)
    }

    /// Look up a building.
    #[must_use]
    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.entities.get(id).and_then(Entity::as_building)
    }

    /// Mutable access to a building, for inspection tooling and tests.
    pub fn building_mut(&mut self, id: EntityId) -> Option<&mut Building> {
        self.entities.get_mut(id).and_then(|e| match &mut e.kind {
            EntityKind::Building(building) => Some(building.as_mut()),
            EntityKind::Unit(_) => None,
        })
    }

    /// Live entities in registration order.
    #[must_use]
    pub fn live_entities(&self) -> &[EntityId] {
        &self.live
    }

    /// Entities `observer` can currently see.
    #[must_use]
    pub fn visible_entities(&self, observer: EntityId) -> Vec<EntityId> {
        self.entities
            .get(observer)
            .map(|e| self.perception.visible_entities(&e.body, &self.entities))
            .unwrap_or_default()
    }

    /// Move an entity instantly, keeping navigation in sync.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or the position is not finite.
    pub fn teleport(&mut self, id: EntityId, position: Vec3) -> Result<()> {
        ensure_finite(position)?;
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?;
        entity.body.position = position;
        if entity.as_unit().is_some() {
            self.navigation.warp(id, position);
        }
        Ok(())
    }

    /// Faction registry.
    #[must_use]
    pub const fn factions(&self) -> &FactionRegistry {
        &self.factions
    }

    /// Template library.
    #[must_use]
    pub const fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Navigation collaborator.
    #[must_use]
    pub fn navigation(&self) -> &dyn Navigation {
        self.navigation.as_ref()
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Whether a procedure of `kind` is running for `id`.
    #[must_use]
    pub fn is_procedure_running(&self, id: EntityId, kind: ProcedureKind) -> bool {
        self.scheduler.is_running(id, kind)
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub const fn time(&self) -> Fixed {
        self.clock
    }

    /// Calculate a hash of the world state for determinism checks.
    ///
    /// Two worlds fed the same inputs produce the same hash on every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(entity) = self.entities.get(id) else {
                continue;
            };
            let body = &entity.body;
            id.hash(&mut hasher);
            body.position.x.to_bits().hash(&mut hasher);
            body.position.y.to_bits().hash(&mut hasher);
            body.position.z.to_bits().hash(&mut hasher);
            body.health.current.hash(&mut hasher);
            body.visible.hash(&mut hasher);
            body.lifecycle.hash(&mut hasher);

            match &entity.kind {
                EntityKind::Unit(unit) => {
                    unit.state().hash(&mut hasher);
                    unit.target().hash(&mut hasher);
                    unit.queue().len().hash(&mut hasher);
                }
                EntityKind::Building(building) => {
                    building.state().hash(&mut hasher);
                    building.target().hash(&mut hasher);
                }
            }
        }

        self.live.hash(&mut hasher);
        for shot in &self.projectiles {
            shot.target.hash(&mut hasher);
            shot.damage.hash(&mut hasher);
            shot.position.x.to_bits().hash(&mut hasher);
            shot.position.z.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    fn ensure_faction(&self, faction: FactionId) -> Result<()> {
        if self.factions.contains(faction) {
            Ok(())
        } else {
            Err(GameError::UnknownFaction(faction.0))
        }
    }

    fn is_player_allied(&self, id: EntityId) -> bool {
        self.entities
            .get(id)
            .is_some_and(|e| self.factions.is_allied_with(self.player, e.body.faction))
    }
}

fn ensure_finite(position: Vec3) -> Result<()> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(GameError::InvalidData(format!(
            "position must be finite, got {position:?}"
        )))
    }
}

/// Target, damage range and projectile of an attacker.
fn attack_profile(entity: &Entity) -> (Option<EntityId>, DamageRange, Option<ProjectileData>) {
    match &entity.kind {
        EntityKind::Unit(unit) => (
            unit.target(),
            unit.template().damage,
            unit.template().projectile,
        ),
        EntityKind::Building(building) => match &building.template().weapon {
            Some(weapon) => (building.target(), weapon.damage, weapon.projectile),
            None => (None, DamageRange::fixed(0), None),
        },
    }
}
