//! Headless skirmish runner.
//!
//! Runs a deployed scenario without a renderer. A renderer would normally
//! play attack clips and call back into the world when a swing lands; the
//! [`HeadlessAnimator`] stands in for it by firing the hit event on a fixed
//! cadence while an attack animation is active.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vanguard_core::entity::EntityId;
use vanguard_core::presentation::{Signal, TickEvents};
use vanguard_core::world::World;

use crate::loader::{DataSet, ToolError};
use crate::scenario::Scenario;

/// Seconds between two hits of an attack clip.
pub const DEFAULT_CLIP_SECONDS: f32 = 1.0;

/// Fires attack hit events for entities whose attack animation is playing.
#[derive(Debug, Clone)]
pub struct HeadlessAnimator {
    clip_ticks: u64,
    playing: BTreeMap<EntityId, u64>,
}

impl HeadlessAnimator {
    /// Create an animator that lands a hit every `clip_ticks` ticks.
    #[must_use]
    pub fn new(clip_ticks: u64) -> Self {
        Self {
            clip_ticks: clip_ticks.max(1),
            playing: BTreeMap::new(),
        }
    }

    /// Create an animator from a clip length in seconds.
    #[must_use]
    pub fn from_clip_seconds(seconds: f32, tick_rate: u32) -> Self {
        let ticks = (seconds.max(0.0) * tick_rate as f32).round() as u64;
        Self::new(ticks)
    }

    /// Entities currently swinging.
    pub fn playing(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.playing.keys().copied()
    }

    /// Follow one tick's animation signals and land the hits that are due.
    ///
    /// Returns the number of hit events fired.
    pub fn advance(&mut self, world: &mut World, events: &TickEvents) -> Result<usize, ToolError> {
        for signal in &events.signals {
            if let Signal::AttackAnimation { entity, active } = *signal {
                if active {
                    self.playing.entry(entity).or_insert(0);
                } else {
                    self.playing.remove(&entity);
                }
            }
        }
        for id in events.deaths.iter().chain(&events.despawned) {
            self.playing.remove(id);
        }

        let mut due = Vec::new();
        for (&id, elapsed) in &mut self.playing {
            *elapsed += 1;
            if *elapsed >= self.clip_ticks {
                *elapsed = 0;
                due.push(id);
            }
        }

        for &id in &due {
            world.trigger_attack_anim_event(id)?;
        }
        Ok(due.len())
    }
}

/// Options for [`run_skirmish`].
#[derive(Debug, Clone)]
pub struct SkirmishOptions {
    /// Ticks to simulate; `None` uses the scenario's count.
    pub ticks: Option<u64>,
    /// Damage seed override.
    pub seed: Option<u64>,
    /// Seconds between hits of an attack clip.
    pub clip_seconds: f32,
    /// Stop early once no two surviving factions are hostile.
    pub stop_when_decided: bool,
}

impl Default for SkirmishOptions {
    fn default() -> Self {
        Self {
            ticks: None,
            seed: None,
            clip_seconds: DEFAULT_CLIP_SECONDS,
            stop_when_decided: true,
        }
    }
}

/// One death during a skirmish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// Tick on which the death procedure ran.
    pub tick: u64,
    /// Entity that died.
    pub entity: EntityId,
    /// Scenario label, if the entity had one.
    pub label: Option<String>,
    /// Template display name.
    pub name: String,
    /// Owning faction's name.
    pub faction: String,
}

/// Surviving entities of one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSummary {
    /// Faction name.
    pub faction: String,
    /// Living units.
    pub units: usize,
    /// Standing buildings.
    pub buildings: usize,
}

/// Outcome of a skirmish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkirmishReport {
    /// Scenario name.
    pub scenario: String,
    /// Damage seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Whether the run ended because only allies were left.
    pub decided: bool,
    /// Hit events fired by the animator.
    pub hits: usize,
    /// Damage dealt in total.
    pub total_damage: u64,
    /// Deaths in order.
    pub deaths: Vec<DeathRecord>,
    /// Survivors per faction, in faction id order.
    pub survivors: Vec<FactionSummary>,
    /// Final world state hash.
    pub state_hash: u64,
}

impl SkirmishReport {
    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String, ToolError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable summary.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Scenario: {}\nSeed: {}\nTicks: {}{}\nHits: {}  Damage: {}\n",
            self.scenario,
            self.seed,
            self.ticks,
            if self.decided { " (decided)" } else { "" },
            self.hits,
            self.total_damage
        );
        out.push_str(&format!("Deaths: {}\n", self.deaths.len()));
        for death in &self.deaths {
            let label = death.label.as_deref().unwrap_or("-");
            out.push_str(&format!(
                "  tick {:>5}  {} [{}] ({})\n",
                death.tick, death.name, label, death.faction
            ));
        }
        out.push_str("Survivors:\n");
        for summary in &self.survivors {
            out.push_str(&format!(
                "  {}: {} units, {} buildings\n",
                summary.faction, summary.units, summary.buildings
            ));
        }
        out
    }
}

/// Deploy `scenario` and run it to completion.
pub fn run_skirmish(
    data: &DataSet,
    scenario: &Scenario,
    options: &SkirmishOptions,
) -> Result<SkirmishReport, ToolError> {
    let deployment = scenario.deploy(data, options.seed)?;
    let mut world = deployment.world;
    let labels: BTreeMap<EntityId, String> = deployment
        .labels
        .into_iter()
        .map(|(label, id)| (id, label))
        .collect();

    let ticks = options.ticks.unwrap_or(scenario.ticks);
    let mut animator = HeadlessAnimator::from_clip_seconds(
        options.clip_seconds,
        world.config().tick_rate,
    );

    let mut report = SkirmishReport {
        scenario: scenario.name.clone(),
        seed: world.config().seed,
        ticks: 0,
        decided: false,
        hits: 0,
        total_damage: 0,
        deaths: Vec::new(),
        survivors: Vec::new(),
        state_hash: 0,
    };

    for _ in 0..ticks {
        let events = world.tick();
        report.ticks += 1;
        record_events(&world, data, &labels, &events, &mut report);

        // Deaths surface one tick late, so check only after recording them.
        if options.stop_when_decided && is_decided(&world) {
            report.decided = true;
            tracing::info!(tick = report.ticks, "skirmish decided");
            break;
        }
        report.hits += animator.advance(&mut world, &events)?;
    }

    report.survivors = survivors(&world, data);
    report.state_hash = world.state_hash();
    tracing::info!(
        scenario = %report.scenario,
        ticks = report.ticks,
        deaths = report.deaths.len(),
        "skirmish finished"
    );
    Ok(report)
}

fn record_events(
    world: &World,
    data: &DataSet,
    labels: &BTreeMap<EntityId, String>,
    events: &TickEvents,
    report: &mut SkirmishReport,
) {
    report.total_damage += events.damage.iter().map(|d| u64::from(d.amount)).sum::<u64>();
    for &id in &events.deaths {
        let Some(entity) = world.entity(id) else {
            continue;
        };
        tracing::debug!(entity = id, name = %entity.body.name, "death");
        report.deaths.push(DeathRecord {
            tick: report.ticks,
            entity: id,
            label: labels.get(&id).cloned(),
            name: entity.body.name.clone(),
            faction: data.faction_name(entity.body.faction),
        });
    }
}

/// Whether no two living entities belong to hostile factions.
fn is_decided(world: &World) -> bool {
    let mut factions: Vec<_> = world
        .live_entities()
        .iter()
        .filter_map(|&id| world.entity(id))
        .map(|e| e.body.faction)
        .collect();
    factions.sort_unstable();
    factions.dedup();

    factions.iter().enumerate().all(|(i, &a)| {
        factions[i + 1..]
            .iter()
            .all(|&b| !world.factions().is_hostile(a, b))
    })
}

fn survivors(world: &World, data: &DataSet) -> Vec<FactionSummary> {
    let mut counts: BTreeMap<_, (usize, usize)> =
        data.factions.iter().map(|f| (f.id, (0, 0))).collect();
    for entity in world.live_entities().iter().filter_map(|&id| world.entity(id)) {
        let entry = counts.entry(entity.body.faction).or_default();
        if entity.as_unit().is_some() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(id, (units, buildings))| FactionSummary {
            faction: data.faction_name(id),
            units,
            buildings,
        })
        .collect()
}
