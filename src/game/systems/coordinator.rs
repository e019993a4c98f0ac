//! AI coordinator
//!
//! Drives every bot's brain once per tick in three phases:
//! 1. snapshot bots and their targets from the collaborators (tick thread)
//! 2. compute decisions, on the rayon pool when enabled
//! 3. apply actions through the physics service in registry order

use hashbrown::HashMap;
use rayon::prelude::*;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::config::AiConfig;
use crate::game::entity::{Footprint, HovercraftId};
use crate::game::services::{Ability, HovercraftRegistry, PhysicsService};
use crate::game::spatial::SpatialMap;
use crate::game::systems::ai::{Action, BotBrain, BotView, SeekPoints, TargetView};
use crate::util::vec2::{Vec2, Vec3};

/// Per-bot state owned by the coordinator
#[derive(Debug, Default)]
struct BotSlot {
    brain: BotBrain,
    /// Whether we last told the physics side to light the trail
    trail_lit: bool,
}

/// Outcome of one coordinator tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Bots that produced and applied an action
    pub applied: usize,
    /// Bots skipped because they or their target could not be resolved
    pub skipped: usize,
}

struct Job {
    bot: BotView,
    target: TargetView,
    slot: BotSlot,
}

/// Nearest opponent for a bot at `origin`.
///
/// Players and bots are scanned separately. Without another bot the nearest
/// player wins; otherwise the closer of the two wins and a tie goes to the player.
pub fn select_target(
    self_id: HovercraftId,
    origin: Vec2,
    players: &[(HovercraftId, Vec2)],
    bots: &[(HovercraftId, Vec2)],
) -> Option<HovercraftId> {
    let nearest = |list: &[(HovercraftId, Vec2)]| {
        let mut best: Option<(HovercraftId, f32)> = None;
        for &(id, position) in list {
            if id == self_id {
                continue;
            }
            let dist = origin.distance_to(position);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }
        best
    };

    match (nearest(players), nearest(bots)) {
        (player, None) => player.map(|(id, _)| id),
        (None, Some((bot, _))) => Some(bot),
        (Some((player, pd)), Some((bot, bd))) => Some(if bd < pd { bot } else { player }),
    }
}

/// Owns one brain per bot and applies their actions
pub struct AiCoordinator {
    slots: HashMap<HovercraftId, BotSlot, FxBuildHasher>,
    config: AiConfig,
}

impl AiCoordinator {
    pub fn new(config: AiConfig) -> Self {
        Self {
            slots: HashMap::with_hasher(FxBuildHasher),
            config,
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AiConfig) {
        self.config = config;
    }

    /// Start driving a bot. Bots found in the registry are registered on first
    /// sight, so calling this is only needed to pre-allocate.
    pub fn register_bot(&mut self, id: HovercraftId) {
        self.slots.entry(id).or_default();
    }

    pub fn unregister_bot(&mut self, id: HovercraftId) -> bool {
        self.slots.remove(&id).is_some()
    }

    pub fn brain(&self, id: HovercraftId) -> Option<&BotBrain> {
        self.slots.get(&id).map(|slot| &slot.brain)
    }

    pub fn bot_count(&self) -> usize {
        self.slots.len()
    }

    /// Reset every brain for a new game
    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            slot.brain.reset();
            slot.trail_lit = false;
        }
    }

    /// Run one tick for every bot the registry lists
    pub fn update<W>(
        &mut self,
        world: &mut W,
        grid: &SpatialMap,
        seek_points: &SeekPoints,
        dt: f32,
    ) -> TickSummary
    where
        W: PhysicsService + HovercraftRegistry,
    {
        let mut summary = TickSummary::default();
        let bot_ids = world.bots();

        // Bots that left the registry since last tick
        let before = self.slots.len();
        self.slots.retain(|id, _| bot_ids.contains(id));
        if self.slots.len() != before {
            debug!(removed = before - self.slots.len(), "Dropped brains of departed bots");
        }

        let players = ground_positions(&*world, &world.players());
        let bots = ground_positions(&*world, &bot_ids);

        // Snapshot
        let mut jobs: Vec<Job> = Vec::with_capacity(bot_ids.len());
        for &id in &bot_ids {
            match snapshot(&*world, id, &players, &bots) {
                Some((bot, target)) => {
                    let slot = self.slots.remove(&id).unwrap_or_default();
                    jobs.push(Job { bot, target, slot });
                }
                None => summary.skipped += 1,
            }
        }

        // Decide
        let config = &self.config;
        let decide = |mut job: Job| {
            let action = job
                .slot
                .brain
                .decide(grid, seek_points, &job.bot, &job.target, config, dt);
            (job, action)
        };
        let decisions: Vec<(Job, Action)> = if config.parallel_enabled {
            jobs.into_par_iter().map(decide).collect()
        } else {
            jobs.into_iter().map(decide).collect()
        };

        // Apply
        for (mut job, action) in decisions {
            let id = job.bot.id;
            if apply_action(world, id, &action, &mut job.slot, &self.config) {
                summary.applied += 1;
            } else {
                summary.skipped += 1;
            }
            self.slots.insert(id, job.slot);
        }

        summary
    }
}

impl Default for AiCoordinator {
    fn default() -> Self {
        Self::new(AiConfig::default())
    }
}

/// Resolve a bot and its target into brain inputs
fn snapshot<W>(
    world: &W,
    id: HovercraftId,
    players: &[(HovercraftId, Vec2)],
    bots: &[(HovercraftId, Vec2)],
) -> Option<(BotView, TargetView)>
where
    W: PhysicsService + HovercraftRegistry,
{
    let Some(position) = world.position(id) else {
        debug!(bot = id, "Bot has no body this tick, skipping");
        return None;
    };
    let origin = position.ground();

    let Some(target_id) = select_target(id, origin, players, bots) else {
        debug!(bot = id, "No opponent to target");
        return None;
    };
    let Some(target_position) = world.position(target_id) else {
        debug!(bot = id, target = target_id, "Target vanished, skipping");
        return None;
    };

    let facing = world.direction(id).map_or(Vec2::ZERO, |d| d.ground());
    let bot = BotView {
        id,
        position: origin,
        facing,
        footprint: footprint_or_point(world, id, position),
    };
    let target = TargetView {
        id: target_id,
        position: target_position.ground(),
        footprint: footprint_or_point(world, target_id, target_position),
    };
    Some((bot, target))
}

fn ground_positions<W: PhysicsService>(world: &W, ids: &[HovercraftId]) -> Vec<(HovercraftId, Vec2)> {
    ids.iter()
        .filter_map(|&id| world.position(id).map(|p| (id, p.ground())))
        .collect()
}

fn footprint_or_point<W: PhysicsService>(world: &W, id: HovercraftId, position: Vec3) -> Footprint {
    world
        .footprint(id)
        .unwrap_or_else(|| Footprint::new(position, Vec3::ZERO, Vec3::ZERO))
}

/// Push one action through the physics service. Returns false when the bot
/// disappeared between snapshot and apply.
fn apply_action<W>(
    world: &mut W,
    id: HovercraftId,
    action: &Action,
    slot: &mut BotSlot,
    config: &AiConfig,
) -> bool
where
    W: PhysicsService + HovercraftRegistry,
{
    let Some(info) = world.resolve(id) else {
        debug!(bot = id, "Bot destroyed before its action was applied");
        return false;
    };

    if action.turn != 0.0 {
        world.turn(id, action.turn);
    }

    if info.controllable && action.has_movement() {
        world.move_by(id, action.movement.x, action.movement.y);
        if let Some(position) = world.position(id) {
            world.set_position(id, position.ground() + action.nudge);
        }
    }

    if action.fire_rocket {
        world.use_ability(id, Ability::Rocket);
    }
    if action.activate_spikes {
        world.use_ability(id, Ability::Spikes);
    }

    let fuel = world.trail_fuel_percent(id).unwrap_or(0.0);
    if slot.trail_lit && fuel <= 0.0 {
        // Burned out on the physics side
        slot.trail_lit = false;
    }
    if action.activate_trail && !slot.trail_lit {
        if fuel > config.trail_fuel_threshold && world.use_ability(id, Ability::TrailActivate) {
            slot.trail_lit = true;
        }
    } else if !action.activate_trail && slot.trail_lit {
        world.use_ability(id, Ability::TrailDeactivate);
        slot.trail_lit = false;
    }

    true
}
