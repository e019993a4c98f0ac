//! Simulation context
//!
//! `GameWorld` owns exactly one grid, one coordinator and one contact queue.
//! Nothing in the core is global; two worlds can run side by side.

use std::time::Instant;

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::game::contacts::{ContactEffect, ContactQueue, ContactSender};
use crate::game::entity::{ArenaEntity, HovercraftId};
use crate::game::performance::TickBudget;
use crate::game::services::{HovercraftRegistry, PhysicsService};
use crate::game::spatial::{GridError, SpatialMap};
use crate::game::systems::ai::SeekPoints;
use crate::game::systems::coordinator::{AiCoordinator, TickSummary};

pub struct GameWorld {
    config: SimulationConfig,
    grid: SpatialMap,
    coordinator: AiCoordinator,
    contacts: ContactQueue,
    seek_points: SeekPoints,
    statics: Vec<ArenaEntity>,
    /// Hovercraft synced into the grid last tick
    tracked: HashSet<HovercraftId, FxBuildHasher>,
    budget: TickBudget,
    tick: u64,
}

impl GameWorld {
    /// Build the grid from `config` and register the arena's static entities.
    /// Fails fast on a grid that cannot be built.
    pub fn new(config: SimulationConfig, statics: Vec<ArenaEntity>) -> Result<Self, GridError> {
        let mut grid = SpatialMap::new(&config.arena)?;
        grid.populate_static(statics.iter());
        let seek_points = SeekPoints::from_grid(&grid);

        info!(
            seek_points = seek_points.len(),
            tick_rate = config.tick_rate,
            parallel_ai = config.ai.parallel_enabled,
            "Game world ready"
        );

        Ok(Self {
            coordinator: AiCoordinator::new(config.ai.clone()),
            budget: TickBudget::new(config.tick_rate),
            config,
            grid,
            contacts: ContactQueue::default(),
            seek_points,
            statics,
            tracked: HashSet::with_hasher(FxBuildHasher),
            tick: 0,
        })
    }

    /// Tear down for a new game: rebuild the grid from `config` with the same
    /// static entities and reset every bot's brain. Pending contacts are discarded.
    pub fn reset(&mut self, config: SimulationConfig) -> Result<(), GridError> {
        self.grid.reinitialize(&config.arena)?;
        self.grid.populate_static(self.statics.iter());
        self.seek_points = SeekPoints::from_grid(&self.grid);

        self.coordinator.set_config(config.ai.clone());
        self.coordinator.reset();
        let dropped = self.contacts.drain().len();
        self.tracked.clear();
        self.budget = TickBudget::new(config.tick_rate);
        self.config = config;
        self.tick = 0;

        info!(dropped_contacts = dropped, stats = ?self.grid.stats(), "Game world reset");
        Ok(())
    }

    /// Handle for contact callbacks on other threads
    pub fn contact_sender(&self) -> ContactSender {
        self.contacts.sender()
    }

    pub fn contacts(&self) -> &ContactQueue {
        &self.contacts
    }

    pub fn grid(&self) -> &SpatialMap {
        &self.grid
    }

    pub fn coordinator(&self) -> &AiCoordinator {
        &self.coordinator
    }

    pub fn seek_points(&self) -> &SeekPoints {
        &self.seek_points
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn budget(&self) -> &TickBudget {
        &self.budget
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// One game tick: apply queued contacts, sync hovercraft into the grid,
    /// then run every bot.
    pub fn tick<W>(&mut self, services: &mut W, dt: f32) -> TickSummary
    where
        W: PhysicsService + HovercraftRegistry,
    {
        self.drain_contacts(services);
        self.sync_dynamics(&*services);

        let start = Instant::now();
        let summary = self
            .coordinator
            .update(services, &self.grid, &self.seek_points, dt);
        let elapsed = start.elapsed();

        if self.budget.record(elapsed) {
            warn!(
                tick = self.tick,
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.budget.budget().as_micros() as u64,
                bots = summary.applied,
                "AI phase over tick budget"
            );
        }

        self.tick += 1;
        summary
    }

    fn drain_contacts<W>(&mut self, services: &mut W)
    where
        W: PhysicsService + HovercraftRegistry,
    {
        for effect in self.contacts.drain() {
            match effect {
                ContactEffect::Reposition { id, position } => {
                    services.set_position(id, position);
                    self.grid.update_dynamic_position(id, position);
                }
                ContactEffect::Destroyed { id } => {
                    self.grid.remove_dynamic(id);
                    self.tracked.remove(&id);
                    if self.coordinator.unregister_bot(id) {
                        debug!(bot = id, "Bot destroyed");
                    }
                }
            }
        }
    }

    fn sync_dynamics<W>(&mut self, services: &W)
    where
        W: PhysicsService + HovercraftRegistry,
    {
        let mut live: HashSet<HovercraftId, FxBuildHasher> =
            HashSet::with_capacity_and_hasher(self.tracked.len(), FxBuildHasher);

        for id in services.players().into_iter().chain(services.bots()) {
            let synced = services
                .footprint(id)
                .map_or(false, |footprint| {
                    self.grid.sync_dynamic(id, &footprint);
                    self.grid.dynamic_range(id).is_some()
                });
            if synced {
                live.insert(id);
            }
        }

        for gone in self.tracked.difference(&live) {
            self.grid.remove_dynamic(*gone);
        }
        self.tracked = live;
    }
}
