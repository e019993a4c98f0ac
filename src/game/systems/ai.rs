//! Bot decision engine
//!
//! One `BotBrain` per bot. Each tick it receives read-only snapshots of the
//! bot and its chosen target, plans a path over the grid and turns it into an
//! `Action`. Brains never touch the physics side; applying the action is the
//! coordinator's job.

use tracing::{debug, trace};

use crate::config::AiConfig;
use crate::game::constants::ai::SEEK_POINT_FRACTIONS;
use crate::game::entity::{Footprint, HovercraftId};
use crate::game::pathfinding::{find_path, Algorithm, SearchScratch};
use crate::game::spatial::{CellCoord, CellRange, SpatialMap};
use crate::util::vec2::Vec2;

/// Bot behavior mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Path straight at the target and fire when lined up
    Chase,
    /// Roam between seek points
    #[default]
    Seek,
    /// Reserved; no transition leads here
    Evade,
}

/// Intents produced for one bot for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Action {
    /// Steering in [-1, 1], positive is counter-clockwise
    pub turn: f32,
    /// Per-axis movement input, each component -1, 0 or 1
    pub movement: Vec2,
    /// Direct ground-plane position correction for this tick
    pub nudge: Vec2,
    pub fire_rocket: bool,
    pub activate_trail: bool,
    pub activate_spikes: bool,
}

impl Action {
    #[inline]
    pub fn has_movement(&self) -> bool {
        !self.movement.is_zero(f32::EPSILON)
    }
}

/// What a brain may know about the bot it controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotView {
    pub id: HovercraftId,
    pub position: Vec2,
    /// Facing on the ground plane
    pub facing: Vec2,
    pub footprint: Footprint,
}

/// What a brain may know about its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub id: HovercraftId,
    pub position: Vec2,
    pub footprint: Footprint,
}

/// Fixed landmarks bots roam between while seeking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeekPoints {
    points: Vec<Vec2>,
}

impl SeekPoints {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Quadrant centres and the arena centre, each moved onto the closest
    /// passable cell. Landmarks with no passable cell anywhere are dropped.
    pub fn from_grid(grid: &SpatialMap) -> Self {
        let (max_x, max_y) = grid.dimensions();
        let extent = Vec2::new(max_x as f32, max_y as f32) * grid.tile_size();
        let search_radius = max_x.max(max_y);

        let mut points: Vec<Vec2> = Vec::with_capacity(SEEK_POINT_FRACTIONS.len());
        for (fx, fy) in SEEK_POINT_FRACTIONS {
            let world = grid.origin() + Vec2::new(extent.x * fx, extent.y * fy);
            let cell = grid.clamp_cell(grid.world_to_cell(world));
            let Some(snapped) = grid.nearest_passable(cell, search_radius) else {
                continue;
            };
            let point = grid.cell_to_world(snapped);
            if !points.iter().any(|p| p.approx_eq(point, 1e-3)) {
                points.push(point);
            }
        }
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Vec2> {
        self.points.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.points.iter().copied()
    }

    /// Closest landmark to `position` other than `exclude`. When `exclude` is
    /// the only landmark it is returned anyway.
    pub fn nearest_excluding(&self, position: Vec2, exclude: Option<usize>) -> Option<usize> {
        let nearest = self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .min_by(|(_, a), (_, b)| {
                position
                    .distance_sq_to(**a)
                    .total_cmp(&position.distance_sq_to(**b))
            })
            .map(|(i, _)| i);
        nearest.or_else(|| exclude.filter(|i| *i < self.points.len()))
    }
}

/// Decision state of a single bot
#[derive(Debug, Default)]
pub struct BotBrain {
    mode: Mode,
    path: Vec<CellCoord>,
    /// Seek point currently travelled to
    seek_index: Option<usize>,
    /// Seek point reached last, never picked twice in a row
    last_seek_index: Option<usize>,
    path_stale: bool,
    steering_target: Option<Vec2>,
    time_chased: f32,
    target_id: Option<HovercraftId>,
    scratch: SearchScratch,
}

impl BotBrain {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn steering_target(&self) -> Option<Vec2> {
        self.steering_target
    }

    #[inline]
    pub fn path(&self) -> &[CellCoord] {
        &self.path
    }

    #[inline]
    pub fn time_chased(&self) -> f32 {
        self.time_chased
    }

    #[inline]
    pub fn target_id(&self) -> Option<HovercraftId> {
        self.target_id
    }

    /// Seek point the bot is heading for, if any
    pub fn seek_location(&self, seek_points: &SeekPoints) -> Option<Vec2> {
        self.seek_index.and_then(|i| seek_points.get(i))
    }

    /// Back to the state of a freshly spawned bot. The search scratch is kept.
    pub fn reset(&mut self) {
        self.mode = Mode::Seek;
        self.path.clear();
        self.seek_index = None;
        self.last_seek_index = None;
        self.path_stale = false;
        self.steering_target = None;
        self.time_chased = 0.0;
        self.target_id = None;
    }

    /// Produce this tick's action
    pub fn decide(
        &mut self,
        grid: &SpatialMap,
        seek_points: &SeekPoints,
        bot: &BotView,
        target: &TargetView,
        config: &AiConfig,
        dt: f32,
    ) -> Action {
        let mut action = Action::default();

        if self.target_id != Some(target.id) {
            self.target_id = Some(target.id);
            self.time_chased = 0.0;
        }

        let own_range = grid.range_or_cell(&bot.footprint);

        match self.mode {
            Mode::Chase => {
                let target_range = grid.range_or_cell(&target.footprint);
                self.path = find_path(
                    Algorithm::FloodFill,
                    grid,
                    &mut self.scratch,
                    own_range,
                    target_range,
                );
            }
            Mode::Seek => self.plan_seek(grid, seek_points, bot, own_range, config),
            Mode::Evade => {}
        }

        self.update_steering_target(grid, bot.position, config.lookahead_distance);

        let distance = bot.position.distance_to(target.position);
        self.update_mode(bot.id, distance, config, dt);

        // Aim
        let to_target = target.position - bot.position;
        if !to_target.is_zero(f32::EPSILON) && !bot.facing.is_zero(f32::EPSILON) {
            let angle = bot.facing.normalize().angle_to(to_target.normalize());
            if angle.abs() < config.aim_accuracy {
                action.fire_rocket = self.mode == Mode::Chase;
            } else {
                action.turn = angle.signum();
            }
        }

        // Proportional push toward the steering target
        if let Some(steer) = self.steering_target {
            action.movement = (steer - bot.position).signum_outside(config.move_dead_zone);
            action.nudge = action.movement * (config.nudge_speed * dt);
        }

        action.activate_trail = self.mode == Mode::Seek && action.has_movement();
        action.activate_spikes = self.enemy_in_spike_range(grid, bot.id, own_range, config);

        action
    }

    fn plan_seek(
        &mut self,
        grid: &SpatialMap,
        seek_points: &SeekPoints,
        bot: &BotView,
        own_range: CellRange,
        config: &AiConfig,
    ) {
        let arrived = self
            .seek_location(seek_points)
            .map_or(true, |p| bot.position.distance_to(p) <= config.seek_arrival_distance);

        if arrived {
            if self.seek_index.is_some() {
                self.last_seek_index = self.seek_index;
            }
            self.seek_index = seek_points.nearest_excluding(bot.position, self.last_seek_index);
            self.path_stale = true;
        }

        let Some(seek) = self.seek_location(seek_points) else {
            self.path.clear();
            return;
        };

        if !self.path_stale {
            if let Some(reached) = self.path.iter().rposition(|c| own_range.contains(*c)) {
                self.path.drain(..=reached);
            }
            let drifted = self
                .path
                .first()
                .map_or(true, |first| !own_range.expanded(1).contains(*first));
            self.path_stale = drifted;
        }

        if self.path_stale {
            let goal = CellRange::single(grid.clamp_cell(grid.world_to_cell(seek)));
            self.path = find_path(Algorithm::AStar, grid, &mut self.scratch, own_range, goal);
            self.path_stale = false;
        }
    }

    /// First path cell further than `lookahead` (Manhattan) from the bot, or
    /// the last cell. An empty path leaves the previous target in place.
    fn update_steering_target(&mut self, grid: &SpatialMap, position: Vec2, lookahead: f32) {
        if self.path.is_empty() {
            trace!(mode = ?self.mode, "Empty path, holding course");
            return;
        }

        let beyond = self
            .path
            .iter()
            .map(|c| grid.cell_to_world(*c))
            .find(|p| position.manhattan_to(*p) > lookahead);

        self.steering_target = beyond.or_else(|| self.path.last().map(|c| grid.cell_to_world(*c)));
    }

    fn update_mode(&mut self, bot_id: HovercraftId, distance: f32, config: &AiConfig, dt: f32) {
        self.time_chased += dt;
        if self.time_chased > config.max_chase_cycle {
            self.time_chased = 0.0;
        }

        let near = distance <= config.proximity_threshold;
        let cooling_down = self.time_chased < config.chase_cooldown;

        let next = match self.mode {
            Mode::Chase if !near || cooling_down => Mode::Seek,
            Mode::Seek if near && !cooling_down => Mode::Chase,
            current => current,
        };

        if next != self.mode {
            debug!(bot = bot_id, from = ?self.mode, to = ?next, distance, "Mode transition");
            if next == Mode::Seek {
                self.path_stale = true;
            }
            self.mode = next;
        }
    }

    fn enemy_in_spike_range(
        &self,
        grid: &SpatialMap,
        bot_id: HovercraftId,
        own_range: CellRange,
        config: &AiConfig,
    ) -> bool {
        if config.spike_cell_radius < 0 {
            return false;
        }
        let span = (own_range.max.x - own_range.min.x).max(own_range.max.y - own_range.min.y);
        let radius = (span + 1) / 2 + config.spike_cell_radius;
        grid.nearest_dynamic(own_range.center(), radius, bot_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::game::constants::sim::{DT, HOVERCRAFT_HALF_EXTENT};
    use crate::game::entity::{ArenaEntity, EntityCategory};

    fn arena() -> SpatialMap {
        SpatialMap::new(&ArenaConfig::default()).unwrap()
    }

    fn bot_at(id: HovercraftId, position: Vec2, facing: Vec2) -> BotView {
        BotView {
            id,
            position,
            facing,
            footprint: Footprint::square(position, HOVERCRAFT_HALF_EXTENT),
        }
    }

    fn target_at(id: HovercraftId, position: Vec2) -> TargetView {
        TargetView {
            id,
            position,
            footprint: Footprint::square(position, HOVERCRAFT_HALF_EXTENT),
        }
    }

    fn chasing(target: HovercraftId, time_chased: f32) -> BotBrain {
        BotBrain {
            mode: Mode::Chase,
            target_id: Some(target),
            time_chased,
            ..BotBrain::default()
        }
    }

    #[test]
    fn test_far_target_keeps_seeking() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = BotBrain::new();

        let bot = bot_at(1, Vec2::new(0.0, -30.0), Vec2::new(0.0, 1.0));
        // Straight ahead, so only the range keeps it from firing
        let target = target_at(2, Vec2::new(0.0, 170.0));

        for _ in 0..2000 {
            let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
            assert_eq!(brain.mode(), Mode::Seek);
            assert!(!action.fire_rocket);
        }
    }

    #[test]
    fn test_aligned_chase_fires_every_tick() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = chasing(2, config.chase_cooldown + 0.5);

        let mut bot = bot_at(1, Vec2::ZERO, Vec2::new(1.0, 0.0));
        let target = target_at(2, Vec2::new(50.0, 0.0));

        for _ in 0..60 {
            let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
            assert_eq!(brain.mode(), Mode::Chase);
            assert!(action.fire_rocket);
            assert_eq!(action.turn, 0.0);
        }

        bot.facing = Vec2::new(0.0, 1.0);
        for _ in 0..10 {
            let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
            assert!(!action.fire_rocket);
            // Target is clockwise of facing
            assert_eq!(action.turn, -1.0);
        }
    }

    #[test]
    fn test_aligned_but_seeking_holds_fire() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = BotBrain::new();

        let bot = bot_at(1, Vec2::ZERO, Vec2::new(1.0, 0.0));
        let target = target_at(2, Vec2::new(50.0, 0.0));

        // Inside the cooldown window right after acquiring the target
        let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
        assert_eq!(brain.mode(), Mode::Seek);
        assert!(!action.fire_rocket);
        assert_eq!(action.turn, 0.0);
    }

    #[test]
    fn test_seek_to_chase_after_cooldown() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = BotBrain::new();

        let bot = bot_at(1, Vec2::ZERO, Vec2::new(1.0, 0.0));
        let target = target_at(2, Vec2::new(40.0, 0.0));

        let ticks = (config.chase_cooldown / 0.1).ceil() as usize + 1;
        for _ in 0..ticks {
            brain.decide(&grid, &seek, &bot, &target, &config, 0.1);
        }
        assert_eq!(brain.mode(), Mode::Chase);
    }

    #[test]
    fn test_target_switch_restarts_cooldown() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = chasing(2, config.chase_cooldown + 1.0);

        let bot = bot_at(1, Vec2::ZERO, Vec2::new(1.0, 0.0));
        let other = target_at(3, Vec2::new(40.0, 0.0));

        brain.decide(&grid, &seek, &bot, &other, &config, DT);
        assert_eq!(brain.target_id(), Some(3));
        assert!(brain.time_chased() < config.chase_cooldown);
        assert_eq!(brain.mode(), Mode::Seek);
    }

    #[test]
    fn test_chase_timer_wraps() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = chasing(2, config.max_chase_cycle - 0.01);

        let bot = bot_at(1, Vec2::ZERO, Vec2::new(1.0, 0.0));
        let target = target_at(2, Vec2::new(40.0, 0.0));

        brain.decide(&grid, &seek, &bot, &target, &config, 0.1);
        assert_eq!(brain.time_chased(), 0.0);
        // Wrapped back into the cooldown window
        assert_eq!(brain.mode(), Mode::Seek);
    }

    #[test]
    fn test_chase_steers_along_path() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = chasing(2, config.chase_cooldown + 0.5);

        let bot = bot_at(1, Vec2::new(-45.0, 5.0), Vec2::new(1.0, 0.0));
        let target = target_at(2, Vec2::new(45.0, 5.0));

        let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
        assert!(!brain.path().is_empty());
        let steer = brain.steering_target().unwrap();
        assert!(steer.x > bot.position.x);
        assert!(bot.position.manhattan_to(steer) > config.lookahead_distance);
        assert_eq!(action.movement.x, 1.0);
        assert!((action.nudge.x - config.nudge_speed * DT).abs() < 1e-6);
        assert!(!action.activate_trail);
    }

    #[test]
    fn test_empty_path_keeps_steering_target() {
        // Target sealed inside a box of walls in the corner
        let mut config = ArenaConfig::new(10.0, 10.0, 1.0);
        config.center = Vec2::new(5.0, 5.0);
        let mut grid = SpatialMap::new(&config).unwrap();
        let walls = [
            ArenaEntity::new(
                100,
                EntityCategory::Static,
                Footprint::from_corners(Vec2::new(6.1, 6.1), Vec2::new(6.9, 9.9)),
            ),
            ArenaEntity::new(
                101,
                EntityCategory::Static,
                Footprint::from_corners(Vec2::new(6.1, 6.1), Vec2::new(9.9, 6.9)),
            ),
        ];
        grid.populate_static(walls.iter());

        let seek = SeekPoints::from_grid(&grid);
        let ai = AiConfig::default();
        let mut brain = chasing(2, ai.chase_cooldown + 0.5);
        let held = Vec2::new(3.5, 3.5);
        brain.steering_target = Some(held);

        let bot = bot_at(1, Vec2::new(1.5, 1.5), Vec2::new(1.0, 0.0));
        let target = TargetView {
            id: 2,
            position: Vec2::new(8.5, 8.5),
            footprint: Footprint::square(Vec2::new(8.5, 8.5), 0.2),
        };

        let action = brain.decide(&grid, &seek, &bot, &target, &ai, DT);
        assert!(brain.path().is_empty());
        assert_eq!(brain.steering_target(), Some(held));
        assert_eq!(action.movement, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_seek_picks_nearest_landmark_then_moves_on() {
        let grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        assert_eq!(seek.len(), 5);
        let config = AiConfig::default();
        let mut brain = BotBrain::new();

        let far = target_at(2, Vec2::new(170.0, 170.0));
        let bot = bot_at(1, Vec2::new(-40.0, -60.0), Vec2::new(1.0, 0.0));
        let action = brain.decide(&grid, &seek, &bot, &far, &config, DT);

        let first = brain.seek_location(&seek).unwrap();
        assert!(first.distance_to(Vec2::new(-85.0, -85.0)) < 15.0);
        assert!(!brain.path().is_empty());
        assert!(action.activate_trail);

        // Standing on the landmark forces a different one
        let bot = bot_at(1, first, Vec2::new(1.0, 0.0));
        brain.decide(&grid, &seek, &bot, &far, &config, DT);
        let second = brain.seek_location(&seek).unwrap();
        assert!(!second.approx_eq(first, 1e-3));
    }

    #[test]
    fn test_spikes_when_enemy_adjacent() {
        let mut grid = arena();
        let seek = SeekPoints::from_grid(&grid);
        let config = AiConfig::default();
        let mut brain = BotBrain::new();

        let bot = bot_at(1, Vec2::new(5.0, 5.0), Vec2::new(1.0, 0.0));
        let target = target_at(2, Vec2::new(150.0, 150.0));
        grid.add_dynamic(1, &bot.footprint);

        let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
        assert!(!action.activate_spikes);

        grid.add_dynamic(3, &Footprint::square(Vec2::new(16.0, 5.0), HOVERCRAFT_HALF_EXTENT));
        let action = brain.decide(&grid, &seek, &bot, &target, &config, DT);
        assert!(action.activate_spikes);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut brain = chasing(2, 7.0);
        brain.steering_target = Some(Vec2::ONE);
        brain.path.push(CellCoord::new(1, 1));

        brain.reset();
        assert_eq!(brain.mode(), Mode::Seek);
        assert!(brain.path().is_empty());
        assert!(brain.steering_target().is_none());
        assert!(brain.target_id().is_none());
        assert_eq!(brain.time_chased(), 0.0);
    }

    #[test]
    fn test_nearest_excluding_falls_back_to_only_point() {
        let seek = SeekPoints::new(vec![Vec2::new(1.0, 1.0)]);
        assert_eq!(seek.nearest_excluding(Vec2::ZERO, Some(0)), Some(0));
        assert_eq!(SeekPoints::default().nearest_excluding(Vec2::ZERO, None), None);
    }
}
