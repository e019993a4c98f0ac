//! Grid pathfinding
//!
//! Two interchangeable searches over the 8-connected `SpatialMap`:
//! - flood fill (breadth-first, uniform cost): cheap, used while chasing
//! - A* with a Euclidean heuristic: used for routing to seek points
//!
//! Both take the start and goal as occupied cell ranges, substitute a nearby
//! passable cell when the requested cell is blocked, never step onto a cell
//! holding a static obstacle, and return the cells from start to goal with the
//! start cell itself excluded. An unreachable goal yields an empty path.
//!
//! Per-search state lives in a caller-owned `SearchScratch` that is reset by
//! bumping a generation counter, so each bot can keep its own scratch and
//! searches never see each other's state.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use tracing::trace;

use crate::game::spatial::{ring_cells, CellCoord, CellRange, SpatialMap};

/// Neighbour expansion order: orthogonal steps first, then diagonals
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (-1, 0),
    (1, 0),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// Every step costs the same, diagonal or not. A* may therefore stop as soon
/// as the goal is generated instead of waiting for it to be popped; switching
/// to per-direction costs requires pop-based termination.
const STEP_COST: f32 = 1.0;

/// Which search to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    FloodFill,
    AStar,
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f_cost: f32,
    h_cost: f32,
    index: usize,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // BinaryHeap is a max-heap: lowest f (then lowest h) must compare greatest
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.h_cost.total_cmp(&self.h_cost))
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Reusable per-search bookkeeping
#[derive(Debug, Default)]
pub struct SearchScratch {
    generation: u32,
    /// Generation in which a cell was visited (flood fill) or closed (A*)
    closed: Vec<u32>,
    /// Generation in which a cell was put on the A* open set
    opened: Vec<u32>,
    parent: Vec<u32>,
    g_cost: Vec<f32>,
    queue: VecDeque<usize>,
    open: BinaryHeap<OpenNode>,
}

impl SearchScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new search over a grid with `cells` cells
    fn begin(&mut self, cells: usize) {
        if self.closed.len() != cells {
            self.closed = vec![0; cells];
            self.opened = vec![0; cells];
            self.parent = vec![0; cells];
            self.g_cost = vec![0.0; cells];
            self.generation = 0;
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.closed.fill(0);
            self.opened.fill(0);
            self.generation = 1;
        }

        self.queue.clear();
        self.open.clear();
    }

    #[inline]
    fn is_closed(&self, index: usize) -> bool {
        self.closed[index] == self.generation
    }

    #[inline]
    fn close(&mut self, index: usize) {
        self.closed[index] = self.generation;
    }

    #[inline]
    fn is_open(&self, index: usize) -> bool {
        self.opened[index] == self.generation
    }

    #[inline]
    fn set_parent(&mut self, index: usize, parent: usize) {
        self.parent[index] = parent as u32;
    }
}

/// Run the requested search
pub fn find_path(
    algorithm: Algorithm,
    grid: &SpatialMap,
    scratch: &mut SearchScratch,
    start: CellRange,
    goal: CellRange,
) -> Vec<CellCoord> {
    match algorithm {
        Algorithm::FloodFill => find_path_bfs(grid, scratch, start, goal),
        Algorithm::AStar => find_path_astar(grid, scratch, start, goal),
    }
}

/// Breadth-first flood fill from `start` to `goal`.
///
/// Blocked endpoints are replaced by the passable cell of the range closest to
/// its centre, or failing that by the closest passable cell bordering the range.
pub fn find_path_bfs(
    grid: &SpatialMap,
    scratch: &mut SearchScratch,
    start: CellRange,
    goal: CellRange,
) -> Vec<CellCoord> {
    let (Some(start_cell), Some(goal_cell)) = (
        resolve_in_range(grid, &start),
        resolve_in_range(grid, &goal),
    ) else {
        trace!(?start, ?goal, "Flood fill endpoint has no passable substitute");
        return Vec::new();
    };
    if start_cell == goal_cell {
        return Vec::new();
    }
    let (Some(start_idx), Some(goal_idx)) = (grid.index(start_cell), grid.index(goal_cell)) else {
        return Vec::new();
    };

    scratch.begin(grid.cell_count());
    scratch.close(start_idx);
    scratch.set_parent(start_idx, start_idx);
    scratch.queue.push_back(start_idx);

    while let Some(current) = scratch.queue.pop_front() {
        let cell = grid.coord_of(current);
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let next = cell.offset(dx, dy);
            let Some(next_idx) = grid.index(next) else {
                continue;
            };
            if scratch.is_closed(next_idx) || !grid.is_passable(next) {
                continue;
            }
            scratch.close(next_idx);
            scratch.set_parent(next_idx, current);
            if next_idx == goal_idx {
                return backtrace(grid, scratch, start_idx, goal_idx);
            }
            scratch.queue.push_back(next_idx);
        }
    }

    trace!(?start_cell, ?goal_cell, "Flood fill exhausted without reaching goal");
    Vec::new()
}

/// A* from `start` to `goal` with a Euclidean heuristic and uniform step cost.
///
/// Blocked endpoints are replaced by the closest passable cell in the 3x3
/// neighbourhood of the range centre.
pub fn find_path_astar(
    grid: &SpatialMap,
    scratch: &mut SearchScratch,
    start: CellRange,
    goal: CellRange,
) -> Vec<CellCoord> {
    let (Some(start_cell), Some(goal_cell)) = (
        resolve_local(grid, start.center()),
        resolve_local(grid, goal.center()),
    ) else {
        trace!(?start, ?goal, "A* endpoint has no passable substitute");
        return Vec::new();
    };
    if start_cell == goal_cell {
        return Vec::new();
    }
    let (Some(start_idx), Some(goal_idx)) = (grid.index(start_cell), grid.index(goal_cell)) else {
        return Vec::new();
    };

    scratch.begin(grid.cell_count());
    scratch.g_cost[start_idx] = 0.0;
    scratch.set_parent(start_idx, start_idx);
    scratch.opened[start_idx] = scratch.generation;
    let h_start = start_cell.euclidean_distance(goal_cell);
    scratch.open.push(OpenNode {
        f_cost: h_start,
        h_cost: h_start,
        index: start_idx,
    });

    while let Some(node) = scratch.open.pop() {
        // Superseded heap entries for already-closed cells
        if scratch.is_closed(node.index) {
            continue;
        }
        scratch.close(node.index);

        let cell = grid.coord_of(node.index);
        let g_current = scratch.g_cost[node.index];

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let next = cell.offset(dx, dy);
            let Some(next_idx) = grid.index(next) else {
                continue;
            };
            if scratch.is_closed(next_idx) || !grid.is_passable(next) {
                continue;
            }
            if next_idx == goal_idx {
                scratch.set_parent(goal_idx, node.index);
                return backtrace(grid, scratch, start_idx, goal_idx);
            }

            let tentative = g_current + STEP_COST;
            if !scratch.is_open(next_idx) || tentative < scratch.g_cost[next_idx] {
                let h_cost = next.euclidean_distance(goal_cell);
                scratch.g_cost[next_idx] = tentative;
                scratch.set_parent(next_idx, node.index);
                scratch.opened[next_idx] = scratch.generation;
                scratch.open.push(OpenNode {
                    f_cost: tentative + h_cost,
                    h_cost,
                    index: next_idx,
                });
            }
        }
    }

    trace!(?start_cell, ?goal_cell, "A* open set exhausted without reaching goal");
    Vec::new()
}

/// Walk parent links from goal back to start; returns start-exclusive, goal-inclusive
fn backtrace(
    grid: &SpatialMap,
    scratch: &SearchScratch,
    start_idx: usize,
    goal_idx: usize,
) -> Vec<CellCoord> {
    let mut path = Vec::new();
    let mut current = goal_idx;
    // A parent chain can never be longer than the grid
    for _ in 0..grid.cell_count() {
        if current == start_idx {
            path.reverse();
            return path;
        }
        path.push(grid.coord_of(current));
        current = scratch.parent[current] as usize;
    }
    Vec::new()
}

/// Passable stand-in for a range: its centre, else the passable cell inside the
/// range closest to the centre, else the closest passable cell bordering it
fn resolve_in_range(grid: &SpatialMap, range: &CellRange) -> Option<CellCoord> {
    let literal = range.center();
    if grid.is_passable(literal) {
        return Some(literal);
    }

    closest_passable(grid, literal, range.iter()).or_else(|| {
        let border = range.expanded(1);
        closest_passable(
            grid,
            literal,
            border.iter().filter(|cell| !range.contains(*cell)),
        )
    })
}

/// Passable stand-in for a single cell: itself, else the closest passable neighbour
fn resolve_local(grid: &SpatialMap, cell: CellCoord) -> Option<CellCoord> {
    if grid.is_passable(cell) {
        return Some(cell);
    }
    closest_passable(grid, cell, ring_cells(cell, 1))
}

fn closest_passable(
    grid: &SpatialMap,
    to: CellCoord,
    cells: impl Iterator<Item = CellCoord>,
) -> Option<CellCoord> {
    cells
        .filter(|cell| grid.is_passable(*cell))
        .min_by(|a, b| to.euclidean_distance(*a).total_cmp(&to.euclidean_distance(*b)))
}
