//! Occupancy grid over the arena
//!
//! Divides the arena floor into fixed-size square cells. Each cell records the
//! entities overlapping it, grouped by category, and whether a static obstacle
//! makes it impassable. Static geometry is registered once at arena load;
//! hovercraft are tracked incrementally through an entity -> cell range index
//! so a moving entity only touches the grid when it crosses a cell boundary.
//!
//! The map is owned by one `GameWorld` and only read or written from the tick
//! thread.

use bitvec::prelude::*;
use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::config::ArenaConfig;
use crate::game::constants::grid::DYNAMIC_INDEX_CAPACITY;
use crate::game::entity::{ArenaEntity, EntityCategory, EntityId, Footprint};
use crate::util::vec2::Vec2;

/// Fatal grid misconfiguration, detected at arena load
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("Tile size must be positive and finite, got {0}")]
    InvalidTileSize(f32),
    #[error("Arena {width}x{length} with tile size {tile_size} yields no cells")]
    InvalidDimensions {
        length: f32,
        width: f32,
        tile_size: f32,
    },
    #[error("Grid would need {0} cells")]
    TooManyCells(usize),
}

/// Integer cell coordinate. May lie outside the grid; check with `SpatialMap::in_bounds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// King-move distance; two cells are 8-connected neighbours when this is 1
    #[inline]
    pub fn chebyshev_distance(&self, other: CellCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    #[inline]
    pub fn euclidean_distance(&self, other: CellCoord) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Inclusive rectangle of cells an entity occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellRange {
    pub fn new(min: CellCoord, max: CellCoord) -> Self {
        Self {
            min: CellCoord::new(min.x.min(max.x), min.y.min(max.y)),
            max: CellCoord::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    /// Degenerate range covering one cell
    pub fn single(cell: CellCoord) -> Self {
        Self {
            min: cell,
            max: cell,
        }
    }

    /// The cell a search treats as "the" position of this range
    pub fn center(&self) -> CellCoord {
        CellCoord::new(
            self.min.x + (self.max.x - self.min.x) / 2,
            self.min.y + (self.max.y - self.min.y) / 2,
        )
    }

    #[inline]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Range grown by `by` cells on every side (not clamped)
    pub fn expanded(&self, by: i32) -> Self {
        Self {
            min: self.min.offset(-by, -by),
            max: self.max.offset(by, by),
        }
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| CellCoord::new(x, y)))
    }
}

/// Cells at exactly Chebyshev distance `radius` from `center`, unclamped
pub fn ring_cells(center: CellCoord, radius: i32) -> impl Iterator<Item = CellCoord> {
    let ring = CellRange::single(center).expanded(radius);
    ring.iter()
        .filter(move |cell| radius == 0 || cell.chebyshev_distance(center) == radius)
}

type EntityList = SmallVec<[EntityId; 2]>;

/// One square of the arena floor
#[derive(Debug, Clone, Default)]
pub struct Cell {
    coord: CellCoord,
    /// World-space min corner
    origin: Vec2,
    statics: EntityList,
    point_lights: EntityList,
    spot_lights: EntityList,
    hazards: EntityList,
    hovercraft: EntityList,
    /// Number of static-blocking occupants
    occupancy: u32,
}

impl Cell {
    fn new(coord: CellCoord, origin: Vec2) -> Self {
        Self {
            coord,
            origin,
            ..Default::default()
        }
    }

    pub fn coord(&self) -> CellCoord {
        self.coord
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    pub fn entities(&self, category: EntityCategory) -> &[EntityId] {
        match category {
            EntityCategory::Static => &self.statics,
            EntityCategory::PointLight => &self.point_lights,
            EntityCategory::SpotLight => &self.spot_lights,
            EntityCategory::Hazard => &self.hazards,
            EntityCategory::Hovercraft => &self.hovercraft,
        }
    }

    fn list_mut(&mut self, category: EntityCategory) -> &mut EntityList {
        match category {
            EntityCategory::Static => &mut self.statics,
            EntityCategory::PointLight => &mut self.point_lights,
            EntityCategory::SpotLight => &mut self.spot_lights,
            EntityCategory::Hazard => &mut self.hazards,
            EntityCategory::Hovercraft => &mut self.hovercraft,
        }
    }

    /// Returns false if the entity was already registered here
    fn insert(&mut self, id: EntityId, category: EntityCategory) -> bool {
        let list = self.list_mut(category);
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        if category.blocks_movement() {
            self.occupancy += 1;
        }
        true
    }

    fn remove_hovercraft(&mut self, id: EntityId) {
        if let Some(idx) = self.hovercraft.iter().position(|&other| other == id) {
            self.hovercraft.swap_remove(idx);
        }
    }
}

/// Where a tracked dynamic entity currently sits and how big it is
#[derive(Debug, Clone, Copy)]
struct DynamicEntry {
    range: CellRange,
    negative: Vec2,
    positive: Vec2,
}

/// Occupancy grid + entity range index
pub struct SpatialMap {
    tile_size: f32,
    /// Inverse tile size for fast position-to-cell conversion
    inv_tile_size: f32,
    max_x: i32,
    max_y: i32,
    /// World position of cell (0, 0)'s min corner
    origin: Vec2,
    cells: Vec<Cell>,
    /// Mirror of "static list non-empty" per cell, row-major
    blocked: BitVec,
    dynamic_ranges: HashMap<EntityId, DynamicEntry, FxBuildHasher>,
}

impl SpatialMap {
    /// Allocate an empty grid for an arena. Fails fast on a misconfigured arena.
    pub fn new(config: &ArenaConfig) -> Result<Self, GridError> {
        config.validate()?;

        let (max_x, max_y) = config.cell_dimensions();
        let origin = config.center - Vec2::new(config.width * 0.5, config.length * 0.5);
        let tile_size = config.tile_size;

        let mut cells = Vec::with_capacity(max_x * max_y);
        for y in 0..max_y as i32 {
            for x in 0..max_x as i32 {
                let cell_origin = origin + Vec2::new(x as f32 * tile_size, y as f32 * tile_size);
                cells.push(Cell::new(CellCoord::new(x, y), cell_origin));
            }
        }

        info!(
            max_x,
            max_y,
            tile_size,
            origin_x = origin.x,
            origin_y = origin.y,
            "Spatial map initialized"
        );

        Ok(Self {
            tile_size,
            inv_tile_size: 1.0 / tile_size,
            max_x: max_x as i32,
            max_y: max_y as i32,
            origin,
            cells,
            blocked: bitvec![0; max_x * max_y],
            dynamic_ranges: HashMap::with_capacity_and_hasher(
                DYNAMIC_INDEX_CAPACITY,
                FxBuildHasher,
            ),
        })
    }

    /// Tear down and rebuild for a new game or arena
    pub fn reinitialize(&mut self, config: &ArenaConfig) -> Result<(), GridError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Grid size in cells (columns, rows)
    #[inline]
    pub fn dimensions(&self) -> (i32, i32) {
        (self.max_x, self.max_y)
    }

    #[inline]
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.max_x && cell.y < self.max_y
    }

    #[inline]
    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.y as usize * self.max_x as usize + cell.x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn coord_of(&self, index: usize) -> CellCoord {
        let width = self.max_x as usize;
        CellCoord::new((index % width) as i32, (index / width) as i32)
    }

    pub fn cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).map(|idx| &self.cells[idx])
    }

    /// In bounds and free of static obstacles. Out-of-bounds is never passable.
    #[inline]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        match self.index(cell) {
            Some(idx) => !self.blocked[idx],
            None => false,
        }
    }

    /// Convert a ground position to the cell containing it (unclamped)
    #[inline]
    pub fn world_to_cell(&self, position: Vec2) -> CellCoord {
        CellCoord::new(
            ((position.x - self.origin.x) * self.inv_tile_size).floor() as i32,
            ((position.y - self.origin.y) * self.inv_tile_size).floor() as i32,
        )
    }

    /// Centre of a cell in world space
    #[inline]
    pub fn cell_to_world(&self, cell: CellCoord) -> Vec2 {
        self.origin
            + Vec2::new(
                (cell.x as f32 + 0.5) * self.tile_size,
                (cell.y as f32 + 0.5) * self.tile_size,
            )
    }

    #[inline]
    pub fn clamp_cell(&self, cell: CellCoord) -> CellCoord {
        CellCoord::new(
            cell.x.clamp(0, self.max_x - 1),
            cell.y.clamp(0, self.max_y - 1),
        )
    }

    /// Cell range covering a footprint, clamped to the grid.
    /// `None` when the footprint is the zero-sized sentinel.
    pub fn cell_range(&self, footprint: &Footprint) -> Option<CellRange> {
        if footprint.is_empty() {
            return None;
        }
        let (min, max) = footprint.ground_bounds();
        Some(self.range_between(min, max))
    }

    /// Cell range of a footprint, or the single cell under its position when it has none
    pub fn range_or_cell(&self, footprint: &Footprint) -> CellRange {
        self.cell_range(footprint).unwrap_or_else(|| {
            CellRange::single(self.clamp_cell(self.world_to_cell(footprint.position.ground())))
        })
    }

    fn range_between(&self, min: Vec2, max: Vec2) -> CellRange {
        CellRange::new(
            self.clamp_cell(self.world_to_cell(min)),
            self.clamp_cell(self.world_to_cell(max)),
        )
    }

    /// Register static geometry, lights and hazards into every cell they overlap.
    /// Entities without a footprint are skipped. Returns how many were registered.
    pub fn populate_static<'a>(&mut self, entities: impl IntoIterator<Item = &'a ArenaEntity>) -> usize {
        let mut registered = 0;
        let mut skipped = 0;

        for entity in entities {
            if entity.category == EntityCategory::Hovercraft {
                if self.add_dynamic(entity.id, &entity.footprint) {
                    registered += 1;
                }
                continue;
            }

            let Some(range) = self.cell_range(&entity.footprint) else {
                debug!(id = entity.id, category = ?entity.category, "Skipping entity without footprint");
                skipped += 1;
                continue;
            };

            for cell in range.iter() {
                let Some(idx) = self.index(cell) else { continue };
                if self.cells[idx].insert(entity.id, entity.category)
                    && entity.category.blocks_movement()
                {
                    self.blocked.set(idx, true);
                }
            }
            registered += 1;
        }

        info!(
            registered,
            skipped,
            blocked_cells = self.blocked.count_ones(),
            "Static population complete"
        );
        registered
    }

    /// Start tracking a moving entity. Returns false when it has no footprint.
    pub fn add_dynamic(&mut self, id: EntityId, footprint: &Footprint) -> bool {
        let Some(range) = self.cell_range(footprint) else {
            debug!(id, "Dynamic entity has no footprint, not tracked");
            return false;
        };

        if let Some(previous) = self.dynamic_ranges.get(&id).map(|entry| entry.range) {
            self.unlink_dynamic(id, previous);
        }

        self.link_dynamic(id, range);
        self.dynamic_ranges.insert(
            id,
            DynamicEntry {
                range,
                negative: footprint.negative_offset.ground(),
                positive: footprint.positive_offset.ground(),
            },
        );
        true
    }

    /// Move a tracked entity. Membership is only recomputed when its extents
    /// land in different cells. Returns true if the occupied range changed.
    pub fn update_dynamic_position(&mut self, id: EntityId, position: Vec2) -> bool {
        let Some(entry) = self.dynamic_ranges.get(&id).copied() else {
            return false;
        };

        let range = self.range_between(position + entry.negative, position + entry.positive);
        if range == entry.range {
            return false;
        }

        self.unlink_dynamic(id, entry.range);
        self.link_dynamic(id, range);
        self.dynamic_ranges.insert(id, DynamicEntry { range, ..entry });
        true
    }

    /// Track or move an entity from a fresh footprint
    pub fn sync_dynamic(&mut self, id: EntityId, footprint: &Footprint) -> bool {
        if self.dynamic_ranges.contains_key(&id) {
            self.update_dynamic_position(id, footprint.position.ground())
        } else {
            self.add_dynamic(id, footprint)
        }
    }

    /// Forget a destroyed dynamic entity
    pub fn remove_dynamic(&mut self, id: EntityId) -> bool {
        match self.dynamic_ranges.remove(&id) {
            Some(entry) => {
                self.unlink_dynamic(id, entry.range);
                true
            }
            None => false,
        }
    }

    pub fn dynamic_range(&self, id: EntityId) -> Option<CellRange> {
        self.dynamic_ranges.get(&id).map(|entry| entry.range)
    }

    fn link_dynamic(&mut self, id: EntityId, range: CellRange) {
        for cell in range.iter() {
            if let Some(idx) = self.index(cell) {
                self.cells[idx].insert(id, EntityCategory::Hovercraft);
            }
        }
    }

    fn unlink_dynamic(&mut self, id: EntityId, range: CellRange) {
        for cell in range.iter() {
            if let Some(idx) = self.index(cell) {
                self.cells[idx].remove_hovercraft(id);
            }
        }
    }

    /// Entities of one category overlapping a cell (empty when out of bounds)
    pub fn entities_at(&self, cell: CellCoord, category: EntityCategory) -> &[EntityId] {
        match self.cell(cell) {
            Some(c) => c.entities(category),
            None => &[],
        }
    }

    pub fn hazard_at(&self, cell: CellCoord) -> bool {
        !self.entities_at(cell, EntityCategory::Hazard).is_empty()
    }

    /// Closest dynamic entity other than `exclude`, searching rings of cells
    /// outward from `from` up to `max_radius` cells away.
    pub fn nearest_dynamic(
        &self,
        from: CellCoord,
        max_radius: i32,
        exclude: EntityId,
    ) -> Option<(EntityId, CellCoord)> {
        for radius in 0..=max_radius.max(0) {
            let mut best: Option<(EntityId, CellCoord, f32)> = None;
            for cell in ring_cells(from, radius) {
                for &id in self.entities_at(cell, EntityCategory::Hovercraft) {
                    if id == exclude {
                        continue;
                    }
                    let dist = from.euclidean_distance(cell);
                    if best.map_or(true, |(_, _, d)| dist < d) {
                        best = Some((id, cell, dist));
                    }
                }
            }
            if let Some((id, cell, _)) = best {
                return Some((id, cell));
            }
        }
        None
    }

    /// Closest passable cell to `cell`, searching rings outward
    pub fn nearest_passable(&self, cell: CellCoord, max_radius: i32) -> Option<CellCoord> {
        (0..=max_radius.max(0)).find_map(|radius| {
            ring_cells(cell, radius)
                .filter(|c| self.is_passable(*c))
                .min_by(|a, b| {
                    cell.euclidean_distance(*a)
                        .total_cmp(&cell.euclidean_distance(*b))
                })
        })
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialMapStats {
        SpatialMapStats {
            cells: self.cells.len(),
            blocked_cells: self.blocked.count_ones(),
            tracked_dynamics: self.dynamic_ranges.len(),
            max_occupancy: self.cells.iter().map(Cell::occupancy).max().unwrap_or(0),
        }
    }

    /// One character per cell, top row last: `#` blocked, `H` hovercraft,
    /// `!` hazard, `*` light, `.` free
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.max_y as usize);
        for y in 0..self.max_y {
            for x in 0..self.max_x {
                let idx = (y * self.max_x + x) as usize;
                let cell = &self.cells[idx];
                let ch = if self.blocked[idx] {
                    '#'
                } else if !cell.hovercraft.is_empty() {
                    'H'
                } else if !cell.hazards.is_empty() {
                    '!'
                } else if !cell.point_lights.is_empty() || !cell.spot_lights.is_empty() {
                    '*'
                } else {
                    '.'
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

/// Statistics about the spatial map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialMapStats {
    pub cells: usize,
    pub blocked_cells: usize,
    pub tracked_dynamics: usize,
    pub max_occupancy: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_10x10() -> SpatialMap {
        // 10x10 cells of size 1, origin at (0, 0)
        let mut config = ArenaConfig::new(10.0, 10.0, 1.0);
        config.center = Vec2::new(5.0, 5.0);
        SpatialMap::new(&config).unwrap()
    }

    fn wall(id: EntityId, min: (f32, f32), max: (f32, f32)) -> ArenaEntity {
        ArenaEntity::new(
            id,
            EntityCategory::Static,
            Footprint::from_corners(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1)),
        )
    }

    #[test]
    fn test_initialize_dimensions_and_origin() {
        let map = SpatialMap::new(&ArenaConfig::new(360.0, 200.0, 10.0)).unwrap();
        assert_eq!(map.dimensions(), (20, 36));
        assert_eq!(map.cell_count(), 720);
        assert!(map.origin().approx_eq(Vec2::new(-100.0, -180.0), 1e-5));

        let corner = map.cell(CellCoord::new(1, 2)).unwrap();
        assert!(corner.origin().approx_eq(Vec2::new(-90.0, -160.0), 1e-5));
        assert_eq!(corner.coord(), CellCoord::new(1, 2));
    }

    #[test]
    fn test_misconfigured_grid_fails_fast() {
        assert!(SpatialMap::new(&ArenaConfig::new(100.0, 100.0, 0.0)).is_err());
        assert!(SpatialMap::new(&ArenaConfig::new(0.0, 100.0, 1.0)).is_err());
    }

    #[test]
    fn test_world_cell_round_trip() {
        let map = SpatialMap::new(&ArenaConfig::default()).unwrap();
        let tile = map.tile_size();
        let mut x = -179.5;
        while x < 180.0 {
            let mut y = -179.5;
            while y < 180.0 {
                let p = Vec2::new(x, y);
                let back = map.cell_to_world(map.world_to_cell(p));
                assert!(back.distance_to(p) <= tile, "{:?} -> {:?}", p, back);
                y += 7.3;
            }
            x += 7.3;
        }
    }

    #[test]
    fn test_out_of_bounds_never_passable() {
        let map = map_10x10();
        assert!(map.is_passable(CellCoord::new(0, 0)));
        assert!(map.is_passable(CellCoord::new(9, 9)));
        assert!(!map.is_passable(CellCoord::new(-1, 0)));
        assert!(!map.is_passable(CellCoord::new(10, 3)));
        assert!(!map.is_passable(CellCoord::new(3, 10)));
        assert!(map.cell(CellCoord::new(10, 10)).is_none());
    }

    #[test]
    fn test_cell_range_invalid_for_zero_footprint() {
        let map = map_10x10();
        let fp = Footprint::new(
            crate::util::vec2::Vec3::new(3.0, 0.0, 3.0),
            crate::util::vec2::Vec3::ZERO,
            crate::util::vec2::Vec3::ZERO,
        );
        assert!(map.cell_range(&fp).is_none());
        assert_eq!(
            map.range_or_cell(&fp),
            CellRange::single(CellCoord::new(3, 3))
        );
    }

    #[test]
    fn test_cell_range_clamped() {
        let map = map_10x10();
        let fp = Footprint::from_corners(Vec2::new(-5.0, 8.5), Vec2::new(2.5, 40.0));
        let range = map.cell_range(&fp).unwrap();
        assert_eq!(range.min, CellCoord::new(0, 8));
        assert_eq!(range.max, CellCoord::new(2, 9));
    }

    #[test]
    fn test_populate_blocks_every_covered_cell() {
        let mut map = map_10x10();
        let entities = vec![wall(1, (2.2, 3.1), (4.7, 3.9))];
        assert_eq!(map.populate_static(&entities), 1);

        for x in 2..=4 {
            assert!(!map.is_passable(CellCoord::new(x, 3)));
            assert_eq!(map.entities_at(CellCoord::new(x, 3), EntityCategory::Static), &[1]);
        }
        assert!(map.is_passable(CellCoord::new(5, 3)));
        assert!(map.is_passable(CellCoord::new(2, 4)));
        assert_eq!(map.stats().blocked_cells, 3);
    }

    #[test]
    fn test_lights_and_hazards_do_not_block() {
        let mut map = map_10x10();
        let fp = Footprint::square(Vec2::new(5.5, 5.5), 0.4);
        let entities = vec![
            ArenaEntity::new(1, EntityCategory::PointLight, fp),
            ArenaEntity::new(2, EntityCategory::SpotLight, fp),
            ArenaEntity::new(3, EntityCategory::Hazard, fp),
        ];
        map.populate_static(&entities);

        let cell = CellCoord::new(5, 5);
        assert!(map.is_passable(cell));
        assert!(map.hazard_at(cell));
        assert_eq!(map.entities_at(cell, EntityCategory::PointLight), &[1]);
        assert_eq!(map.entities_at(cell, EntityCategory::SpotLight), &[2]);
        assert_eq!(map.cell(cell).unwrap().occupancy(), 0);
    }

    #[test]
    fn test_populate_skips_entities_without_footprint() {
        let mut map = map_10x10();
        let sentinel = Footprint::new(
            crate::util::vec2::Vec3::new(1.0, 0.0, 1.0),
            crate::util::vec2::Vec3::ZERO,
            crate::util::vec2::Vec3::ZERO,
        );
        let entities = vec![
            ArenaEntity::new(1, EntityCategory::Static, sentinel),
            wall(2, (0.1, 0.1), (0.9, 0.9)),
        ];
        assert_eq!(map.populate_static(&entities), 1);
        assert!(map.is_passable(CellCoord::new(1, 1)));
        assert!(!map.is_passable(CellCoord::new(0, 0)));
    }

    #[test]
    fn test_populate_twice_does_not_double_count() {
        let mut map = map_10x10();
        let entities = vec![wall(7, (1.1, 1.1), (1.9, 1.9))];
        map.populate_static(&entities);
        map.populate_static(&entities);
        assert_eq!(map.cell(CellCoord::new(1, 1)).unwrap().occupancy(), 1);
    }

    #[test]
    fn test_update_same_position_is_idempotent() {
        let mut map = map_10x10();
        let fp = Footprint::square(Vec2::new(4.5, 4.5), 0.8);
        assert!(map.add_dynamic(42, &fp));
        let before = map.dynamic_range(42).unwrap();

        assert!(!map.update_dynamic_position(42, Vec2::new(4.5, 4.5)));
        assert!(!map.update_dynamic_position(42, Vec2::new(4.5, 4.5)));
        assert_eq!(map.dynamic_range(42).unwrap(), before);

        // Small moves that stay inside the same cells change nothing either
        assert!(!map.update_dynamic_position(42, Vec2::new(4.55, 4.45)));
        assert_eq!(map.dynamic_range(42).unwrap(), before);
    }

    #[test]
    fn test_update_crossing_boundary_moves_membership() {
        let mut map = map_10x10();
        map.add_dynamic(42, &Footprint::square(Vec2::new(1.5, 1.5), 0.2));
        assert_eq!(map.entities_at(CellCoord::new(1, 1), EntityCategory::Hovercraft), &[42]);

        assert!(map.update_dynamic_position(42, Vec2::new(6.5, 2.5)));
        assert!(map.entities_at(CellCoord::new(1, 1), EntityCategory::Hovercraft).is_empty());
        assert_eq!(map.entities_at(CellCoord::new(6, 2), EntityCategory::Hovercraft), &[42]);
        assert_eq!(map.dynamic_range(42), Some(CellRange::single(CellCoord::new(6, 2))));
    }

    #[test]
    fn test_dynamic_never_blocks() {
        let mut map = map_10x10();
        map.add_dynamic(5, &Footprint::square(Vec2::new(3.0, 3.0), 1.5));
        for cell in map.dynamic_range(5).unwrap().iter() {
            assert!(map.is_passable(cell));
        }
    }

    #[test]
    fn test_remove_dynamic() {
        let mut map = map_10x10();
        map.add_dynamic(9, &Footprint::square(Vec2::new(3.5, 3.5), 0.2));
        assert!(map.remove_dynamic(9));
        assert!(!map.remove_dynamic(9));
        assert!(map.dynamic_range(9).is_none());
        assert!(map.entities_at(CellCoord::new(3, 3), EntityCategory::Hovercraft).is_empty());
        assert!(!map.update_dynamic_position(9, Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn test_nearest_dynamic_skips_excluded() {
        let mut map = map_10x10();
        map.add_dynamic(1, &Footprint::square(Vec2::new(1.5, 1.5), 0.2));
        map.add_dynamic(2, &Footprint::square(Vec2::new(3.5, 1.5), 0.2));
        map.add_dynamic(3, &Footprint::square(Vec2::new(8.5, 8.5), 0.2));

        let from = CellCoord::new(1, 1);
        assert_eq!(map.nearest_dynamic(from, 9, 1), Some((2, CellCoord::new(3, 1))));
        assert_eq!(map.nearest_dynamic(from, 1, 1), None);
        assert_eq!(map.nearest_dynamic(from, 9, 99), Some((1, from)));
    }

    #[test]
    fn test_nearest_passable() {
        let mut map = map_10x10();
        map.populate_static(&[wall(1, (4.1, 4.1), (5.9, 5.9))]);
        let found = map.nearest_passable(CellCoord::new(4, 4), 3).unwrap();
        assert!(map.is_passable(found));
        assert_eq!(found.chebyshev_distance(CellCoord::new(4, 4)), 1);
    }

    #[test]
    fn test_reinitialize_clears_everything() {
        let mut map = map_10x10();
        map.populate_static(&[wall(1, (0.1, 0.1), (9.9, 0.9))]);
        map.add_dynamic(2, &Footprint::square(Vec2::new(5.0, 5.0), 1.0));

        let mut config = ArenaConfig::new(10.0, 10.0, 1.0);
        config.center = Vec2::new(5.0, 5.0);
        map.reinitialize(&config).unwrap();

        let stats = map.stats();
        assert_eq!(stats.blocked_cells, 0);
        assert_eq!(stats.tracked_dynamics, 0);
    }

    #[test]
    fn test_render_ascii() {
        let mut map = SpatialMap::new(&ArenaConfig::new(2.0, 3.0, 1.0)).unwrap();
        // origin is (-1.5, -1.0)
        map.populate_static(&[wall(1, (-1.4, -0.9), (-0.6, -0.1))]);
        map.add_dynamic(2, &Footprint::square(Vec2::new(1.0, 0.5), 0.2));
        assert_eq!(map.render_ascii(), "#..\n..H\n");
    }

    #[test]
    fn test_ring_cells() {
        assert_eq!(ring_cells(CellCoord::new(0, 0), 0).count(), 1);
        assert_eq!(ring_cells(CellCoord::new(0, 0), 1).count(), 8);
        assert_eq!(ring_cells(CellCoord::new(0, 0), 2).count(), 16);
    }
}
