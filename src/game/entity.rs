//! Entity handles shared between the grid, the bots and the physics boundary
//!
//! Cells never hold references to live entities. They hold stable integer
//! handles tagged with a category, so a hovercraft destroyed mid-tick leaves a
//! dangling id at worst, never a dangling pointer.

use serde::{Deserialize, Serialize};

use crate::util::vec2::{Vec2, Vec3};

/// Stable identifier of any arena entity
pub type EntityId = u32;

/// Identifier of a hovercraft (player- or bot-controlled)
pub type HovercraftId = EntityId;

/// What kind of thing an entity is, as far as the grid cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    /// Walls, pillars and other static geometry; blocks pathfinding
    Static,
    PointLight,
    SpotLight,
    /// Interactable hazards (spike traps, flame pools)
    Hazard,
    /// Moving hovercraft, tracked incrementally
    Hovercraft,
}

impl EntityCategory {
    /// Whether an entity of this category makes a cell impassable
    #[inline]
    pub fn blocks_movement(&self) -> bool {
        matches!(self, EntityCategory::Static)
    }
}

/// World-space footprint of an entity
///
/// `negative_offset` and `positive_offset` are the extents from `position` to
/// the min and max corners of the bounding box. Both offsets being zero is the
/// "no footprint" sentinel: the entity does not occupy grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub position: Vec3,
    pub negative_offset: Vec3,
    pub positive_offset: Vec3,
}

impl Footprint {
    pub fn new(position: Vec3, negative_offset: Vec3, positive_offset: Vec3) -> Self {
        Self {
            position,
            negative_offset,
            positive_offset,
        }
    }

    /// Axis-aligned square footprint centred on a ground position
    pub fn square(center: Vec2, half_extent: f32) -> Self {
        Self {
            position: Vec3::from_ground(center, 0.0),
            negative_offset: Vec3::new(-half_extent, 0.0, -half_extent),
            positive_offset: Vec3::new(half_extent, 0.0, half_extent),
        }
    }

    /// Axis-aligned box between two ground corners
    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        let center = Vec2::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
        let half = Vec2::new((max.x - min.x).abs() * 0.5, (max.y - min.y).abs() * 0.5);
        Self {
            position: Vec3::from_ground(center, 0.0),
            negative_offset: Vec3::new(-half.x, 0.0, -half.y),
            positive_offset: Vec3::new(half.x, 0.0, half.y),
        }
    }

    /// Whether this footprint is the zero-sized sentinel
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.negative_offset.is_zero() && self.positive_offset.is_zero()
    }

    /// Min and max ground-plane corners
    pub fn ground_bounds(&self) -> (Vec2, Vec2) {
        let center = self.position.ground();
        (
            center + self.negative_offset.ground(),
            center + self.positive_offset.ground(),
        )
    }

    /// Same extents moved to a new ground position
    pub fn moved_to(&self, ground: Vec2) -> Self {
        Self {
            position: Vec3::from_ground(ground, self.position.y),
            ..*self
        }
    }
}

/// An entity registered into the grid at arena load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaEntity {
    pub id: EntityId,
    pub category: EntityCategory,
    pub footprint: Footprint,
}

impl ArenaEntity {
    pub fn new(id: EntityId, category: EntityCategory, footprint: Footprint) -> Self {
        Self {
            id,
            category,
            footprint,
        }
    }
}
