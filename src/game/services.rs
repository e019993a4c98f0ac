//! Collaborator interfaces the AI core drives
//!
//! The rigid-body engine and the hovercraft bookkeeping live outside this
//! crate. They are reached through these two traits; every lookup returns
//! `Option` because a hovercraft may be destroyed between the moment it is
//! enumerated and the moment it is used.

use crate::game::entity::{Footprint, HovercraftId};
use crate::util::vec2::{Vec2, Vec3};

/// Abilities a hovercraft can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ability {
    Rocket,
    Spikes,
    /// Light the flame trail
    TrailActivate,
    /// Extinguish the flame trail
    TrailDeactivate,
    /// Dashes are player-only; bot actions never carry a dash intent
    DashForward,
    DashBack,
    DashLeft,
    DashRight,
}

/// Position and heading of a hovercraft's rigid body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation about the up axis in radians
    pub yaw: f32,
}

/// Registry view of one hovercraft
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HovercraftInfo {
    pub id: HovercraftId,
    pub is_bot: bool,
    /// False while stunned, respawning or otherwise not accepting movement input
    pub controllable: bool,
}

/// Rigid-body queries and commands
pub trait PhysicsService {
    fn position(&self, id: HovercraftId) -> Option<Vec3>;
    fn linear_velocity(&self, id: HovercraftId) -> Option<Vec3>;
    /// Unit facing vector
    fn direction(&self, id: HovercraftId) -> Option<Vec3>;
    fn global_transform(&self, id: HovercraftId) -> Option<Transform>;
    /// World-space bounding footprint used for grid membership
    fn footprint(&self, id: HovercraftId) -> Option<Footprint>;

    /// Movement input on the ground plane, each axis in [-1, 1]
    fn move_by(&mut self, id: HovercraftId, x: f32, y: f32);
    /// Steering input in [-1, 1]; positive turns counter-clockwise
    fn turn(&mut self, id: HovercraftId, amount: f32);
    /// Returns false when the ability is on cooldown or unavailable
    fn use_ability(&mut self, id: HovercraftId, ability: Ability) -> bool;
    /// Teleport on the ground plane, keeping height
    fn set_position(&mut self, id: HovercraftId, position: Vec2);
}

/// Enumeration and lookup of live hovercraft
pub trait HovercraftRegistry {
    /// Human-controlled hovercraft, in a stable order
    fn players(&self) -> Vec<HovercraftId>;
    /// Bot-controlled hovercraft, in a stable order
    fn bots(&self) -> Vec<HovercraftId>;
    fn resolve(&self, id: HovercraftId) -> Option<HovercraftInfo>;
    /// Flame trail fuel in [0, 1]
    fn trail_fuel_percent(&self, id: HovercraftId) -> Option<f32>;
}
