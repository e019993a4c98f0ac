//! In-memory kinematic arena
//!
//! Implements both collaborator traits over a very small movement model so the
//! AI loop can run headless: move input accelerates, turn input changes yaw,
//! drag decays velocity, the flame trail burns fuel and abilities have
//! cooldowns. Static obstacles stop a hovercraft dead and knock it back; the
//! knock-back is sent through the contact queue like a real contact callback.

use tracing::debug;

use crate::config::ArenaConfig;
use crate::game::constants::sim::*;
use crate::game::contacts::{ContactEffect, ContactSender};
use crate::game::entity::{Footprint, HovercraftId};
use crate::game::services::{Ability, HovercraftInfo, HovercraftRegistry, PhysicsService, Transform};
use crate::util::vec2::{Vec2, Vec3};

/// Distance a hovercraft is pushed back after hitting an obstacle
const KNOCKBACK: f32 = 2.0;

/// One simulated hovercraft
#[derive(Debug, Clone)]
pub struct SandboxCraft {
    pub id: HovercraftId,
    pub is_bot: bool,
    pub position: Vec2,
    pub velocity: Vec2,
    pub yaw: f32,
    pub controllable: bool,
    pub trail_fuel: f32,
    pub trail_lit: bool,
    /// Movement input received since the last step
    pub move_input: Vec2,
    /// Turn input received since the last step
    pub turn_input: f32,
    rocket_cooldown: f32,
    spikes_cooldown: f32,
    dash_cooldown: f32,
}

impl SandboxCraft {
    fn new(id: HovercraftId, is_bot: bool, position: Vec2, yaw: f32) -> Self {
        Self {
            id,
            is_bot,
            position,
            velocity: Vec2::ZERO,
            yaw,
            controllable: true,
            trail_fuel: 1.0,
            trail_lit: false,
            move_input: Vec2::ZERO,
            turn_input: 0.0,
            rocket_cooldown: 0.0,
            spikes_cooldown: 0.0,
            dash_cooldown: 0.0,
        }
    }

    #[inline]
    pub fn facing(&self) -> Vec2 {
        Vec2::from_angle(self.yaw)
    }

    fn footprint(&self) -> Footprint {
        let mut footprint = Footprint::square(self.position, HOVERCRAFT_HALF_EXTENT);
        footprint.position.y = HOVER_HEIGHT;
        footprint
    }
}

/// Kinematic stand-in for the physics engine and hovercraft registry
#[derive(Debug, Default)]
pub struct SandboxArena {
    crafts: Vec<SandboxCraft>,
    next_id: HovercraftId,
    bounds_min: Vec2,
    bounds_max: Vec2,
    obstacles: Vec<(Vec2, Vec2)>,
    ability_log: Vec<(HovercraftId, Ability)>,
    contacts: Option<ContactSender>,
}

impl SandboxArena {
    /// Empty sandbox confined to the arena rectangle
    pub fn new(arena: &ArenaConfig) -> Self {
        let half = Vec2::new(arena.width * 0.5, arena.length * 0.5);
        Self {
            next_id: 1,
            bounds_min: arena.center - half,
            bounds_max: arena.center + half,
            ..Default::default()
        }
    }

    /// Route obstacle knock-backs through a contact queue
    pub fn with_contacts(mut self, sender: ContactSender) -> Self {
        self.contacts = Some(sender);
        self
    }

    /// Axis-aligned obstacle that hovercraft cannot enter
    pub fn add_obstacle(&mut self, min: Vec2, max: Vec2) {
        self.obstacles.push((min, max));
    }

    pub fn spawn_player(&mut self, position: Vec2, yaw: f32) -> HovercraftId {
        self.spawn(false, position, yaw)
    }

    pub fn spawn_bot(&mut self, position: Vec2, yaw: f32) -> HovercraftId {
        self.spawn(true, position, yaw)
    }

    fn spawn(&mut self, is_bot: bool, position: Vec2, yaw: f32) -> HovercraftId {
        let id = self.next_id;
        self.next_id += 1;
        let position = self.clamp_to_bounds(position);
        self.crafts.push(SandboxCraft::new(id, is_bot, position, yaw));
        id
    }

    /// Remove a hovercraft, as if destroyed
    pub fn despawn(&mut self, id: HovercraftId) -> bool {
        let before = self.crafts.len();
        self.crafts.retain(|c| c.id != id);
        let removed = self.crafts.len() != before;
        if removed {
            if let Some(sender) = &self.contacts {
                let _ = sender.try_send(ContactEffect::Destroyed { id });
            }
        }
        removed
    }

    pub fn craft(&self, id: HovercraftId) -> Option<&SandboxCraft> {
        self.crafts.iter().find(|c| c.id == id)
    }

    pub fn craft_mut(&mut self, id: HovercraftId) -> Option<&mut SandboxCraft> {
        self.crafts.iter_mut().find(|c| c.id == id)
    }

    pub fn crafts(&self) -> &[SandboxCraft] {
        &self.crafts
    }

    pub fn len(&self) -> usize {
        self.crafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crafts.is_empty()
    }

    /// Abilities that actually fired, in order
    pub fn ability_log(&self) -> &[(HovercraftId, Ability)] {
        &self.ability_log
    }

    pub fn clear_ability_log(&mut self) {
        self.ability_log.clear();
    }

    /// Advance the kinematic model by `dt` and consume pending inputs
    pub fn step(&mut self, dt: f32) {
        let drag_factor = 1.0 - DRAG;
        let mut knocked: Vec<(HovercraftId, Vec2)> = Vec::new();

        for i in 0..self.crafts.len() {
            let craft = &mut self.crafts[i];

            craft.yaw += craft.turn_input * TURN_RATE * dt;
            craft.velocity += craft.move_input * (MOVE_ACCELERATION * dt);
            craft.velocity *= drag_factor;
            craft.velocity = craft.velocity.clamp_length(MAX_SPEED);
            craft.move_input = Vec2::ZERO;
            craft.turn_input = 0.0;

            craft.rocket_cooldown = (craft.rocket_cooldown - dt).max(0.0);
            craft.spikes_cooldown = (craft.spikes_cooldown - dt).max(0.0);
            craft.dash_cooldown = (craft.dash_cooldown - dt).max(0.0);

            if craft.trail_lit {
                craft.trail_fuel = (craft.trail_fuel - TRAIL_FUEL_DRAIN * dt).max(0.0);
                if craft.trail_fuel <= 0.0 {
                    craft.trail_lit = false;
                }
            } else {
                craft.trail_fuel = (craft.trail_fuel + TRAIL_FUEL_REGEN * dt).min(1.0);
            }

            let previous = craft.position;
            let moved = previous + craft.velocity * dt;
            let velocity = craft.velocity;
            let next = self.clamp_to_bounds(moved);

            if self.hits_obstacle(next) {
                let craft = &mut self.crafts[i];
                craft.velocity = Vec2::ZERO;
                knocked.push((craft.id, previous - velocity.normalize() * KNOCKBACK));
            } else {
                self.crafts[i].position = next;
            }
        }

        for (id, position) in knocked {
            let queued = self
                .contacts
                .as_ref()
                .map_or(false, |s| s.try_send(ContactEffect::Reposition { id, position }).is_ok());
            if !queued {
                debug!(id, "Knock-back dropped, no contact queue");
            }
        }
    }

    fn clamp_to_bounds(&self, position: Vec2) -> Vec2 {
        if self.bounds_min == self.bounds_max {
            return position;
        }
        let lo = self.bounds_min + Vec2::ONE * HOVERCRAFT_HALF_EXTENT;
        let hi = self.bounds_max - Vec2::ONE * HOVERCRAFT_HALF_EXTENT;
        Vec2::new(
            position.x.clamp(lo.x, hi.x.max(lo.x)),
            position.y.clamp(lo.y, hi.y.max(lo.y)),
        )
    }

    fn hits_obstacle(&self, position: Vec2) -> bool {
        let half = HOVERCRAFT_HALF_EXTENT;
        self.obstacles.iter().any(|(min, max)| {
            position.x + half > min.x
                && position.x - half < max.x
                && position.y + half > min.y
                && position.y - half < max.y
        })
    }

    fn log(&mut self, id: HovercraftId, ability: Ability) -> bool {
        self.ability_log.push((id, ability));
        true
    }
}

impl PhysicsService for SandboxArena {
    fn position(&self, id: HovercraftId) -> Option<Vec3> {
        self.craft(id).map(|c| Vec3::from_ground(c.position, HOVER_HEIGHT))
    }

    fn linear_velocity(&self, id: HovercraftId) -> Option<Vec3> {
        self.craft(id).map(|c| Vec3::from_ground(c.velocity, 0.0))
    }

    fn direction(&self, id: HovercraftId) -> Option<Vec3> {
        self.craft(id).map(|c| Vec3::from_ground(c.facing(), 0.0))
    }

    fn global_transform(&self, id: HovercraftId) -> Option<Transform> {
        self.craft(id).map(|c| Transform {
            position: Vec3::from_ground(c.position, HOVER_HEIGHT),
            yaw: c.yaw,
        })
    }

    fn footprint(&self, id: HovercraftId) -> Option<Footprint> {
        self.craft(id).map(SandboxCraft::footprint)
    }

    fn move_by(&mut self, id: HovercraftId, x: f32, y: f32) {
        if let Some(craft) = self.craft_mut(id) {
            craft.move_input = Vec2::new(x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
        }
    }

    fn turn(&mut self, id: HovercraftId, amount: f32) {
        if let Some(craft) = self.craft_mut(id) {
            craft.turn_input = amount.clamp(-1.0, 1.0);
        }
    }

    fn use_ability(&mut self, id: HovercraftId, ability: Ability) -> bool {
        let Some(craft) = self.craft_mut(id) else {
            return false;
        };

        match ability {
            Ability::Rocket => {
                if craft.rocket_cooldown > 0.0 {
                    return false;
                }
                craft.rocket_cooldown = ROCKET_COOLDOWN;
            }
            Ability::Spikes => {
                if craft.spikes_cooldown > 0.0 {
                    return false;
                }
                craft.spikes_cooldown = SPIKES_COOLDOWN;
            }
            Ability::TrailActivate => {
                if craft.trail_lit || craft.trail_fuel <= 0.0 {
                    return false;
                }
                craft.trail_lit = true;
            }
            Ability::TrailDeactivate => {
                if !craft.trail_lit {
                    return false;
                }
                craft.trail_lit = false;
            }
            Ability::DashForward | Ability::DashBack | Ability::DashLeft | Ability::DashRight => {
                if craft.dash_cooldown > 0.0 {
                    return false;
                }
                let facing = craft.facing();
                let dir = match ability {
                    Ability::DashForward => facing,
                    Ability::DashBack => -facing,
                    Ability::DashLeft => facing.rotate(std::f32::consts::FRAC_PI_2),
                    _ => facing.rotate(-std::f32::consts::FRAC_PI_2),
                };
                craft.velocity = (craft.velocity + dir * DASH_IMPULSE).clamp_length(MAX_SPEED);
                craft.dash_cooldown = DASH_COOLDOWN;
            }
        }

        self.log(id, ability)
    }

    /// Teleports into an obstacle are refused, as a solver would push them out
    fn set_position(&mut self, id: HovercraftId, position: Vec2) {
        let position = self.clamp_to_bounds(position);
        if self.hits_obstacle(position) {
            return;
        }
        if let Some(craft) = self.craft_mut(id) {
            craft.position = position;
        }
    }
}

impl HovercraftRegistry for SandboxArena {
    fn players(&self) -> Vec<HovercraftId> {
        self.crafts.iter().filter(|c| !c.is_bot).map(|c| c.id).collect()
    }

    fn bots(&self) -> Vec<HovercraftId> {
        self.crafts.iter().filter(|c| c.is_bot).map(|c| c.id).collect()
    }

    fn resolve(&self, id: HovercraftId) -> Option<HovercraftInfo> {
        self.craft(id).map(|c| HovercraftInfo {
            id: c.id,
            is_bot: c.is_bot,
            controllable: c.controllable,
        })
    }

    fn trail_fuel_percent(&self, id: HovercraftId) -> Option<f32> {
        self.craft(id).map(|c| c.trail_fuel)
    }
}
