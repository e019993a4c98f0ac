//! Hover Arena core
//!
//! Spatial grid, pathfinding and bot AI for a hovercraft arena game. The
//! rigid-body engine and hovercraft registry are external; they plug in
//! through the traits in [`game::services`].
//!
//! # Features
//!
//! - `parallel_ai` - default `AiConfig::parallel_enabled` to true (enabled by default)

pub mod config;
pub mod util;
pub mod game;
