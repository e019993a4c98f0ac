pub mod constants;
pub mod entity;
pub mod spatial;
pub mod pathfinding;
pub mod services;
pub mod contacts;
pub mod performance;
pub mod systems;
pub mod world;
pub mod sandbox;
