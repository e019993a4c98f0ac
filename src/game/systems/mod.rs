pub mod ai;
pub mod coordinator;
