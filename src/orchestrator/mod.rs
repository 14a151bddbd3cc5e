//! Checkpoint orchestration over a loaded configuration.

pub mod checkpoint_manager;

pub use checkpoint_manager::CheckpointManager;
