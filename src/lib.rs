#![forbid(unsafe_code)]

//! Checksummed checkpoint archives for DCS Foothold campaign saves.
//!
//! Groups a server's save files by campaign, packages them into a ZIP
//! archive with a `metadata.json` digest table, and verifies every digest
//! before restoring an archive.

pub mod campaign;
pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod models;
pub mod orchestrator;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
pub use orchestrator::CheckpointManager;
