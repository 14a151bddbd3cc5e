//! Domain model module declarations.

pub mod metadata;
pub mod summary;

pub use metadata::CheckpointMetadata;
pub use summary::CheckpointSummary;
