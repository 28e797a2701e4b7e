//! Application layer orchestrating the staging workflow.
//!
//! `StagingLoader` extracts payments from a source, transforms them into
//! staged documents and reloads the staging collection. `Analytics` runs the
//! read-only reports against that collection.

pub mod analytics;
pub mod loader;
