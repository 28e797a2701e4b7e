//! Adapters implementing the domain ports.
//!
//! The in-memory adapters are always available. MySQL and MongoDB support are
//! behind the `mysql` and `mongo` features.

pub mod in_memory;
#[cfg(feature = "mongo")]
pub mod mongo;
#[cfg(feature = "mysql")]
pub mod mysql;
