//! Device fleet simulation core: lifecycle management, tick scheduling,
//! consumption persistence, and crash recovery.

/// REST API over the lifecycle operations (feature `api`).
#[cfg(feature = "api")]
pub mod api;
pub mod config;
/// Physical models and the built-in model catalog.
pub mod devices;
pub mod error;
pub mod io;
/// Simulation handles, registry, lifecycle, and background loops.
pub mod sim;
/// Device records and the store collaborator.
pub mod store;

pub use error::{Result, SimError};
