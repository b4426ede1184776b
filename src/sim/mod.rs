//! Simulation core: handles, the shared registry, lifecycle operations,
//! and the background tick and persistence loops.

/// Wall-clock pacing of background loops.
pub mod cadence;
pub mod handle;
pub mod lifecycle;
/// Periodic consumption snapshots.
pub mod persistence;
pub mod recovery;
/// Concurrent device-id to handle map.
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod worker;

pub use handle::{Measurements, SimulationHandle, StepReport, WS_TO_KWH};
pub use lifecycle::{LifecycleManager, Transition};
pub use persistence::{FlushReport, PersistenceWriter};
pub use recovery::{RecoveryReport, recover};
pub use registry::{Insertion, SimulationRegistry};
pub use runtime::FleetRuntime;
pub use scheduler::{CycleReport, SchedulerSettings, TickScheduler};
pub use worker::Worker;
