//! Wiring of the shared registry, lifecycle manager, and background loops.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::lifecycle::LifecycleManager;
use super::persistence::PersistenceWriter;
use super::recovery::{RecoveryReport, recover};
use super::registry::SimulationRegistry;
use super::scheduler::{SchedulerSettings, TickScheduler};
use super::worker::Worker;
use crate::devices::ModelStepper;
use crate::error::Result;
use crate::store::DeviceStore;

/// A running fleet: one registry shared by the lifecycle manager, the tick
/// scheduler, and the persistence writer.
///
/// Recovery runs once inside [`FleetRuntime::start`], before either loop
/// is spawned.
pub struct FleetRuntime {
    lifecycle: Arc<LifecycleManager>,
    recovery: RecoveryReport,
    workers: Vec<Worker>,
}

impl FleetRuntime {
    /// Restores interrupted simulations and starts both background loops.
    ///
    /// # Arguments
    ///
    /// * `settings` - Tick loop timing
    /// * `persist_interval` - Period between consumption snapshots
    /// * `store` - Device record store
    /// * `stepper` - Model factory used for every started simulation
    ///
    /// # Errors
    ///
    /// Returns `SimError::Store` if the live records cannot be listed, or
    /// `SimError::Spawn` if a worker thread cannot be created. Workers
    /// already spawned are stopped again.
    pub fn start(
        settings: SchedulerSettings,
        persist_interval: Duration,
        store: Arc<dyn DeviceStore>,
        stepper: Arc<dyn ModelStepper>,
    ) -> Result<Self> {
        let registry = Arc::new(SimulationRegistry::new());
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            stepper,
        ));

        let recovery = recover(&lifecycle)?;

        info!(
            tick_ms = settings.tick_interval.as_millis() as u64,
            dt_seconds = settings.dt_seconds,
            persist_secs = persist_interval.as_secs(),
            "starting fleet runtime"
        );
        let scheduler = TickScheduler::new(Arc::clone(&registry), settings).spawn()?;
        // Dropping `scheduler` on the error path stops it.
        let writer = PersistenceWriter::new(registry, store, persist_interval).spawn()?;

        Ok(Self {
            lifecycle,
            recovery,
            workers: vec![scheduler, writer],
        })
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn registry(&self) -> &Arc<SimulationRegistry> {
        self.lifecycle.registry()
    }

    /// What the start-up recovery pass did.
    pub fn recovery(&self) -> RecoveryReport {
        self.recovery
    }

    /// Stops both loops, waits for them, and drops every handle.
    ///
    /// Records keep their power state so the next start recovers the same set.
    pub fn shutdown(self) {
        let Self {
            lifecycle, workers, ..
        } = self;
        for worker in workers {
            let name = worker.name();
            worker.stop();
            info!(worker = name, "worker joined");
        }
        lifecycle.stop_all();
        info!("fleet runtime shut down");
    }
}
