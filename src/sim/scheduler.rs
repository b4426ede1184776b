//! Tick scheduler advancing every registered handle once per cadence interval.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::cadence::{Cadence, Pacing};
use super::registry::SimulationRegistry;
use super::worker::Worker;
use crate::error::{Result, SimError};

/// Timing parameters of the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Wall-clock period between tick starts.
    pub tick_interval: Duration,
    /// Simulated seconds each tick advances every model.
    pub dt_seconds: f64,
    pub pacing: Pacing,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            dt_seconds: 1.0,
            pacing: Pacing::Corrected,
        }
    }
}

/// Outcome counts of one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Handles that stepped successfully.
    pub stepped: usize,
    /// Handles whose model failed; skipped until the next tick.
    pub failed: usize,
    /// Ids in the snapshot whose handle was removed before its turn.
    pub vanished: usize,
}

/// Single loop stepping all simulations at a fixed cadence.
pub struct TickScheduler {
    registry: Arc<SimulationRegistry>,
    settings: SchedulerSettings,
}

impl TickScheduler {
    pub fn new(registry: Arc<SimulationRegistry>, settings: SchedulerSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Runs one tick over a snapshot of the registry.
    ///
    /// The registry lock is held only while taking the snapshot and while
    /// looking up each handle, never during a model step. One device's
    /// failure is logged and does not affect the others.
    pub fn run_cycle(&self) -> CycleReport {
        let dt = self.settings.dt_seconds;
        let mut report = CycleReport::default();

        for id in self.registry.snapshot_ids() {
            let Some(handle) = self.registry.get(&id) else {
                report.vanished += 1;
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handle.step(dt)))
                .unwrap_or_else(|_| Err(SimError::Step("model panicked".to_string())));
            match outcome {
                Ok(step) => {
                    report.stepped += 1;
                    debug!(
                        device_id = %id,
                        power_w = step.power_w,
                        reinitialized = step.reinitialized,
                        "device stepped"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(device_id = %id, error = %e, "step failed, device skipped this tick");
                }
            }
        }

        report
    }

    /// Moves the scheduler onto its own thread.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Spawn` if the thread cannot be created.
    pub fn spawn(self) -> Result<Worker> {
        let mut cadence = Cadence::new(self.settings.tick_interval, self.settings.pacing);
        Worker::spawn("tick-scheduler", move || {
            let tick = cadence.tick();
            let started = Instant::now();
            let report = self.run_cycle();
            let elapsed = started.elapsed();
            debug!(
                tick,
                stepped = report.stepped,
                failed = report.failed,
                elapsed_ms = elapsed.as_millis() as u64,
                "tick completed"
            );
            cadence.wait_after(elapsed)
        })
    }
}
