//! Persistence writer: periodic consumption snapshots of powered-on devices.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::registry::SimulationRegistry;
use super::worker::Worker;
use crate::error::Result;
use crate::store::{ConsumptionRecord, DeviceStore, PowerState};

/// Outcome counts of one flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Consumption records appended.
    pub appended: usize,
    /// Devices whose record is not ON, or whose handle disappeared.
    pub skipped: usize,
    /// Devices the store could not serve; retried on the next fire.
    pub failed: usize,
}

/// Appends one consumption record per ON device each interval.
pub struct PersistenceWriter {
    registry: Arc<SimulationRegistry>,
    store: Arc<dyn DeviceStore>,
    interval: Duration,
}

impl PersistenceWriter {
    pub fn new(
        registry: Arc<SimulationRegistry>,
        store: Arc<dyn DeviceStore>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            interval,
        }
    }

    /// Snapshots the registry and appends a record for every device whose
    /// persisted state is ON.
    pub fn flush_once(&self) -> FlushReport {
        let mut report = FlushReport::default();

        for id in self.registry.snapshot_ids() {
            let record = match self.store.get(&id) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(device_id = %id, error = %e, "cannot read device record");
                    continue;
                }
            };
            if record.power_state != PowerState::On {
                report.skipped += 1;
                continue;
            }
            let Some(handle) = self.registry.get(&id) else {
                report.skipped += 1;
                continue;
            };

            let m = handle.measurements();
            let entry = ConsumptionRecord {
                power_w: m.power_w,
                energy_kwh: m.energy_kwh,
                powered_on: m.powered_on,
                timestamp: Utc::now(),
            };
            match self.store.append_consumption(&id, entry) {
                Ok(()) => report.appended += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(device_id = %id, error = %e, "cannot store consumption record");
                }
            }
        }

        report
    }

    /// Moves the writer onto its own thread, firing every interval.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Spawn` if the thread cannot be created.
    pub fn spawn(self) -> Result<Worker> {
        let interval = self.interval;
        let mut first = true;
        Worker::spawn("persistence-writer", move || {
            // The first fire happens one interval after start.
            if std::mem::take(&mut first) {
                return interval;
            }
            let report = self.flush_once();
            if report.appended > 0 || report.failed > 0 {
                info!(
                    appended = report.appended,
                    failed = report.failed,
                    "stored device consumption data"
                );
            } else {
                debug!(skipped = report.skipped, "no device consumption to store");
            }
            interval
        })
    }
}
