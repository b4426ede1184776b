//! Crash recovery: restarts simulations whose records say they should be live.

use tracing::{info, warn};

use super::lifecycle::{LifecycleManager, Transition};
use crate::error::Result;
use crate::store::PowerState;

/// Outcome counts of one recovery pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Simulations started.
    pub restored: usize,
    /// Of those, how many were switched back on.
    pub turned_on: usize,
    /// Live records that already had a handle.
    pub already_running: usize,
    /// Live records that could not be restored (no model, bad parameters, store failure).
    pub failed: usize,
}

/// Restarts every non-INACTIVE device that has no handle in the registry.
///
/// Devices persisted as ON are switched on again. Safe to re-run: a second
/// pass with no intervening change starts nothing.
///
/// # Errors
///
/// Returns `SimError::Store` only when the live records cannot be listed;
/// per-device failures are logged and counted.
pub fn recover(lifecycle: &LifecycleManager) -> Result<RecoveryReport> {
    let mut report = RecoveryReport::default();
    info!("restoring interrupted device simulations");

    for state in PowerState::LIVE {
        for record in lifecycle.store().find_by_state(state)? {
            let id = &record.device_id;
            if lifecycle.is_simulating(id) {
                report.already_running += 1;
                continue;
            }

            let Some(model) = &record.model else {
                warn!(device_id = %id, state = %state, "live device has no model, not restored");
                report.failed += 1;
                continue;
            };

            match lifecycle.start_simulation(id, &model.model_name, &model.params) {
                Ok((_, Transition::Started)) => report.restored += 1,
                Ok(_) => {
                    report.already_running += 1;
                    continue;
                }
                Err(e) => {
                    warn!(device_id = %id, error = %e, "cannot restore simulation");
                    report.failed += 1;
                    continue;
                }
            }

            if state == PowerState::On {
                match lifecycle.turn_on(id) {
                    Ok(_) => report.turned_on += 1,
                    Err(e) => warn!(device_id = %id, error = %e, "restored but cannot turn on"),
                }
            }
        }
    }

    info!(
        restored = report.restored,
        turned_on = report.turned_on,
        failed = report.failed,
        "recovery finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::devices::{ModelCatalog, ModelParams};
    use crate::sim::SimulationRegistry;
    use crate::store::{DeviceId, DeviceModelSpec, DeviceRecord, MemoryStore};

    fn record(id: &str, state: PowerState, model: Option<&str>) -> DeviceRecord {
        DeviceRecord::new(id, model.map(|m| DeviceModelSpec::new(m, ModelParams::new())))
            .with_id(id)
            .with_state(state)
    }

    fn manager(records: Vec<DeviceRecord>) -> LifecycleManager {
        LifecycleManager::new(
            Arc::new(SimulationRegistry::new()),
            Arc::new(MemoryStore::with_records(records)),
            Arc::new(ModelCatalog::new()),
        )
    }

    #[test]
    fn restores_live_and_skips_inactive() {
        let lm = manager(vec![
            record("a", PowerState::Active, Some("Lamp")),
            record("b", PowerState::On, Some("Fridge")),
            record("c", PowerState::Off, Some("Heater")),
            record("d", PowerState::Inactive, Some("Lamp")),
        ]);
        let report = recover(&lm).expect("recover");
        assert_eq!(report.restored, 3);
        assert_eq!(report.turned_on, 1);
        assert!(lm.is_simulating(&DeviceId::from("a")));
        assert!(!lm.is_simulating(&DeviceId::from("d")));

        let b = lm.registry().get(&DeviceId::from("b")).expect("b restored");
        assert!(b.is_on());
        assert!(b.just_turned_on());
        let c = lm.registry().get(&DeviceId::from("c")).expect("c restored");
        assert!(!c.is_on());
    }

    #[test]
    fn unrecoverable_devices_are_counted_not_fatal() {
        let lm = manager(vec![
            record("bare", PowerState::Active, None),
            record("bogus", PowerState::Active, Some("Toaster")),
            record("ok", PowerState::Active, Some("Lamp")),
        ]);
        let report = recover(&lm).expect("recover");
        assert_eq!(report.failed, 2);
        assert_eq!(report.restored, 1);
        assert_eq!(lm.registry().count(), 1);
    }

    #[test]
    fn second_pass_starts_nothing() {
        let lm = manager(vec![record("a", PowerState::On, Some("Lamp"))]);
        recover(&lm).expect("first pass");
        let report = recover(&lm).expect("second pass");
        assert_eq!(report.restored, 0);
        assert_eq!(report.already_running, 1);
    }
}
