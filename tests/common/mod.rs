//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use fleet_sim::devices::{ModelCatalog, ModelParams};
use fleet_sim::sim::{
    LifecycleManager, PersistenceWriter, SchedulerSettings, SimulationRegistry, TickScheduler,
};
use fleet_sim::store::{DeviceModelSpec, DeviceRecord, MemoryStore, PowerState};

/// Lifecycle manager plus the loops sharing its registry, driven by hand.
pub struct Fleet {
    pub store: Arc<MemoryStore>,
    pub lifecycle: Arc<LifecycleManager>,
    pub scheduler: TickScheduler,
    pub writer: PersistenceWriter,
}

impl Fleet {
    pub fn registry(&self) -> &Arc<SimulationRegistry> {
        self.lifecycle.registry()
    }

    /// Runs `n` scheduler ticks.
    pub fn tick(&self, n: usize) {
        for _ in 0..n {
            self.scheduler.run_cycle();
        }
    }
}

/// Record with a fixed id and a catalog model using default parameters.
pub fn record(id: &str, state: PowerState, model: &str) -> DeviceRecord {
    let spec = DeviceModelSpec::new(model, ModelParams::new());
    DeviceRecord::new(format!("device {id}"), Some(spec))
        .with_id(id)
        .with_state(state)
}

/// Fleet over an in-memory store holding `records`, one-second ticks.
pub fn fleet(records: Vec<DeviceRecord>) -> Fleet {
    let store = Arc::new(MemoryStore::with_records(records));
    let registry = Arc::new(SimulationRegistry::new());
    let lifecycle = Arc::new(LifecycleManager::new(
        Arc::clone(&registry),
        store.clone(),
        Arc::new(ModelCatalog::new()),
    ));
    Fleet {
        scheduler: TickScheduler::new(Arc::clone(&registry), SchedulerSettings::default()),
        writer: PersistenceWriter::new(registry, store.clone(), std::time::Duration::from_secs(60)),
        store,
        lifecycle,
    }
}
