//! Lifecycle operations: start/stop, activate/deactivate, turn on/off, and
//! the caller-facing state queries.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::handle::{Measurements, SimulationHandle};
use super::registry::SimulationRegistry;
use crate::devices::{ModelParams, ModelStepper};
use crate::error::{Result, SimError};
use crate::store::{DeviceId, DeviceModelSpec, DeviceRecord, DeviceStore, PowerState};

/// What a lifecycle call did. Idempotent repeats report the `Already*` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Started,
    AlreadyRunning,
    Stopped,
    AlreadyStopped,
    Activated,
    /// A handle existed but the record still said INACTIVE.
    Resynchronized,
    AlreadyActivated,
    Deactivated,
    AlreadyDeactivated,
    TurnedOn,
    TurnedOff,
    /// The model was replaced; a running simulation restarted from zero energy.
    ModelUpdated,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transition::Started => "simulation started",
            Transition::AlreadyRunning => "simulation already running",
            Transition::Stopped => "simulation stopped",
            Transition::AlreadyStopped => "simulation already stopped",
            Transition::Activated => "device activated",
            Transition::Resynchronized => "device record resynchronized with running simulation",
            Transition::AlreadyActivated => "device already activated",
            Transition::Deactivated => "device deactivated",
            Transition::AlreadyDeactivated => "device already deactivated",
            Transition::TurnedOn => "device turned on",
            Transition::TurnedOff => "device turned off",
            Transition::ModelUpdated => "device model updated",
        };
        f.write_str(s)
    }
}

/// Mutates the registry and the device store on behalf of callers.
///
/// Holds the one shared registry instance also handed to the tick scheduler
/// and the persistence writer. Every mutating call runs under one lifecycle
/// lock, so a registry change and the store write that goes with it are never
/// interleaved with another call's pair. Queries and the background loops do
/// not take it.
pub struct LifecycleManager {
    registry: Arc<SimulationRegistry>,
    store: Arc<dyn DeviceStore>,
    stepper: Arc<dyn ModelStepper>,
    transitions: Mutex<()>,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<SimulationRegistry>,
        store: Arc<dyn DeviceStore>,
        stepper: Arc<dyn ModelStepper>,
    ) -> Self {
        Self {
            registry,
            store,
            stepper,
            transitions: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<SimulationRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DeviceStore> {
        &self.store
    }

    fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, id: &DeviceId) -> Result<DeviceRecord> {
        self.store
            .get(id)?
            .ok_or_else(|| SimError::NotFound(id.clone()))
    }

    /// Starts simulating a device with the given model.
    ///
    /// Returns the existing handle with [`Transition::AlreadyRunning`] when
    /// the device is already simulating. A fresh handle starts a new energy
    /// accumulation epoch; an INACTIVE record is promoted to ACTIVE.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Initialization` when the model cannot
    /// be built (nothing is registered), `Store` when the promotion fails
    /// (the new handle is removed again).
    pub fn start_simulation(
        &self,
        id: &DeviceId,
        model_name: &str,
        params: &ModelParams,
    ) -> Result<(Arc<SimulationHandle>, Transition)> {
        let _guard = self.exclusive();
        self.start_locked(id, model_name, params)
    }

    fn start_locked(
        &self,
        id: &DeviceId,
        model_name: &str,
        params: &ModelParams,
    ) -> Result<(Arc<SimulationHandle>, Transition)> {
        if let Some(handle) = self.registry.get(id) {
            debug!(device_id = %id, "simulation already running");
            return Ok((handle, Transition::AlreadyRunning));
        }

        let record = self.record(id)?;
        let model = self.stepper.initialize(model_name, params).map_err(|e| {
            warn!(device_id = %id, model = model_name, error = %e, "model initialization failed");
            e
        })?;

        let insertion = self.registry.put(SimulationHandle::new(id.clone(), model));
        let handle = Arc::clone(insertion.handle());
        if !insertion.was_inserted() {
            debug!(device_id = %id, "lost start race, keeping existing handle");
            return Ok((handle, Transition::AlreadyRunning));
        }

        if record.power_state == PowerState::Inactive {
            if let Err(e) = self.store.set_power_state(id, PowerState::Active) {
                if self
                    .registry
                    .get(id)
                    .is_some_and(|current| Arc::ptr_eq(&current, &handle))
                {
                    self.registry.remove(id);
                }
                warn!(device_id = %id, error = %e, "could not promote record, start rolled back");
                return Err(e);
            }
        }

        info!(device_id = %id, model = model_name, "simulation started");
        Ok((handle, Transition::Started))
    }

    /// Removes the device's handle, leaving its record untouched.
    pub fn stop_simulation(&self, id: &DeviceId) -> Transition {
        let _guard = self.exclusive();
        self.stop_locked(id)
    }

    fn stop_locked(&self, id: &DeviceId) -> Transition {
        if self.registry.remove(id).is_some() {
            info!(device_id = %id, "simulation stopped");
            Transition::Stopped
        } else {
            debug!(device_id = %id, "simulation already stopped");
            Transition::AlreadyStopped
        }
    }

    /// Ensures the device is simulating and its record is not INACTIVE.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Initialization` (including a record with no model
    /// attached), or `Store`.
    pub fn activate(&self, id: &DeviceId) -> Result<Transition> {
        let _guard = self.exclusive();
        let record = self.record(id)?;

        if self.registry.contains(id) {
            if record.power_state.is_live() {
                return Ok(Transition::AlreadyActivated);
            }
            self.store.set_power_state(id, PowerState::Active)?;
            info!(device_id = %id, "record resynchronized to ACTIVE");
            return Ok(Transition::Resynchronized);
        }

        let model = record.model.ok_or_else(|| {
            SimError::init("<none>", format!("device \"{id}\" has no model attached"))
        })?;
        self.start_locked(id, &model.model_name, &model.params)?;
        Ok(Transition::Activated)
    }

    /// Removes the handle, then marks the record INACTIVE.
    ///
    /// Removal happens first so the record never claims INACTIVE while a
    /// handle still steps.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Store`.
    pub fn deactivate(&self, id: &DeviceId) -> Result<Transition> {
        let _guard = self.exclusive();
        let record = self.record(id)?;
        let removed = self.registry.remove(id).is_some();

        if record.power_state == PowerState::Inactive {
            if !removed {
                return Ok(Transition::AlreadyDeactivated);
            }
        } else {
            self.store.set_power_state(id, PowerState::Inactive)?;
        }

        info!(device_id = %id, "device deactivated");
        Ok(Transition::Deactivated)
    }

    /// Commands the device on starting with the next tick and persists ON.
    ///
    /// # Errors
    ///
    /// `NotActive` when the record is INACTIVE, `NotSimulating` when no
    /// handle exists, `Store` when the record cannot be updated (the control
    /// vector is then left unchanged).
    pub fn turn_on(&self, id: &DeviceId) -> Result<Transition> {
        let _guard = self.exclusive();
        self.switch_locked(id, true)
    }

    /// Commands the device off starting with the next tick and persists OFF.
    ///
    /// # Errors
    ///
    /// Same as [`LifecycleManager::turn_on`].
    pub fn turn_off(&self, id: &DeviceId) -> Result<Transition> {
        let _guard = self.exclusive();
        self.switch_locked(id, false)
    }

    fn switch_locked(&self, id: &DeviceId, on: bool) -> Result<Transition> {
        if self.record(id)?.power_state == PowerState::Inactive {
            return Err(SimError::NotActive(id.clone()));
        }
        let handle = self
            .registry
            .get(id)
            .ok_or_else(|| SimError::NotSimulating(id.clone()))?;
        let state = if on { PowerState::On } else { PowerState::Off };
        self.store.set_power_state(id, state)?;
        handle.set_command(on);
        info!(device_id = %id, state = %state, "power command applied");
        Ok(if on {
            Transition::TurnedOn
        } else {
            Transition::TurnedOff
        })
    }

    /// Stores a new device, starts simulating it, and switches it on.
    ///
    /// The model is built before the record is written, so bad parameters
    /// leave no record behind.
    ///
    /// # Errors
    ///
    /// `Initialization` for an unknown model or bad parameters, `Store` when
    /// the id is taken or the store fails.
    pub fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord> {
        let _guard = self.exclusive();
        let model = record
            .model
            .clone()
            .ok_or_else(|| SimError::init("<none>", "a new device needs a model"))?;
        self.stepper.initialize(&model.model_name, &model.params)?;

        let id = self.store.create(record.with_state(PowerState::Inactive))?;
        self.start_locked(&id, &model.model_name, &model.params)?;
        self.switch_locked(&id, true)?;
        info!(device_id = %id, model = %model.model_name, "device created");
        self.record(&id)
    }

    /// Renames a device and replaces its model.
    ///
    /// A running simulation is stopped and restarted with the new model,
    /// which starts a fresh energy epoch; an ON device is switched on again.
    /// An INACTIVE device only has its record updated.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Initialization` (checked before anything is stopped), or
    /// `Store`.
    pub fn update_model(
        &self,
        id: &DeviceId,
        device_name: &str,
        model: DeviceModelSpec,
    ) -> Result<Transition> {
        let _guard = self.exclusive();
        let record = self.record(id)?;
        self.stepper.initialize(&model.model_name, &model.params)?;

        let was_running = self.stop_locked(id) == Transition::Stopped;
        self.store.update_model(id, device_name, model.clone())?;

        if was_running || record.power_state.is_live() {
            self.start_locked(id, &model.model_name, &model.params)?;
            if record.power_state == PowerState::On {
                self.switch_locked(id, true)?;
            }
        }
        info!(device_id = %id, model = %model.model_name, "device model updated");
        Ok(Transition::ModelUpdated)
    }

    /// Stops the simulation and deletes the record with its history.
    ///
    /// # Errors
    ///
    /// `NotFound` when no record existed, or `Store`.
    pub fn delete_device(&self, id: &DeviceId) -> Result<()> {
        let _guard = self.exclusive();
        self.stop_locked(id);
        if self.store.delete(id)? {
            info!(device_id = %id, "device deleted");
            Ok(())
        } else {
            Err(SimError::NotFound(id.clone()))
        }
    }

    /// Drops every handle. Records are left as they are so a later
    /// recovery restores the same set.
    pub fn stop_all(&self) -> usize {
        let _guard = self.exclusive();
        let n = self.registry.clear();
        info!(count = n, "stopped all simulations");
        n
    }

    /// Persisted power state of the device.
    pub fn power_state(&self, id: &DeviceId) -> Result<PowerState> {
        Ok(self.record(id)?.power_state)
    }

    pub fn is_active(&self, id: &DeviceId) -> Result<bool> {
        Ok(self.power_state(id)?.is_live())
    }

    pub fn is_simulating(&self, id: &DeviceId) -> bool {
        self.registry.contains(id)
    }

    pub fn is_on(&self, id: &DeviceId) -> Result<bool> {
        Ok(self.power_state(id)? == PowerState::On)
    }

    pub fn is_off(&self, id: &DeviceId) -> Result<bool> {
        Ok(self.power_state(id)? == PowerState::Off)
    }

    /// Live power and accumulated energy, `None` when not simulating.
    pub fn get_measurements(&self, id: &DeviceId) -> Option<Measurements> {
        self.registry.get(id).map(|h| h.measurements())
    }

    /// Like [`LifecycleManager::get_measurements`], but checks the record first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `NotActive` when the record is INACTIVE.
    pub fn checked_measurements(&self, id: &DeviceId) -> Result<Option<Measurements>> {
        if self.record(id)?.power_state == PowerState::Inactive {
            return Err(SimError::NotActive(id.clone()));
        }
        Ok(self.get_measurements(id))
    }

    /// Records that are live and have a running simulation, ordered by id.
    pub fn active_devices(&self) -> Result<Vec<DeviceRecord>> {
        let mut active = Vec::new();
        for state in PowerState::LIVE {
            active.extend(
                self.store
                    .find_by_state(state)?
                    .into_iter()
                    .filter(|r| self.registry.contains(&r.device_id)),
            );
        }
        active.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(active)
    }

    /// Number of live records without a handle, i.e. what recovery would restart.
    pub fn interrupted_simulations(&self) -> Result<usize> {
        let mut count = 0;
        for state in PowerState::LIVE {
            count += self
                .store
                .find_by_state(state)?
                .iter()
                .filter(|r| !self.registry.contains(&r.device_id))
                .count();
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::devices::ModelCatalog;
    use crate::store::{ConsumptionRecord, MemoryStore};

    /// Store that stalls while writing one particular power state.
    struct SlowStore {
        inner: MemoryStore,
        slow_state: PowerState,
        delay: Duration,
    }

    impl DeviceStore for SlowStore {
        fn create(&self, record: DeviceRecord) -> Result<DeviceId> {
            self.inner.create(record)
        }

        fn get(&self, id: &DeviceId) -> Result<Option<DeviceRecord>> {
            self.inner.get(id)
        }

        fn set_power_state(&self, id: &DeviceId, state: PowerState) -> Result<()> {
            if state == self.slow_state {
                thread::sleep(self.delay);
            }
            self.inner.set_power_state(id, state)
        }

        fn update_model(
            &self,
            id: &DeviceId,
            device_name: &str,
            model: DeviceModelSpec,
        ) -> Result<()> {
            self.inner.update_model(id, device_name, model)
        }

        fn append_consumption(&self, id: &DeviceId, record: ConsumptionRecord) -> Result<()> {
            self.inner.append_consumption(id, record)
        }

        fn find_by_state(&self, state: PowerState) -> Result<Vec<DeviceRecord>> {
            self.inner.find_by_state(state)
        }

        fn consumption_history(&self, id: &DeviceId) -> Result<Vec<ConsumptionRecord>> {
            self.inner.consumption_history(id)
        }

        fn delete(&self, id: &DeviceId) -> Result<bool> {
            self.inner.delete(id)
        }
    }

    fn slow_manager(records: Vec<DeviceRecord>, slow_state: PowerState) -> Arc<LifecycleManager> {
        Arc::new(LifecycleManager::new(
            Arc::new(SimulationRegistry::new()),
            Arc::new(SlowStore {
                inner: MemoryStore::with_records(records),
                slow_state,
                delay: Duration::from_millis(200),
            }),
            Arc::new(ModelCatalog::new()),
        ))
    }

    /// Registry membership must agree with the record being live.
    fn assert_consistent(lm: &LifecycleManager, id: &DeviceId) {
        let live = lm.is_active(id).expect("state");
        assert_eq!(
            lm.is_simulating(id),
            live,
            "record live={live} but simulating={}",
            lm.is_simulating(id)
        );
    }

    fn manager(records: Vec<DeviceRecord>) -> LifecycleManager {
        LifecycleManager::new(
            Arc::new(SimulationRegistry::new()),
            Arc::new(MemoryStore::with_records(records)),
            Arc::new(ModelCatalog::new()),
        )
    }

    fn lamp(id: &str, state: PowerState) -> DeviceRecord {
        DeviceRecord::new(
            "lamp",
            Some(DeviceModelSpec::new("Lamp", ModelParams::new())),
        )
        .with_id(id)
        .with_state(state)
    }

    #[test]
    fn start_promotes_inactive_record() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        let (_, t) = lm
            .start_simulation(&id, "Lamp", &ModelParams::new())
            .expect("start");
        assert_eq!(t, Transition::Started);
        assert_eq!(lm.power_state(&id).expect("state"), PowerState::Active);
        assert!(lm.is_simulating(&id));
    }

    #[test]
    fn start_twice_returns_same_handle() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        let (a, _) = lm
            .start_simulation(&id, "Lamp", &ModelParams::new())
            .expect("start");
        let (b, t) = lm
            .start_simulation(&id, "Lamp", &ModelParams::new())
            .expect("start");
        assert_eq!(t, Transition::AlreadyRunning);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn failed_initialization_registers_nothing() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        let err = lm.start_simulation(&id, "Toaster", &ModelParams::new());
        assert!(matches!(err, Err(SimError::Initialization { .. })));
        assert!(!lm.is_simulating(&id));
        assert_eq!(lm.power_state(&id).expect("state"), PowerState::Inactive);
    }

    #[test]
    fn start_unknown_device_is_not_found() {
        let lm = manager(vec![]);
        let err = lm.start_simulation(&DeviceId::from("ghost"), "Lamp", &ModelParams::new());
        assert!(matches!(err, Err(SimError::NotFound(_))));
    }

    #[test]
    fn turn_on_requires_simulation() {
        let lm = manager(vec![lamp("d1", PowerState::Active)]);
        let err = lm.turn_on(&DeviceId::from("d1"));
        assert!(matches!(err, Err(SimError::NotSimulating(_))));
    }

    #[test]
    fn activate_is_idempotent_and_resynchronizes() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        assert_eq!(lm.activate(&id).expect("activate"), Transition::Activated);
        assert_eq!(
            lm.activate(&id).expect("activate"),
            Transition::AlreadyActivated
        );

        lm.store()
            .set_power_state(&id, PowerState::Inactive)
            .expect("force lagging record");
        assert_eq!(
            lm.activate(&id).expect("activate"),
            Transition::Resynchronized
        );
        assert!(lm.is_active(&id).expect("active"));
    }

    #[test]
    fn activate_without_model_is_initialization_error() {
        let lm = manager(vec![DeviceRecord::new("bare", None).with_id("d1")]);
        let err = lm.activate(&DeviceId::from("d1"));
        assert!(matches!(err, Err(SimError::Initialization { .. })));
    }

    #[test]
    fn deactivate_removes_handle_then_record() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        lm.activate(&id).expect("activate");
        assert_eq!(lm.deactivate(&id).expect("deactivate"), Transition::Deactivated);
        assert!(lm.get_measurements(&id).is_none());
        assert_eq!(lm.power_state(&id).expect("state"), PowerState::Inactive);
        assert_eq!(
            lm.deactivate(&id).expect("deactivate"),
            Transition::AlreadyDeactivated
        );
    }

    #[test]
    fn interrupted_counts_live_records_without_handles() {
        let lm = manager(vec![
            lamp("a", PowerState::Active),
            lamp("b", PowerState::On),
            lamp("c", PowerState::Inactive),
        ]);
        assert_eq!(lm.interrupted_simulations().expect("count"), 2);
        lm.activate(&DeviceId::from("a")).expect("activate");
        assert_eq!(lm.interrupted_simulations().expect("count"), 1);
    }

    #[test]
    fn delete_stops_and_removes_record() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        lm.activate(&id).expect("activate");
        lm.delete_device(&id).expect("delete");
        assert!(!lm.is_simulating(&id));
        assert!(matches!(lm.power_state(&id), Err(SimError::NotFound(_))));
        assert!(matches!(lm.delete_device(&id), Err(SimError::NotFound(_))));
    }

    #[test]
    fn turn_on_racing_deactivate_keeps_record_and_registry_in_step() {
        let lm = slow_manager(vec![lamp("d1", PowerState::Active)], PowerState::On);
        let id = DeviceId::from("d1");
        lm.activate(&id).expect("activate");

        let switcher = {
            let lm = Arc::clone(&lm);
            let id = id.clone();
            thread::spawn(move || lm.turn_on(&id))
        };
        thread::sleep(Duration::from_millis(50));
        let deactivated = lm.deactivate(&id);
        let switched = switcher.join().expect("switch thread");

        assert_eq!(switched.expect("turn on"), Transition::TurnedOn);
        assert_eq!(deactivated.expect("deactivate"), Transition::Deactivated);
        assert_eq!(lm.power_state(&id).expect("state"), PowerState::Inactive);
        assert_consistent(&lm, &id);
    }

    #[test]
    fn start_racing_deactivate_keeps_record_and_registry_in_step() {
        let lm = slow_manager(vec![lamp("d1", PowerState::Inactive)], PowerState::Active);
        let id = DeviceId::from("d1");

        let starter = {
            let lm = Arc::clone(&lm);
            let id = id.clone();
            thread::spawn(move || {
                lm.start_simulation(&id, "Lamp", &ModelParams::new())
                    .map(|(_, t)| t)
            })
        };
        thread::sleep(Duration::from_millis(50));
        let deactivated = lm.deactivate(&id);
        let started = starter.join().expect("start thread");

        assert_eq!(started.expect("start"), Transition::Started);
        assert_eq!(deactivated.expect("deactivate"), Transition::Deactivated);
        assert_consistent(&lm, &id);
    }

    #[test]
    fn switching_inactive_device_is_not_active() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        assert!(matches!(lm.turn_on(&id), Err(SimError::NotActive(_))));
        assert!(matches!(lm.turn_off(&id), Err(SimError::NotActive(_))));
        assert!(matches!(
            lm.checked_measurements(&id),
            Err(SimError::NotActive(_))
        ));
        assert!(matches!(
            lm.turn_on(&DeviceId::from("ghost")),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn checked_measurements_absent_when_live_but_stopped() {
        let lm = manager(vec![lamp("d1", PowerState::Off)]);
        let id = DeviceId::from("d1");
        assert_eq!(lm.checked_measurements(&id).expect("live record"), None);
        lm.activate(&id).expect("activate");
        assert!(lm.checked_measurements(&id).expect("live record").is_some());
    }

    #[test]
    fn create_device_starts_and_turns_on() {
        let lm = manager(vec![]);
        let record = lm.create_device(lamp("new", PowerState::Off)).expect("create");
        let id = record.device_id.clone();
        assert_eq!(record.power_state, PowerState::On);
        let handle = lm.registry().get(&id).expect("simulating");
        assert!(handle.is_on());
        assert!(handle.just_turned_on());
    }

    #[test]
    fn create_device_with_bad_model_leaves_no_record() {
        let lm = manager(vec![]);
        let bad = DeviceRecord::new(
            "toaster",
            Some(DeviceModelSpec::new("Toaster", ModelParams::new())),
        )
        .with_id("t1");
        assert!(matches!(
            lm.create_device(bad),
            Err(SimError::Initialization { .. })
        ));
        assert!(matches!(
            lm.power_state(&DeviceId::from("t1")),
            Err(SimError::NotFound(_))
        ));
        let bare = DeviceRecord::new("bare", None);
        assert!(matches!(
            lm.create_device(bare),
            Err(SimError::Initialization { .. })
        ));
    }

    #[test]
    fn update_model_restarts_with_fresh_epoch() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        lm.activate(&id).expect("activate");
        lm.turn_on(&id).expect("on");
        let old = lm.registry().get(&id).expect("simulating");
        old.step(1.0).expect("step");
        assert!(old.measurements().energy_kwh > 0.0);

        let heater = DeviceModelSpec::new("Heater", ModelParams::new());
        assert_eq!(
            lm.update_model(&id, "heater", heater.clone()).expect("update"),
            Transition::ModelUpdated
        );

        let new = lm.registry().get(&id).expect("restarted");
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(new.model_name(), "Heater");
        assert_eq!(new.measurements().energy_kwh, 0.0);
        assert!(new.is_on());
        let record = lm.store().get(&id).expect("get").expect("present");
        assert_eq!(record.model, Some(heater));
        assert_eq!(record.power_state, PowerState::On);
    }

    #[test]
    fn update_model_rejects_bad_model_without_stopping() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        lm.activate(&id).expect("activate");
        let err = lm.update_model(
            &id,
            "lamp",
            DeviceModelSpec::new("Toaster", ModelParams::new()),
        );
        assert!(matches!(err, Err(SimError::Initialization { .. })));
        assert!(lm.is_simulating(&id));
    }

    #[test]
    fn update_model_of_inactive_device_only_rewrites_record() {
        let lm = manager(vec![lamp("d1", PowerState::Inactive)]);
        let id = DeviceId::from("d1");
        lm.update_model(&id, "fridge", DeviceModelSpec::new("Fridge", ModelParams::new()))
            .expect("update");
        assert!(!lm.is_simulating(&id));
        assert_eq!(lm.power_state(&id).expect("state"), PowerState::Inactive);
    }

    #[test]
    fn active_devices_are_live_and_simulating() {
        let lm = manager(vec![
            lamp("a", PowerState::Active),
            lamp("b", PowerState::On),
            lamp("c", PowerState::Off),
            lamp("d", PowerState::Inactive),
        ]);
        lm.activate(&DeviceId::from("b")).expect("activate");
        lm.activate(&DeviceId::from("c")).expect("activate");
        let ids: Vec<String> = lm
            .active_devices()
            .expect("list")
            .into_iter()
            .map(|r| r.device_id.to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
