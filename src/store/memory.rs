use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::{
    ConsumptionRecord, DeviceId, DeviceModelSpec, DeviceRecord, DeviceStore, PowerState,
};
use crate::error::{Result, SimError};

#[derive(Debug, Default)]
struct Tables {
    devices: BTreeMap<DeviceId, DeviceRecord>,
    consumption: BTreeMap<DeviceId, Vec<ConsumptionRecord>>,
}

/// In-process [`DeviceStore`] backed by ordered maps behind one `RwLock`.
///
/// # Examples
///
/// ```
/// use fleet_sim::store::{DeviceRecord, DeviceStore, MemoryStore, PowerState};
///
/// let store = MemoryStore::new();
/// let id = store.insert(DeviceRecord::new("lamp", None).with_id("d1"));
/// store.set_power_state(&id, PowerState::Active).unwrap();
/// assert_eq!(store.get(&id).unwrap().unwrap().power_state, PowerState::Active);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with the given records.
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Inserts or replaces a record and returns its id.
    pub fn insert(&self, record: DeviceRecord) -> DeviceId {
        let id = record.device_id.clone();
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.devices.insert(id.clone(), record);
        id
    }

    /// Lists every record, ordered by id.
    pub fn all(&self) -> Vec<DeviceRecord> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.devices.values().cloned().collect()
    }
}

impl DeviceStore for MemoryStore {
    fn create(&self, record: DeviceRecord) -> Result<DeviceId> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let id = record.device_id.clone();
        if tables.devices.contains_key(&id) {
            return Err(SimError::Store(format!("device id \"{id}\" already exists")));
        }
        tables.devices.insert(id.clone(), record);
        Ok(id)
    }

    fn get(&self, id: &DeviceId) -> Result<Option<DeviceRecord>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.devices.get(id).cloned())
    }

    fn set_power_state(&self, id: &DeviceId, state: PowerState) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let record = tables
            .devices
            .get_mut(id)
            .ok_or_else(|| SimError::NotFound(id.clone()))?;
        record.power_state = state;
        Ok(())
    }

    fn update_model(&self, id: &DeviceId, device_name: &str, model: DeviceModelSpec) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let record = tables
            .devices
            .get_mut(id)
            .ok_or_else(|| SimError::NotFound(id.clone()))?;
        record.device_name = device_name.to_string();
        record.model = Some(model);
        Ok(())
    }

    fn append_consumption(&self, id: &DeviceId, record: ConsumptionRecord) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if !tables.devices.contains_key(id) {
            return Err(SimError::NotFound(id.clone()));
        }
        tables.consumption.entry(id.clone()).or_default().push(record);
        Ok(())
    }

    fn find_by_state(&self, state: PowerState) -> Result<Vec<DeviceRecord>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .devices
            .values()
            .filter(|r| r.power_state == state)
            .cloned()
            .collect())
    }

    fn consumption_history(&self, id: &DeviceId) -> Result<Vec<ConsumptionRecord>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        if !tables.devices.contains_key(id) {
            return Err(SimError::NotFound(id.clone()));
        }
        Ok(tables.consumption.get(id).cloned().unwrap_or_default())
    }

    fn delete(&self, id: &DeviceId) -> Result<bool> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.consumption.remove(id);
        Ok(tables.devices.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample(id: &str, state: PowerState) -> DeviceRecord {
        DeviceRecord::new(format!("device {id}"), None)
            .with_id(id)
            .with_state(state)
    }

    fn reading(power_w: f64) -> ConsumptionRecord {
        ConsumptionRecord {
            power_w,
            energy_kwh: 0.0,
            powered_on: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn find_by_state_filters_and_orders_by_id() {
        let store = MemoryStore::with_records([
            sample("c", PowerState::Active),
            sample("a", PowerState::Active),
            sample("b", PowerState::Inactive),
        ]);
        let ids: Vec<String> = store
            .find_by_state(PowerState::Active)
            .expect("query should succeed")
            .into_iter()
            .map(|r| r.device_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn set_power_state_on_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store.set_power_state(&DeviceId::from("ghost"), PowerState::On);
        assert!(matches!(err, Err(SimError::NotFound(_))));
    }

    #[test]
    fn consumption_history_is_kept_in_append_order() {
        let store = MemoryStore::with_records([sample("d1", PowerState::On)]);
        let id = DeviceId::from("d1");
        store.append_consumption(&id, reading(1.0)).expect("append");
        store.append_consumption(&id, reading(2.0)).expect("append");
        let history = store.consumption_history(&id).expect("history");
        assert_eq!(
            history.iter().map(|r| r.power_w).collect::<Vec<_>>(),
            vec![1.0, 2.0]
        );
    }

    #[test]
    fn delete_drops_record_and_history() {
        let store = MemoryStore::with_records([sample("d1", PowerState::On)]);
        let id = DeviceId::from("d1");
        store.append_consumption(&id, reading(1.0)).expect("append");
        assert!(store.delete(&id).expect("delete"));
        assert!(store.get(&id).expect("get").is_none());
        assert!(!store.delete(&id).expect("second delete"));
    }

    #[test]
    fn create_rejects_taken_id() {
        let store = MemoryStore::new();
        let id = store
            .create(sample("d1", PowerState::Inactive))
            .expect("first create");
        assert_eq!(id.as_str(), "d1");
        let err = store.create(sample("d1", PowerState::On));
        assert!(matches!(err, Err(SimError::Store(_))));
        assert_eq!(
            store.get(&id).expect("get").map(|r| r.power_state),
            Some(PowerState::Inactive)
        );
    }

    #[test]
    fn update_model_replaces_name_and_model() {
        let store = MemoryStore::with_records([sample("d1", PowerState::Active)]);
        let id = DeviceId::from("d1");
        let model = DeviceModelSpec::new("Heater", Default::default());
        store
            .update_model(&id, "study heater", model.clone())
            .expect("update");
        let record = store.get(&id).expect("get").expect("present");
        assert_eq!(record.device_name, "study heater");
        assert_eq!(record.model, Some(model));
        assert_eq!(record.power_state, PowerState::Active);

        let err = store.update_model(
            &DeviceId::from("ghost"),
            "x",
            DeviceModelSpec::new("Lamp", Default::default()),
        );
        assert!(matches!(err, Err(SimError::NotFound(_))));
    }

    #[test]
    fn generated_ids_are_unique_hex() {
        let a = DeviceRecord::new("a", None);
        let b = DeviceRecord::new("b", None);
        assert_ne!(a.device_id, b.device_id);
        assert_eq!(a.device_id.as_str().len(), 32);
        assert_eq!(a.power_state, PowerState::Inactive);
    }
}
