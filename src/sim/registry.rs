//! Shared registry of live simulation handles.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use super::handle::SimulationHandle;
use crate::store::DeviceId;

/// Result of [`SimulationRegistry::put`].
#[derive(Debug, Clone)]
pub enum Insertion {
    /// The handle was stored.
    Inserted(Arc<SimulationHandle>),
    /// An entry already existed; it is returned unchanged and the offered
    /// handle is dropped.
    AlreadyPresent(Arc<SimulationHandle>),
}

impl Insertion {
    /// The handle now registered for the id.
    pub fn handle(&self) -> &Arc<SimulationHandle> {
        match self {
            Insertion::Inserted(h) | Insertion::AlreadyPresent(h) => h,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, Insertion::Inserted(_))
    }
}

/// Mapping from device id to its single live [`SimulationHandle`].
///
/// Sole source of truth for "is this device simulating right now". One
/// coarse `RwLock` serializes mutation against everything else; reads and
/// snapshots share it. Handles are reference counted, so a caller holding
/// one can keep using it after the entry is removed.
///
/// # Examples
///
/// ```
/// use fleet_sim::devices::Lamp;
/// use fleet_sim::sim::{SimulationHandle, SimulationRegistry};
/// use fleet_sim::store::DeviceId;
///
/// let registry = SimulationRegistry::new();
/// let id = DeviceId::from("d1");
/// let first = registry.put(SimulationHandle::new(id.clone(), Box::new(Lamp::new(60.0))));
/// let second = registry.put(SimulationHandle::new(id.clone(), Box::new(Lamp::new(60.0))));
/// assert!(first.was_inserted());
/// assert!(!second.was_inserted());
/// assert_eq!(registry.count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SimulationRegistry {
    handles: RwLock<HashMap<DeviceId, Arc<SimulationHandle>>>,
}

impl SimulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &DeviceId) -> Option<Arc<SimulationHandle>> {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.get(id).cloned()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
        handles.contains_key(id)
    }

    /// Registers a handle under its device id unless one is already present.
    pub fn put(&self, handle: SimulationHandle) -> Insertion {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        match handles.entry(handle.device_id().clone()) {
            Entry::Occupied(existing) => Insertion::AlreadyPresent(Arc::clone(existing.get())),
            Entry::Vacant(slot) => Insertion::Inserted(Arc::clone(slot.insert(Arc::new(handle)))),
        }
    }

    /// Removes and returns the handle; removing an absent id is a no-op.
    pub fn remove(&self, id: &DeviceId) -> Option<Arc<SimulationHandle>> {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        handles.remove(id)
    }

    /// Point-in-time copy of the registered ids, sorted.
    pub fn snapshot_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = {
            let handles = self.handles.read().unwrap_or_else(PoisonError::into_inner);
            handles.keys().cloned().collect()
        };
        ids.sort();
        ids
    }

    pub fn count(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drops every handle. Returns how many were registered.
    pub fn clear(&self) -> usize {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        let n = handles.len();
        handles.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::devices::Lamp;

    fn handle(id: &str) -> SimulationHandle {
        SimulationHandle::new(DeviceId::from(id), Box::new(Lamp::new(60.0)))
    }

    #[test]
    fn put_keeps_existing_handle() {
        let registry = SimulationRegistry::new();
        let first = registry.put(handle("d1"));
        let second = registry.put(handle("d1"));
        assert!(Arc::ptr_eq(first.handle(), second.handle()));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let registry = SimulationRegistry::new();
        assert!(registry.remove(&DeviceId::from("ghost")).is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let registry = SimulationRegistry::new();
        registry.put(handle("b"));
        registry.put(handle("a"));
        let snapshot = registry.snapshot_ids();
        registry.remove(&DeviceId::from("a"));
        assert_eq!(snapshot, vec![DeviceId::from("a"), DeviceId::from("b")]);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn removed_handle_stays_usable_by_holder() {
        let registry = SimulationRegistry::new();
        let held = Arc::clone(registry.put(handle("d1")).handle());
        registry.remove(&DeviceId::from("d1"));
        held.set_command(true);
        assert!(held.step(1.0).is_ok());
        assert!(registry.get(&DeviceId::from("d1")).is_none());
    }

    #[test]
    fn concurrent_puts_register_one_handle() {
        let registry = Arc::new(SimulationRegistry::new());
        let workers: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.put(handle("d1")).was_inserted())
            })
            .collect();
        let inserted = workers
            .into_iter()
            .map(|w| w.join().expect("worker panicked"))
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(registry.count(), 1);
    }
}
