//! Durable device records and the store contract the simulation core talks to.
//!
//! The core never touches records directly; every read and write goes
//! through [`DeviceStore`]. [`MemoryStore`] is the in-process implementation
//! used by the binary and the tests.

mod memory;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::devices::ModelParams;
use crate::error::Result;

pub use memory::MemoryStore;

/// Unique device identity, the key of both the store and the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier (hex UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Persisted power state of a device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// Not simulating; the registry holds no handle.
    Inactive,
    /// Simulating, never switched or not yet switched on.
    Active,
    /// Simulating and switched on.
    On,
    /// Simulating and switched off.
    Off,
}

impl PowerState {
    /// All states that imply a live simulation handle.
    pub const LIVE: [PowerState; 3] = [PowerState::Active, PowerState::On, PowerState::Off];

    /// Whether the state implies the device should be simulating.
    pub fn is_live(self) -> bool {
        self != PowerState::Inactive
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::Inactive => "INACTIVE",
            PowerState::Active => "ACTIVE",
            PowerState::On => "ON",
            PowerState::Off => "OFF",
        };
        f.write_str(s)
    }
}

/// Model attached to a device: catalog name plus parameter overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceModelSpec {
    pub model_name: String,
    #[serde(default)]
    pub params: ModelParams,
}

impl DeviceModelSpec {
    pub fn new(model_name: impl Into<String>, params: ModelParams) -> Self {
        Self {
            model_name: model_name.into(),
            params,
        }
    }
}

/// Durable device record. Consumption history lives beside it in the store
/// and is read through [`DeviceStore::consumption_history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub device_name: String,
    pub power_state: PowerState,
    /// `None` until a model has been attached.
    pub model: Option<DeviceModelSpec>,
}

impl DeviceRecord {
    /// Creates an INACTIVE record with a freshly generated id.
    pub fn new(device_name: impl Into<String>, model: Option<DeviceModelSpec>) -> Self {
        Self {
            device_id: DeviceId::generate(),
            device_name: device_name.into(),
            power_state: PowerState::Inactive,
            model,
        }
    }

    pub fn with_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.device_id = id.into();
        self
    }

    pub fn with_state(mut self, state: PowerState) -> Self {
        self.power_state = state;
        self
    }
}

/// One snapshot of a device's measurements, appended by the persistence writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    /// Live power at snapshot time (W).
    pub power_w: f64,
    /// Energy accumulated by the current handle (kWh).
    pub energy_kwh: f64,
    /// Power status of the handle at snapshot time.
    pub powered_on: bool,
    pub timestamp: DateTime<Utc>,
}

/// Durable record store collaborator.
///
/// Implementations must be safe to call from the scheduler threads and
/// request handlers at the same time.
pub trait DeviceStore: Send + Sync {
    /// Stores a new record and returns its id.
    ///
    /// Fails with `Store` when the id is already taken.
    fn create(&self, record: DeviceRecord) -> Result<DeviceId>;

    /// Fetches a record, `Ok(None)` when the id is unknown.
    fn get(&self, id: &DeviceId) -> Result<Option<DeviceRecord>>;

    /// Overwrites the persisted power state.
    ///
    /// Fails with `NotFound` when the id is unknown.
    fn set_power_state(&self, id: &DeviceId, state: PowerState) -> Result<()>;

    /// Renames the device and replaces its model.
    ///
    /// Fails with `NotFound` when the id is unknown.
    fn update_model(&self, id: &DeviceId, device_name: &str, model: DeviceModelSpec) -> Result<()>;

    /// Appends one consumption record to the device's history.
    fn append_consumption(&self, id: &DeviceId, record: ConsumptionRecord) -> Result<()>;

    /// Lists all records in the given state, ordered by id.
    fn find_by_state(&self, state: PowerState) -> Result<Vec<DeviceRecord>>;

    /// Returns the full consumption history of a device, oldest first.
    fn consumption_history(&self, id: &DeviceId) -> Result<Vec<ConsumptionRecord>>;

    /// Deletes a record together with its history. Returns whether it existed.
    fn delete(&self, id: &DeviceId) -> Result<bool>;
}
