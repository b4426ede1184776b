//! TOML-based service configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::devices::{ModelCatalog, ModelParams};
use crate::sim::SchedulerSettings;
use crate::sim::cadence::Pacing;
use crate::store::{DeviceModelSpec, DeviceRecord, PowerState};

/// Top-level service configuration parsed from TOML.
///
/// All fields have defaults. Load from TOML with
/// [`ServiceConfig::from_toml_file`] or use [`ServiceConfig::demo`] for
/// the built-in example fleet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Tick loop timing.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Consumption snapshot timing.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Log filter.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// REST API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Device records seeded into the in-memory store at start-up.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Tick loop timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Wall-clock period between ticks in milliseconds (must be > 0).
    pub tick_interval_ms: u64,
    /// Simulated seconds advanced per tick (must be > 0).
    pub dt_seconds: f64,
    /// `"corrected"` subtracts tick duration from the wait; `"fixed"` does not.
    pub pacing: Pacing,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            dt_seconds: 1.0,
            pacing: Pacing::Corrected,
        }
    }
}

impl SchedulerConfig {
    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            dt_seconds: self.dt_seconds,
            pacing: self.pacing,
        }
    }
}

/// Consumption snapshot timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceConfig {
    /// Seconds between consumption snapshots (must be > 0).
    pub interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl PersistenceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Log filter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` env-filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// REST API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// One device record to seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Fixed id; generated when omitted.
    #[serde(default)]
    pub device_id: Option<String>,
    pub device_name: String,
    #[serde(default = "default_power_state")]
    pub power_state: PowerState,
    /// Catalog model name; the device cannot simulate without one.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub params: ModelParams,
}

fn default_power_state() -> PowerState {
    PowerState::Inactive
}

impl DeviceConfig {
    fn new(id: &str, name: &str, state: PowerState, model: &str, params: &[(&str, f64)]) -> Self {
        Self {
            device_id: Some(id.to_string()),
            device_name: name.to_string(),
            power_state: state,
            model: Some(model.to_string()),
            params: params.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        }
    }

    /// Converts into a store record.
    pub fn to_record(&self) -> DeviceRecord {
        let model = self
            .model
            .as_ref()
            .map(|name| DeviceModelSpec::new(name.clone(), self.params.clone()));
        let record =
            DeviceRecord::new(self.device_name.clone(), model).with_state(self.power_state);
        match &self.device_id {
            Some(id) => record.with_id(id.as_str()),
            None => record,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"scheduler.tick_interval_ms"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ServiceConfig {
    /// Returns the demo preset: a small household fleet in mixed states.
    pub fn demo() -> Self {
        Self {
            devices: vec![
                DeviceConfig::new(
                    "lamp-1",
                    "Living room lamp",
                    PowerState::On,
                    "Lamp",
                    &[("rated_power_w", 60.0)],
                ),
                DeviceConfig::new(
                    "heater-1",
                    "Bedroom heater",
                    PowerState::On,
                    "Heater",
                    &[("setpoint_c", 20.0)],
                ),
                DeviceConfig::new("fridge-1", "Kitchen fridge", PowerState::Off, "Fridge", &[]),
                DeviceConfig::new("lamp-2", "Porch lamp", PowerState::Inactive, "Lamp", &[]),
            ],
            ..Self::default()
        }
    }

    /// Returns the empty preset: default timing and no devices.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "empty"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "empty" => Ok(Self::empty()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields against the model catalog and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self, catalog: &ModelCatalog) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.scheduler;
        if s.tick_interval_ms == 0 {
            errors.push(ConfigError {
                field: "scheduler.tick_interval_ms".into(),
                message: "must be > 0".into(),
            });
        }
        if !(s.dt_seconds.is_finite() && s.dt_seconds > 0.0) {
            errors.push(ConfigError {
                field: "scheduler.dt_seconds".into(),
                message: "must be a finite number > 0".into(),
            });
        }
        if self.persistence.interval_secs == 0 {
            errors.push(ConfigError {
                field: "persistence.interval_secs".into(),
                message: "must be > 0".into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for (i, d) in self.devices.iter().enumerate() {
            if let Some(id) = &d.device_id {
                if id.is_empty() {
                    errors.push(ConfigError {
                        field: format!("devices[{i}].device_id"),
                        message: "must not be empty".into(),
                    });
                } else if !seen.insert(id.as_str()) {
                    errors.push(ConfigError {
                        field: format!("devices[{i}].device_id"),
                        message: format!("duplicate id \"{id}\""),
                    });
                }
            }
            match &d.model {
                Some(name) => match catalog.find(name) {
                    Some(spec) => {
                        if let Err(e) = spec.resolve(&d.params) {
                            errors.push(ConfigError {
                                field: format!("devices[{i}].params"),
                                message: e.to_string(),
                            });
                        }
                    }
                    None => errors.push(ConfigError {
                        field: format!("devices[{i}].model"),
                        message: format!("unknown model \"{name}\""),
                    }),
                },
                None if d.power_state.is_live() => errors.push(ConfigError {
                    field: format!("devices[{i}].model"),
                    message: format!("required when power_state is {}", d.power_state),
                }),
                None => {}
            }
        }

        errors
    }

    /// Store records for every configured device.
    pub fn device_records(&self) -> Vec<DeviceRecord> {
        self.devices.iter().map(DeviceConfig::to_record).collect()
    }
}
