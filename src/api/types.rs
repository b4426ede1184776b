//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::devices::{ModelParams, ModelSpec, ParamSpec};
use crate::sim::{Measurements, RecoveryReport, Transition};
use crate::store::{ConsumptionRecord, DeviceId, DeviceModelSpec, DeviceRecord, PowerState};

/// Body of `POST /devices`.
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    /// Explicit id; a random one is generated when absent.
    pub device_id: Option<String>,
    pub device_name: String,
    /// Catalog model name.
    pub model: String,
    #[serde(default)]
    pub params: ModelParams,
}

impl CreateDeviceRequest {
    pub fn into_record(self) -> DeviceRecord {
        let record = DeviceRecord::new(
            self.device_name,
            Some(DeviceModelSpec::new(self.model, self.params)),
        );
        match self.device_id {
            Some(id) => record.with_id(id),
            None => record,
        }
    }
}

/// Body of `PUT /devices/{id}/model`.
#[derive(Debug, Deserialize)]
pub struct UpdateModelRequest {
    pub device_name: String,
    pub model: String,
    #[serde(default)]
    pub params: ModelParams,
}

/// Device record joined with its live simulation status.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub device_id: DeviceId,
    pub device_name: String,
    pub power_state: PowerState,
    /// Attached model name, if any.
    pub model: Option<String>,
    pub model_params: ModelParams,
    /// Whether a simulation handle is registered.
    pub simulating: bool,
    /// Live readings; `null` when not simulating.
    pub measurements: Option<Measurements>,
}

impl DeviceResponse {
    pub fn new(record: DeviceRecord, measurements: Option<Measurements>) -> Self {
        let (model, model_params) = match record.model {
            Some(spec) => (Some(spec.model_name), spec.params),
            None => (None, ModelParams::new()),
        };
        Self {
            device_id: record.device_id,
            device_name: record.device_name,
            power_state: record.power_state,
            model,
            model_params,
            simulating: measurements.is_some(),
            measurements,
        }
    }
}

/// Outcome of a lifecycle call.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub device_id: DeviceId,
    /// Machine-readable outcome, e.g. `"turned_on"` or `"already_running"`.
    pub transition: Transition,
    /// Human-readable outcome.
    pub message: String,
}

impl TransitionResponse {
    pub fn new(device_id: DeviceId, transition: Transition) -> Self {
        Self {
            device_id,
            transition,
            message: transition.to_string(),
        }
    }
}

/// One stored consumption snapshot.
#[derive(Debug, Serialize)]
pub struct ConsumptionEntry {
    pub timestamp: DateTime<Utc>,
    pub power_w: f64,
    pub energy_kwh: f64,
    pub powered_on: bool,
}

impl From<ConsumptionRecord> for ConsumptionEntry {
    fn from(r: ConsumptionRecord) -> Self {
        Self {
            timestamp: r.timestamp,
            power_w: r.power_w,
            energy_kwh: r.energy_kwh,
            powered_on: r.powered_on,
        }
    }
}

/// Count of live records without a running simulation.
#[derive(Debug, Serialize)]
pub struct InterruptedResponse {
    pub interrupted: usize,
}

/// Outcome counts of an on-demand recovery pass.
#[derive(Debug, Serialize)]
pub struct RecoveryResponse {
    pub restored: usize,
    pub turned_on: usize,
    pub already_running: usize,
    pub failed: usize,
}

impl From<RecoveryReport> for RecoveryResponse {
    fn from(r: RecoveryReport) -> Self {
        Self {
            restored: r.restored,
            turned_on: r.turned_on,
            already_running: r.already_running,
            failed: r.failed,
        }
    }
}

/// Catalog entry as listed by `GET /models`.
#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl From<&ModelSpec> for ModelResponse {
    fn from(spec: &ModelSpec) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            params: spec.params,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
