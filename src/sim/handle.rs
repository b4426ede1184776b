//! Per-device simulation handle: one model instance, its control vector,
//! and its accumulators.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::devices::{CONTROL_INPUT, ControlVector, POWER_OUTPUT, PhysicalModel};
use crate::error::{Result, SimError};
use crate::store::DeviceId;

/// Watt-seconds to kilowatt-hours.
pub const WS_TO_KWH: f64 = 1.0 / 3_600_000.0;

/// Caller-facing snapshot of a handle's readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurements {
    /// Power reported by the latest successful step (W).
    pub power_w: f64,
    /// Energy accumulated since the handle was created (kWh).
    pub energy_kwh: f64,
    /// Whether the control vector currently commands the device on.
    pub powered_on: bool,
}

/// What a single successful step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub power_w: f64,
    /// The model was cold-started before this step.
    pub reinitialized: bool,
}

/// Control side, written by lifecycle calls and read once per tick.
#[derive(Debug)]
struct ControlState {
    vector: ControlVector,
    powered_on: bool,
    /// Set by an OFF→ON transition, consumed by the next step.
    just_turned_on: bool,
}

/// Stepping side, touched only by the tick and by measurement reads.
struct ModelRuntime {
    model: Box<dyn PhysicalModel>,
    t: f64,
    live_power_w: f64,
    energy_kwh: f64,
    steps: u64,
    cold_starts: u64,
}

/// Runtime object owning one device's model.
///
/// The control vector and the stepping state sit behind separate locks, so a
/// lifecycle call switching the device never waits on a slow model step. A
/// step reads the control vector once at its start; changes arriving later
/// take effect on the following tick.
pub struct SimulationHandle {
    device_id: DeviceId,
    model_name: &'static str,
    control: Mutex<ControlState>,
    runtime: Mutex<ModelRuntime>,
}

impl SimulationHandle {
    /// Wraps a freshly initialized model. The device starts OFF with every
    /// model input at zero and an empty energy accumulator.
    pub fn new(device_id: DeviceId, model: Box<dyn PhysicalModel>) -> Self {
        let vector = ControlVector::zeros(model.inputs());
        Self {
            device_id,
            model_name: model.model_name(),
            control: Mutex::new(ControlState {
                vector,
                powered_on: false,
                just_turned_on: false,
            }),
            runtime: Mutex::new(ModelRuntime {
                model,
                t: 0.0,
                live_power_w: 0.0,
                energy_kwh: 0.0,
                steps: 0,
                cold_starts: 0,
            }),
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    fn control_state(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime(&self) -> MutexGuard<'_, ModelRuntime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the control vector.
    ///
    /// An OFF→ON transition arms a one-shot cold start for the next step;
    /// switching OFF disarms it; ON→ON leaves it as it was.
    pub fn set_control(&self, vector: ControlVector) {
        let mut control = self.control_state();
        let now_on = vector.is_on();
        if now_on && !control.powered_on {
            control.just_turned_on = true;
        } else if !now_on {
            control.just_turned_on = false;
        }
        control.powered_on = now_on;
        control.vector = vector;
    }

    /// Sets the on/off command, keeping any other inputs.
    pub fn set_command(&self, on: bool) {
        let mut vector = self.control();
        vector.set(CONTROL_INPUT, if on { 1.0 } else { 0.0 });
        self.set_control(vector);
    }

    pub fn control(&self) -> ControlVector {
        self.control_state().vector.clone()
    }

    pub fn is_on(&self) -> bool {
        self.control_state().powered_on
    }

    /// Whether the next step will cold-start the model.
    pub fn just_turned_on(&self) -> bool {
        self.control_state().just_turned_on
    }

    /// Advances the model by `dt` seconds using the current control vector.
    ///
    /// The simulated-time cursor advances even when the model fails, in which
    /// case the previous readings are kept.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Step` when the model fails or reports no usable
    /// power output.
    pub fn step(&self, dt: f64) -> Result<StepReport> {
        let (vector, reinitialize) = {
            let mut control = self.control_state();
            let reinit = std::mem::take(&mut control.just_turned_on);
            (control.vector.clone(), reinit)
        };

        let mut rt = self.runtime();
        if reinitialize {
            rt.model.reset();
            rt.cold_starts += 1;
            debug!(device_id = %self.device_id, "cold-start reinitialization");
        }

        let t = rt.t;
        rt.t += dt;
        let outputs = rt.model.step(t, dt, &vector)?;
        let power_w = outputs
            .get(POWER_OUTPUT)
            .copied()
            .filter(|p| p.is_finite())
            .ok_or_else(|| {
                SimError::Step(format!(
                    "model {} produced no finite \"{POWER_OUTPUT}\" output",
                    self.model_name
                ))
            })?;

        rt.live_power_w = power_w;
        rt.energy_kwh += power_w.max(0.0) * dt * WS_TO_KWH;
        rt.steps += 1;

        Ok(StepReport {
            power_w,
            reinitialized: reinitialize,
        })
    }

    pub fn measurements(&self) -> Measurements {
        let powered_on = self.is_on();
        let rt = self.runtime();
        Measurements {
            power_w: rt.live_power_w,
            energy_kwh: rt.energy_kwh,
            powered_on,
        }
    }

    /// Simulated-time cursor (s since the handle was created).
    pub fn sim_time(&self) -> f64 {
        self.runtime().t
    }

    /// Number of successful steps.
    pub fn steps(&self) -> u64 {
        self.runtime().steps
    }

    /// Number of cold-start reinitializations performed.
    pub fn cold_starts(&self) -> u64 {
        self.runtime().cold_starts
    }
}

impl fmt::Debug for SimulationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationHandle")
            .field("device_id", &self.device_id)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}
