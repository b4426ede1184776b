use super::catalog::{ModelSpec, ParamSpec, ResolvedParams};
use super::types::{ControlVector, ModelOutputs, POWER_OUTPUT, PhysicalModel};
use crate::error::{Result, SimError};

/// Name of the room temperature output (°C).
pub const ROOM_TEMP_OUTPUT: &str = "room_c";

/// A thermostatic space heater warming a single lumped thermal mass.
///
/// While commanded on, the element switches with a hysteresis band around
/// the setpoint. Room temperature follows a first-order model:
/// `C dT/dt = P - k (T - T_ambient)`.
#[derive(Debug, Clone)]
pub struct Heater {
    /// Element power in watts.
    pub rated_power_w: f64,
    /// Thermostat setpoint (°C).
    pub setpoint_c: f64,
    /// Half-width of the thermostat band (°C).
    pub hysteresis_c: f64,
    /// Outdoor temperature the room relaxes towards (°C).
    pub ambient_c: f64,
    /// Heat capacity of the room (J/K).
    heat_capacity_j_per_k: f64,
    /// Envelope loss coefficient (W/K).
    loss_w_per_k: f64,
    room_c: f64,
    heating: bool,
}

impl Heater {
    pub const SPEC: ModelSpec = ModelSpec {
        name: "Heater",
        description: "Thermostatic space heater with first-order room model",
        params: &[
            ParamSpec {
                name: "rated_power_w",
                default: 2000.0,
                min: 100.0,
                max: 10000.0,
            },
            ParamSpec {
                name: "setpoint_c",
                default: 21.0,
                min: 5.0,
                max: 35.0,
            },
            ParamSpec {
                name: "hysteresis_c",
                default: 0.5,
                min: 0.0,
                max: 5.0,
            },
            ParamSpec {
                name: "ambient_c",
                default: 10.0,
                min: -40.0,
                max: 45.0,
            },
            ParamSpec {
                name: "heat_capacity_kj_per_k",
                default: 1500.0,
                min: 10.0,
                max: 100000.0,
            },
            ParamSpec {
                name: "loss_w_per_k",
                default: 60.0,
                min: 1.0,
                max: 2000.0,
            },
        ],
        build: Heater::boxed,
    };

    /// Creates a heater whose room starts at ambient temperature.
    pub fn new(
        rated_power_w: f64,
        setpoint_c: f64,
        hysteresis_c: f64,
        ambient_c: f64,
        heat_capacity_kj_per_k: f64,
        loss_w_per_k: f64,
    ) -> Self {
        Self {
            rated_power_w,
            setpoint_c,
            hysteresis_c,
            ambient_c,
            heat_capacity_j_per_k: heat_capacity_kj_per_k * 1000.0,
            loss_w_per_k,
            room_c: ambient_c,
            heating: false,
        }
    }

    fn boxed(p: &ResolvedParams) -> Box<dyn PhysicalModel> {
        Box::new(Self::new(
            p.get("rated_power_w"),
            p.get("setpoint_c"),
            p.get("hysteresis_c"),
            p.get("ambient_c"),
            p.get("heat_capacity_kj_per_k"),
            p.get("loss_w_per_k"),
        ))
    }

    /// Current room temperature (°C).
    pub fn room_c(&self) -> f64 {
        self.room_c
    }
}

impl PhysicalModel for Heater {
    fn model_name(&self) -> &'static str {
        Self::SPEC.name
    }

    fn reset(&mut self) {
        self.room_c = self.ambient_c;
        self.heating = false;
    }

    fn step(&mut self, _t: f64, dt: f64, control: &ControlVector) -> Result<ModelOutputs> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::Step(format!("invalid time window dt={dt}")));
        }

        if !control.is_on() {
            self.heating = false;
        } else if self.room_c < self.setpoint_c - self.hysteresis_c {
            self.heating = true;
        } else if self.room_c > self.setpoint_c + self.hysteresis_c {
            self.heating = false;
        }

        let power_w = if self.heating { self.rated_power_w } else { 0.0 };
        // Exact solution of C dT/dt = P - k (T - T_amb) with P held over the
        // window; stable for any dt.
        let equilibrium_c = self.ambient_c + power_w / self.loss_w_per_k;
        let decay = (-self.loss_w_per_k * dt / self.heat_capacity_j_per_k).exp();
        self.room_c = equilibrium_c + (self.room_c - equilibrium_c) * decay;

        Ok(ModelOutputs::from([
            (POWER_OUTPUT, power_w),
            (ROOM_TEMP_OUTPUT, self.room_c),
        ]))
    }
}
