use super::catalog::{ModelSpec, ParamSpec, ResolvedParams};
use super::types::{ControlVector, ModelOutputs, POWER_OUTPUT, PhysicalModel};
use crate::error::Result;

/// A purely resistive load drawing its rated power while commanded on.
///
/// The command is treated as a dimming fraction clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Lamp {
    /// Rated power in watts.
    pub rated_power_w: f64,
}

impl Lamp {
    pub const SPEC: ModelSpec = ModelSpec {
        name: "Lamp",
        description: "Resistive lighting load",
        params: &[ParamSpec {
            name: "rated_power_w",
            default: 60.0,
            min: 1.0,
            max: 2000.0,
        }],
        build: Lamp::boxed,
    };

    pub fn new(rated_power_w: f64) -> Self {
        Self { rated_power_w }
    }

    fn boxed(params: &ResolvedParams) -> Box<dyn PhysicalModel> {
        Box::new(Self::new(params.get("rated_power_w")))
    }
}

impl PhysicalModel for Lamp {
    fn model_name(&self) -> &'static str {
        Self::SPEC.name
    }

    fn reset(&mut self) {}

    fn step(&mut self, _t: f64, _dt: f64, control: &ControlVector) -> Result<ModelOutputs> {
        let level = control.command().clamp(0.0, 1.0);
        Ok(ModelOutputs::from([(POWER_OUTPUT, self.rated_power_w * level)]))
    }
}
