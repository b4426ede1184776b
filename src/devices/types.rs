//! Common types and traits for physical device models.

use std::collections::BTreeMap;

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the on/off command input every built-in model accepts.
pub const CONTROL_INPUT: &str = "u";

/// Name of the output carrying the live power reading (W).
pub const POWER_OUTPUT: &str = "y";

/// Parameter overrides for a model, keyed by parameter name.
pub type ModelParams = BTreeMap<String, f64>;

/// Output values of one model step, keyed by output name.
pub type ModelOutputs = BTreeMap<&'static str, f64>;

/// Named input values currently applied to a device's model.
///
/// # Examples
///
/// ```
/// use fleet_sim::devices::ControlVector;
///
/// let mut control = ControlVector::zeros(&["u"]);
/// assert!(!control.is_on());
/// control.set("u", 1.0);
/// assert!(control.is_on());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlVector(BTreeMap<String, f64>);

impl ControlVector {
    /// A vector with every named input set to zero.
    pub fn zeros(inputs: &[&str]) -> Self {
        Self(inputs.iter().map(|name| ((*name).to_string(), 0.0)).collect())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    /// Current value of the on/off command, zero when unset.
    pub fn command(&self) -> f64 {
        self.get(CONTROL_INPUT).unwrap_or(0.0)
    }

    /// Whether the on/off command is non-zero.
    pub fn is_on(&self) -> bool {
        self.command() != 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// One device's opaque numerical engine.
///
/// Given a time window and control inputs, advances internal state and
/// returns output values. The power reading is reported under
/// [`POWER_OUTPUT`].
pub trait PhysicalModel: Send {
    /// Catalog name of the model.
    fn model_name(&self) -> &'static str;

    /// Names of the inputs the model reads from the control vector.
    fn inputs(&self) -> &'static [&'static str] {
        &[CONTROL_INPUT]
    }

    /// Cold-start reinitialization: returns internal state to its initial value.
    fn reset(&mut self);

    /// Advances the model from `t` to `t + dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Step` when the model cannot advance.
    fn step(&mut self, t: f64, dt: f64, control: &ControlVector) -> Result<ModelOutputs>;
}

/// Factory that constructs physical models from a name and parameters.
pub trait ModelStepper: Send + Sync {
    /// Builds a ready-to-step model instance.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Initialization` for unknown models or invalid parameters.
    fn initialize(&self, model_name: &str, params: &ModelParams)
    -> Result<Box<dyn PhysicalModel>>;
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
