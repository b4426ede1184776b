//! Physical device models and the stepper contract the simulation core drives.

/// Model catalog with parameter validation.
pub mod catalog;
/// Refrigerator compressor model.
pub mod fridge;
/// Thermostatic space heater model.
pub mod heater;
/// Resistive lighting load.
pub mod lamp;
pub mod types;

// Re-export the main types for convenience
pub use catalog::{ModelCatalog, ModelSpec, ParamSpec};
pub use fridge::Fridge;
pub use heater::Heater;
pub use lamp::Lamp;
pub use types::{
    CONTROL_INPUT, ControlVector, ModelOutputs, ModelParams, ModelStepper, POWER_OUTPUT,
    PhysicalModel,
};
