//! Built-in model catalog: parameter specs, validation, and construction.

use std::collections::BTreeMap;

use serde::Serialize;

use super::fridge::Fridge;
use super::heater::Heater;
use super::lamp::Lamp;
use super::types::{ModelParams, ModelStepper, PhysicalModel};
use crate::error::{Result, SimError};

/// Allowed range and default of one model parameter.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

/// Catalog entry describing one simulatable model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    #[serde(skip)]
    pub build: fn(&ResolvedParams) -> Box<dyn PhysicalModel>,
}

impl ModelSpec {
    /// Merges overrides onto defaults, rejecting unknown names and
    /// out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Initialization` naming the offending parameter.
    pub fn resolve(&self, overrides: &ModelParams) -> Result<ResolvedParams> {
        for key in overrides.keys() {
            if !self.params.iter().any(|p| p.name == key) {
                let valid: Vec<&str> = self.params.iter().map(|p| p.name).collect();
                return Err(SimError::init(
                    self.name,
                    format!(
                        "unknown parameter \"{key}\", valid parameters are: {}",
                        valid.join(", ")
                    ),
                ));
            }
        }

        let mut values = BTreeMap::new();
        for spec in self.params {
            let value = overrides.get(spec.name).copied().unwrap_or(spec.default);
            if !value.is_finite() || value < spec.min || value > spec.max {
                return Err(SimError::init(
                    self.name,
                    format!(
                        "parameter \"{}\" = {value} out of range [{}, {}]",
                        spec.name, spec.min, spec.max
                    ),
                ));
            }
            values.insert(spec.name, value);
        }
        Ok(ResolvedParams(values))
    }
}

/// Validated parameter set with every catalog parameter present.
#[derive(Debug, Clone)]
pub struct ResolvedParams(BTreeMap<&'static str, f64>);

impl ResolvedParams {
    /// Value of a parameter declared in the model's spec, zero otherwise.
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }
}

/// The default [`ModelStepper`]: a fixed set of appliance models.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![Lamp::SPEC, Heater::SPEC, Fridge::SPEC],
        }
    }
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists every model that can be simulated.
    pub fn available_models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn find(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }
}

impl ModelStepper for ModelCatalog {
    fn initialize(
        &self,
        model_name: &str,
        params: &ModelParams,
    ) -> Result<Box<dyn PhysicalModel>> {
        let spec = self.find(model_name).ok_or_else(|| {
            let names: Vec<&str> = self.models.iter().map(|m| m.name).collect();
            SimError::init(
                model_name,
                format!("unknown model, valid models are: {}", names.join(", ")),
            )
        })?;
        let resolved = spec.resolve(params)?;
        Ok((spec.build)(&resolved))
    }
}
