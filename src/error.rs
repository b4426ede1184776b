//! Error types shared by the simulation core.

use thiserror::Error;

use crate::store::DeviceId;

/// Errors surfaced by lifecycle operations, models, and the device store.
#[derive(Debug, Error)]
pub enum SimError {
    /// The model could not be constructed from its name and parameters.
    ///
    /// Never leaves a handle registered.
    #[error("cannot initialize model \"{model}\": {reason}")]
    Initialization {
        /// Requested model name.
        model: String,
        /// Why construction was rejected.
        reason: String,
    },

    /// No device record exists for the id.
    #[error("no device with id \"{0}\"")]
    NotFound(DeviceId),

    /// The device record is INACTIVE.
    #[error("device \"{0}\" is not active; activate it first")]
    NotActive(DeviceId),

    /// The device has no simulation handle in the registry.
    #[error("device \"{0}\" is not simulating; start its simulation first")]
    NotSimulating(DeviceId),

    /// A single model step failed. Logged and skipped by the scheduler.
    #[error("model step failed: {0}")]
    Step(String),

    /// The device store rejected or could not serve the request.
    #[error("device store error: {0}")]
    Store(String),

    /// Consumption history could not be written out.
    #[error("consumption export failed: {0}")]
    Export(#[from] csv::Error),

    /// A background worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl SimError {
    /// Shorthand for an [`SimError::Initialization`] error.
    pub fn init(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Initialization {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for simulation core operations.
pub type Result<T> = std::result::Result<T, SimError>;
