//! Error taxonomy.

use thiserror::Error;

/// Errors the solver's public API can return. `ConfigInvalid` and
/// `ResourceExhaustion` surface at construction/`set_config` time;
/// `DeviceLost` surfaces from `step` after the device context is gone.
/// `NumericalDegeneracy` and `StepOverrun` are *not* represented here: they
/// are non-fatal, recorded into [`crate::metrics::Metrics`] instead of
/// interrupting `step`.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("GPU device lost or invalid; call reset() to recreate resources")]
    DeviceLost,

    #[error("resource allocation failed: {0}")]
    ResourceExhaustion(String),

    #[error("snapshot (de)serialization failed: {0}")]
    Snapshot(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
