use pdes_core::{CoreError, SimTime};
use pdes_model::ModelError;
use thiserror::Error;

/// Engine-level errors.
///
/// `Causality` and `Barrier` indicate a kernel defect, not a model defect;
/// both abort the run and are never masked.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("thread pool construction failed: {0}")]
    ThreadPool(String),

    #[error("causality violation: event at {at} scheduled behind clock {now}")]
    Causality { at: SimTime, now: SimTime },

    #[error("barrier protocol violation: {0}")]
    Barrier(String),

    #[error("run() called on a finished simulation")]
    AlreadyFinished,
}

pub type EngineResult<T> = Result<T, EngineError>;
