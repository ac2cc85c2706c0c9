//! Core error taxonomy, per the three kinds a training run can surface:
//! parameter validation, cooperative cancellation, and propagated
//! runtime failures (map/reduce, frame access, numeric degeneracy).

/// Errors surfaced by [`crate::driver::Driver`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum TrainError {
    /// Rejected before any work starts; no frame/model lock is taken.
    #[error("invalid training parameters: {0}")]
    Validation(String),

    /// Observed between phases via [`crate::job::Job::is_running`].
    /// Teardown is orderly: frame and model locks are released and no
    /// further snapshots are published.
    #[error("training cancelled")]
    Cancelled,

    /// Any other failure propagated from a map/reduce phase, model
    /// store I/O, or a numeric invariant violation.
    #[error("training failed: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, TrainError>;
