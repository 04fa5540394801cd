//! Outcome taxonomy for the training/detection hot path.
//!
//! Per the error handling design: every non-fatal result the engine can
//! produce is a plain tagged variant here. None of these unwind — a caller
//! sees `ShouldNotTrainNow` or `MissingData` just as often as `Success`, and
//! both are normal, silently-tolerated states. Programmer-error conditions
//! ("unreachable" states) use `unreachable!()`/`debug_assert!` at the call
//! site instead of a variant, since only those are meant to abort.

use std::fmt;

/// Non-fatal outcome of a training or scoring attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation completed and produced a usable result.
    Success,
    /// The per-dimension training lock is held by another thread.
    TryLockFailed,
    /// The minimum retrain interval has not elapsed yet.
    ShouldNotTrainNow,
    /// Fewer real samples were available than required.
    MissingData,
    /// The time range requested from the storage query interface was empty.
    NoData,
    /// Scoring was attempted against an untrained model.
    NoModel,
    /// The storage query interface or event store reported a failure.
    StorageError(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::TryLockFailed => write!(f, "training lock held"),
            Self::ShouldNotTrainNow => write!(f, "retrain interval not elapsed"),
            Self::MissingData => write!(f, "insufficient real samples"),
            Self::NoData => write!(f, "empty query range"),
            Self::NoModel => write!(f, "model untrained"),
            Self::StorageError(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for Outcome {}
