//! Error taxonomy for generator construction, predicate execution and runs.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Signal raised by a predicate whose precondition does not hold.
///
/// The trial is discarded instead of being counted as a pass or a failure.
/// `interrupt_execution` asks the runner to stop pulling further samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("precondition failure")]
pub struct PreconditionFailure {
    pub interrupt_execution: bool,
}

impl PreconditionFailure {
    /// A plain skip: the runner moves on to the next sample
    pub fn skip() -> Self {
        Self {
            interrupt_execution: false,
        }
    }

    /// A skip that also stops the whole run
    pub fn interrupt() -> Self {
        Self {
            interrupt_execution: true,
        }
    }
}

/// Reasons a property rejected an input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The predicate returned `false`
    #[error("Property failed by returning false")]
    ReturnedFalse,

    /// The predicate returned an error
    #[error("Property failed: {message}")]
    Failed { message: String },

    /// The predicate (or one of its hooks) panicked
    #[error("Property panicked: {message}")]
    Panicked { message: String },

    /// An asynchronous predicate did not settle in time
    #[error("Property timeout: exceeded limit of {} milliseconds", .limit.as_millis())]
    Timeout { limit: Duration },

    /// An in-flight predicate was cut short by the run's time limit
    #[error("Property interrupted: exceeded time limit of {} milliseconds", .limit.as_millis())]
    Interrupted { limit: Duration },

    /// The predicate's precondition did not hold
    #[error(transparent)]
    Precondition(#[from] PreconditionFailure),
}

impl PropertyError {
    /// Create a failure carrying a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Turn a caught panic payload into a failure
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { message }
    }

    /// Whether this error is a precondition signal rather than a failure
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

impl From<String> for PropertyError {
    fn from(message: String) -> Self {
        Self::Failed { message }
    }
}

impl From<&str> for PropertyError {
    fn from(message: &str) -> Self {
        Self::failed(message)
    }
}

/// Invalid generator parameters, detected when the generator is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("invalid range: min ({min}) must be less than or equal to max ({max})")]
    InvalidRange { min: String, max: String },

    #[error("invalid length constraints: min_length ({min}) must not exceed max_length ({max})")]
    InvalidLength { min: usize, max: usize },

    #[error("{label} expects at least one alternative")]
    EmptyChoice { label: &'static str },

    #[error("{label} expects the sum of weights to be strictly positive")]
    ZeroTotalWeight { label: &'static str },

    #[error("depth factor must be finite and non-negative, got {0}")]
    InvalidDepthFactor(f64),

    #[error("filter rejected {attempts} consecutive values")]
    FilterExhausted { attempts: usize },

    #[error("recursive generator {name:?} is already bound")]
    AlreadyBound { name: String },

    #[error("recursive generator {name:?} not correctly initialized")]
    Unbound { name: String },
}

impl GeneratorError {
    pub(crate) fn invalid_range<N: std::fmt::Display>(min: N, max: N) -> Self {
        Self::InvalidRange {
            min: min.to_string(),
            max: max.to_string(),
        }
    }
}

/// Errors reported by the runner entry points
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to replay path {path:?}: {reason}")]
    Replay { path: String, reason: String },
}
