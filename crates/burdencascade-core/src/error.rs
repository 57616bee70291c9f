//! Error types for Burdencascade

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{field} must be a non-negative finite number, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },

    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    #[error("layer registered twice: {0}")]
    DuplicateLayer(String),

    #[error("at least one layer must be registered")]
    NoLayers,

    #[error("operation_type must not be empty")]
    InvalidOperation,

    #[error("window_end must be >= window_start, got {start} .. {end}")]
    InvalidWindow { start: String, end: String },

    #[error("denominator_value must be > 0, got {value}")]
    DivisionByZero { value: f64 },

    #[error("predicted_ratio must be > 0, got {value}")]
    InvalidPrediction { value: f64 },

    #[error("at least one consensus sample is required")]
    EmptySampleSet,

    #[error("epsilon must be a non-negative finite number, got {value}")]
    InvalidEpsilon { value: f64 },

    #[error("sample from {instance} must be finite, got {value}")]
    InvalidSample { instance: String, value: f64 },

    #[error("invalid smoothing parameter: {0}")]
    InvalidSmoothing(String),

    #[error("corrupt event log at line {line}: {reason}")]
    CorruptLog { line: usize, reason: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable input; nothing was mutated.
    InputValidation,
    /// A computation precondition did not hold.
    Computation,
    /// No data points were supplied.
    EmptyInput,
    /// The event log could not be read or written.
    Storage,
}

impl Error {
    pub fn invalid_duration(field: &'static str, value: f64) -> Self {
        Self::InvalidDuration { field, value }
    }

    pub fn unknown_layer(name: impl Into<String>) -> Self {
        Self::UnknownLayer(name.into())
    }

    pub fn corrupt_log(line: usize, reason: impl Into<String>) -> Self {
        Self::CorruptLog {
            line,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDuration { .. }
            | Error::UnknownLayer(_)
            | Error::DuplicateLayer(_)
            | Error::NoLayers
            | Error::InvalidOperation
            | Error::InvalidWindow { .. }
            | Error::InvalidEpsilon { .. }
            | Error::InvalidSample { .. }
            | Error::InvalidSmoothing(_) => ErrorKind::InputValidation,
            Error::DivisionByZero { .. } | Error::InvalidPrediction { .. } => {
                ErrorKind::Computation
            }
            Error::EmptySampleSet => ErrorKind::EmptyInput,
            Error::CorruptLog { .. } | Error::IoError(_) | Error::JsonError(_) => {
                ErrorKind::Storage
            }
        }
    }
}
