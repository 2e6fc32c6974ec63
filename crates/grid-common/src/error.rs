//! Error types for grid construction and decoding.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while building or decoding grid data.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Latitude dimension {lat} must precede longitude dimension {lon} in {dims:?}")]
    AxisOrder {
        lat: String,
        lon: String,
        dims: Vec<String>,
    },

    #[error("Invalid time units: {0}")]
    InvalidTimeUnits(String),

    #[error("Time value out of range: {0}")]
    TimeOutOfRange(f64),
}

impl GridError {
    /// Short, stable identifier for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            GridError::ShapeMismatch { .. } => "ShapeMismatch",
            GridError::AxisOrder { .. } => "AxisOrder",
            GridError::InvalidTimeUnits(_) => "InvalidTimeUnits",
            GridError::TimeOutOfRange(_) => "TimeOutOfRange",
        }
    }
}
