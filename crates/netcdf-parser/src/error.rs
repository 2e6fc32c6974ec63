//! Error types for NetCDF parsing operations.

use grid_common::GridError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// A variable's values could not be read
    #[error("Failed to read variable {variable}: {message}")]
    ReadError { variable: String, message: String },

    /// Decoded values do not fit the declared dimensions
    #[error(transparent)]
    Shape(#[from] GridError),
}
