//! Error types for catalog and subset requests.

use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Result type for THREDDS client operations.
pub type ThreddsResult<T> = Result<T, ThreddsError>;

#[derive(Debug, Error)]
pub enum ThreddsError {
    /// Transport failure (DNS, connect, timeout, body read)
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Malformed catalog XML at byte {position}: {message}")]
    CatalogParse { position: usize, message: String },

    #[error("Dataset {dataset} has no NetCDF Subset Service access")]
    NoSubsetService { dataset: String },

    #[error("Invalid subset query: {0}")]
    InvalidQuery(String),

    #[error("Failed to decode subset response: {0}")]
    Decode(#[from] NetCdfError),

    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl ThreddsError {
    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ThreddsError::Status { status, .. } => Some(*status),
            ThreddsError::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
