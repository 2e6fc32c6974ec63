//! Failure taxonomy of a pipeline run.

use thiserror::Error;

/// Error raised by a collaborator, kept as the source of a [`PipelineError`].
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Every way a run can fail. None of them is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Catalog unreachable, unparseable, empty, or missing the selected dataset
    #[error("Catalog {catalog} unavailable: {reason}")]
    CatalogUnavailable {
        catalog: String,
        reason: String,
        #[source]
        source: Option<CollaboratorError>,
    },

    /// Dataset offers no subset interface
    #[error("Dataset {dataset} does not support subset queries")]
    UnsupportedAccess {
        dataset: String,
        #[source]
        source: Option<CollaboratorError>,
    },

    /// Query violates its invariants; detected before any request is sent
    #[error("Invalid subset query: {0}")]
    InvalidQuery(String),

    /// Transport failure, error status or undecodable subset response
    #[error("Subset request {url} failed")]
    SubsetRequestFailed {
        url: String,
        #[source]
        source: CollaboratorError,
    },

    /// Requested variable or one of its coordinates is not in the response
    #[error("Variable {variable} not found: {reason}")]
    VariableNotFound { variable: String, reason: String },

    /// Arrays handed to the renderer cannot be drawn together
    #[error("Render input mismatch: {message}")]
    RenderInputMismatch {
        message: String,
        #[source]
        source: Option<CollaboratorError>,
    },
}

impl PipelineError {
    /// Stable name of the failure kind for logs and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::CatalogUnavailable { .. } => "CatalogUnavailable",
            PipelineError::UnsupportedAccess { .. } => "UnsupportedAccess",
            PipelineError::InvalidQuery(_) => "InvalidQuery",
            PipelineError::SubsetRequestFailed { .. } => "SubsetRequestFailed",
            PipelineError::VariableNotFound { .. } => "VariableNotFound",
            PipelineError::RenderInputMismatch { .. } => "RenderInputMismatch",
        }
    }

    pub(crate) fn variable_not_found(variable: &str, reason: impl Into<String>) -> Self {
        PipelineError::VariableNotFound {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn render_mismatch(message: impl Into<String>, source: Option<CollaboratorError>) -> Self {
        PipelineError::RenderInputMismatch {
            message: message.into(),
            source,
        }
    }
}
