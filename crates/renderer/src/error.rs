//! Error types for figure rendering.

use projection::ProjectionError;
use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Coordinate and value grids disagree
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Coordinates that cannot describe a rectilinear grid
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    /// Value grid with no finite samples to contour
    #[error("No finite values to contour in {0}")]
    NoData(String),

    #[error("At least one contour level is required, got {0}")]
    InvalidLevels(usize),

    #[error("Unknown colormap: {0}")]
    UnknownColormap(String),

    #[error("Unknown boundary resolution: {0}")]
    UnknownResolution(String),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Failed to load boundaries from {path}: {message}")]
    Boundaries { path: String, message: String },

    #[error("Failed to load font from {path}: {message}")]
    Font { path: String, message: String },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}
