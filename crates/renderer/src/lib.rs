//! Map rendering for gridded forecast fields.
//!
//! A [`Figure`] draws filled contours of a lat/lon grid under a map
//! projection, with a boundary overlay, colorbar, title and point markers,
//! and encodes the result as PNG. [`MapRenderer`] wraps the figure calls for
//! one-shot rendering from a [`RenderSpec`].

pub mod axes;
pub mod boundaries;
pub mod colormap;
pub mod contour;
pub mod error;
pub mod figure;
pub mod map;
pub mod png;
pub mod text;

pub use axes::{MapAxes, PixelRect};
pub use boundaries::{BoundaryLayer, BoundaryResolution, Polyline};
pub use colormap::{Color, Colormap};
pub use contour::{filled_levels, ContourSet, GridSampler};
pub use error::{RenderError, RenderResult};
pub use figure::Figure;
pub use map::{MapRenderer, RenderSpec, RenderedMap, RendererConfig};
