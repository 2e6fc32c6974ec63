//! One-call map rendering from a [`RenderSpec`].

use std::path::PathBuf;

use grid_common::{BoundingBox, LatLonMesh, NdArray};
use image::RgbaImage;
use projection::MapProjection;
use rusttype::Font;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::boundaries::{BoundaryLayer, BoundaryResolution};
use crate::colormap::Colormap;
use crate::error::RenderResult;
use crate::figure::Figure;
use crate::png;
use crate::text;

/// Everything needed to draw one map, fixed before rendering starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    pub extent: BoundingBox,
    pub projection: MapProjection,
    /// Upper bound on the number of filled bands
    pub levels: usize,
    pub colormap: Colormap,
    pub title: String,
    pub colorbar_label: String,
    pub boundary_resolution: BoundaryResolution,
    pub width: u32,
    pub height: u32,
    /// Mark every grid sample point
    pub scatter: bool,
}

/// Resources shared by every map a renderer draws.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RendererConfig {
    /// GeoJSON file with boundary lines; the bundled outlines when unset
    pub boundaries_path: Option<PathBuf>,
    /// TrueType font for the title and labels
    pub font_path: Option<PathBuf>,
}

/// A rendered map and the contour levels it used.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub image: RgbaImage,
    pub levels: Vec<f64>,
    pub title: String,
}

impl RenderedMap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// PNG bytes with the title embedded as metadata.
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        png::encode_rgba_with_text(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            &[("Software", "forecast-map"), ("Title", &self.title)],
        )
    }
}

/// Draws maps with a fixed boundary layer and font.
#[derive(Clone)]
pub struct MapRenderer {
    boundaries: Option<BoundaryLayer>,
    font: Option<Font<'static>>,
}

impl MapRenderer {
    /// Load the configured resources. Without a configured boundary file the
    /// bundled state outlines are drawn; a configured file that is missing or
    /// unreadable disables the overlay with a warning.
    pub fn new(config: &RendererConfig) -> Self {
        let boundaries = match config.boundaries_path.as_deref() {
            Some(path) => match BoundaryLayer::load(path) {
                Ok(layer) => {
                    info!(
                        path = %path.display(),
                        lines = layer.lines.len(),
                        "Loaded boundary overlay"
                    );
                    Some(layer)
                }
                Err(e) => {
                    warn!(error = %e, "Boundary overlay unavailable; skipped");
                    None
                }
            },
            None => match BoundaryLayer::bundled() {
                Ok(layer) => {
                    debug!(lines = layer.lines.len(), "Using bundled state boundaries");
                    Some(layer)
                }
                Err(e) => {
                    warn!(error = %e, "Bundled boundaries unreadable; overlay skipped");
                    None
                }
            },
        };

        Self {
            boundaries,
            font: text::resolve_font(config.font_path.as_deref()),
        }
    }

    /// Renderer with explicit resources.
    pub fn with_resources(boundaries: Option<BoundaryLayer>, font: Option<Font<'static>>) -> Self {
        Self { boundaries, font }
    }

    pub fn has_boundaries(&self) -> bool {
        self.boundaries.is_some()
    }

    /// Draw `values` over `mesh` as described by `spec`.
    pub fn render(
        &self,
        spec: &RenderSpec,
        mesh: &LatLonMesh,
        values: &NdArray,
    ) -> RenderResult<RenderedMap> {
        let mut figure = Figure::new(spec.width, spec.height, spec.projection.clone(), spec.extent)?
            .with_font(self.font.clone())
            .contourf(mesh, values, spec.levels, spec.colormap)?;

        if let Some(layer) = &self.boundaries {
            figure = figure.add_boundaries(layer, spec.boundary_resolution);
        }
        figure = figure
            .colorbar(spec.colorbar_label.clone())
            .set_title(spec.title.clone());
        if spec.scatter {
            figure = figure.scatter(mesh);
        }

        let levels = figure
            .contours()
            .map(|c| c.levels.clone())
            .unwrap_or_default();
        let image = figure.render()?;

        Ok(RenderedMap {
            image,
            levels,
            title: spec.title.clone(),
        })
    }
}
