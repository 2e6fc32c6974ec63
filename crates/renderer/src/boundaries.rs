//! Administrative boundary overlays read from GeoJSON.
//!
//! Any `LineString`, `MultiLineString`, `Polygon` or `MultiPolygon` geometry
//! (bare, inside a `Feature`, a `FeatureCollection` or a
//! `GeometryCollection`) becomes one or more polylines of `(lon, lat)`
//! vertices. Polygon rings are drawn as their outlines.
//!
//! Without a configured file the renderer falls back to a bundled set of
//! simplified western and Great Plains US state outlines.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// Level of detail for boundary lines, named after the Natural Earth scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BoundaryResolution {
    #[serde(rename = "110m")]
    Coarse,
    #[default]
    #[serde(rename = "50m")]
    Medium,
    #[serde(rename = "10m")]
    Fine,
}

impl BoundaryResolution {
    /// Douglas-Peucker tolerance in degrees; zero keeps every vertex.
    pub fn tolerance(&self) -> f64 {
        match self {
            Self::Coarse => 0.25,
            Self::Medium => 0.05,
            Self::Fine => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Coarse => "110m",
            Self::Medium => "50m",
            Self::Fine => "10m",
        }
    }
}

impl FromStr for BoundaryResolution {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "110m" | "coarse" => Ok(Self::Coarse),
            "50m" | "medium" => Ok(Self::Medium),
            "10m" | "fine" => Ok(Self::Fine),
            _ => Err(RenderError::UnknownResolution(s.to_string())),
        }
    }
}

impl fmt::Display for BoundaryResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A polyline of `(lon, lat)` vertices.
pub type Polyline = Vec<(f64, f64)>;

/// Simplified state outlines shipped with the renderer.
const BUNDLED_GEOJSON: &str = include_str!("../data/us_states.geojson");

/// GeoJSON position: longitude, latitude and an optional altitude.
type Position = Vec<f64>;

/// The GeoJSON objects a boundary file may contain.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        features: Vec<GeoJson>,
    },
    Feature {
        geometry: Option<Box<GeoJson>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJson>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    // Points carry no line work.
    Point {},
    MultiPoint {},
}

impl GeoJson {
    fn collect_lines(self, out: &mut Vec<Polyline>) -> RenderResult<()> {
        match self {
            Self::FeatureCollection { features: objects }
            | Self::GeometryCollection { geometries: objects } => {
                for object in objects {
                    object.collect_lines(out)?;
                }
            }
            Self::Feature { geometry } => {
                if let Some(geometry) = geometry {
                    geometry.collect_lines(out)?;
                }
            }
            Self::LineString { coordinates } => out.push(to_polyline(coordinates)?),
            Self::MultiLineString { coordinates } | Self::Polygon { coordinates } => {
                for line in coordinates {
                    out.push(to_polyline(line)?);
                }
            }
            Self::MultiPolygon { coordinates } => {
                for ring in coordinates.into_iter().flatten() {
                    out.push(to_polyline(ring)?);
                }
            }
            Self::Point {} | Self::MultiPoint {} => {}
        }
        Ok(())
    }
}

fn to_polyline(positions: Vec<Position>) -> RenderResult<Polyline> {
    positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok((*lon, *lat)),
            _ => Err(RenderError::Boundaries {
                path: "<inline>".to_string(),
                message: format!("invalid position: {:?}", position),
            }),
        })
        .collect()
}

/// Boundary lines ready to be drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryLayer {
    pub lines: Vec<Polyline>,
}

impl BoundaryLayer {
    /// Read a GeoJSON file.
    pub fn load(path: &Path) -> RenderResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::Boundaries {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_geojson(&text).map_err(|e| match e {
            RenderError::Boundaries { message, .. } => RenderError::Boundaries {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse a GeoJSON document.
    pub fn from_geojson(text: &str) -> RenderResult<Self> {
        let document: GeoJson = serde_json::from_str(text).map_err(|e| RenderError::Boundaries {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;

        let mut lines = Vec::new();
        document.collect_lines(&mut lines)?;
        debug!(lines = lines.len(), "Parsed boundary GeoJSON");
        Ok(Self { lines })
    }

    /// The bundled state outlines.
    pub fn bundled() -> RenderResult<Self> {
        Self::from_geojson(BUNDLED_GEOJSON)
    }

    pub fn vertex_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// Simplify every line for the given resolution.
    pub fn decimated(&self, resolution: BoundaryResolution) -> Self {
        let tolerance = resolution.tolerance();
        if tolerance <= 0.0 {
            return self.clone();
        }
        Self {
            lines: self
                .lines
                .iter()
                .map(|line| douglas_peucker(line, tolerance))
                .collect(),
        }
    }
}

/// Douglas-Peucker line simplification. Endpoints are always kept.
pub fn douglas_peucker(line: &[(f64, f64)], tolerance: f64) -> Polyline {
    if line.len() < 3 {
        return line.to_vec();
    }

    let mut keep = vec![false; line.len()];
    keep[0] = true;
    keep[line.len() - 1] = true;

    let mut stack = vec![(0usize, line.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let (mut max_dist, mut max_idx) = (0.0, start);
        for i in (start + 1)..end {
            let d = perpendicular_distance(line[i], line[start], line[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }
        if max_dist > tolerance {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    line.iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

fn perpendicular_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    ((p.0 - a.0) * dy - (p.1 - a.1) * dx).abs() / len
}
