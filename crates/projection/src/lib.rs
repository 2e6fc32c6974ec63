//! Map projections used to draw forecast grids.
//!
//! Implements the projections from scratch without external dependencies:
//! - Plate Carrée (equirectangular, degrees used directly)
//! - Spherical Mercator
//! - Lambert Conformal Conic
//!
//! [`MapProjection`] is the single entry point the renderer uses; it projects
//! geographic points to a planar coordinate space and back.

pub mod lambert;
pub mod mercator;

use grid_common::BoundingBox;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use lambert::LambertConformal;
pub use mercator::Mercator;

/// Earth radius used by the spherical projections (meters).
pub const EARTH_RADIUS: f64 = 6_371_229.0;

/// Errors from projection setup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Unknown projection: {0}")]
    UnknownProjection(String),

    #[error("Invalid projection parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Extent cannot be projected: {0}")]
    UnprojectableExtent(String),
}

/// Named projection families accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    PlateCarree,
    Mercator,
    #[default]
    LambertConformal,
}

impl ProjectionKind {
    pub fn from_name(name: &str) -> Result<Self, ProjectionError> {
        match name.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "plate_carree" | "platecarree" | "equirectangular" | "latlon" => Ok(Self::PlateCarree),
            "mercator" => Ok(Self::Mercator),
            "lambert_conformal" | "lambertconformal" | "lambert" | "lcc" => {
                Ok(Self::LambertConformal)
            }
            _ => Err(ProjectionError::UnknownProjection(name.to_string())),
        }
    }

    /// Build a projection centred on `extent`.
    ///
    /// Lambert standard parallels are derived from the extent's latitude band,
    /// so boxes in either hemisphere get a cone of the matching sign.
    pub fn for_extent(self, extent: &BoundingBox) -> Result<MapProjection, ProjectionError> {
        let (_, lon) = extent.center();
        Ok(match self {
            Self::PlateCarree => MapProjection::PlateCarree,
            Self::Mercator => MapProjection::Mercator(Mercator::new(lon)),
            Self::LambertConformal => MapProjection::LambertConformal(LambertConformal::for_band(
                extent.south,
                extent.north,
                lon,
            )?),
        })
    }
}

impl std::fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlateCarree => write!(f, "plate_carree"),
            Self::Mercator => write!(f, "mercator"),
            Self::LambertConformal => write!(f, "lambert_conformal"),
        }
    }
}

/// A configured map projection.
#[derive(Debug, Clone, PartialEq)]
pub enum MapProjection {
    PlateCarree,
    Mercator(Mercator),
    LambertConformal(LambertConformal),
}

impl MapProjection {
    pub fn kind(&self) -> ProjectionKind {
        match self {
            Self::PlateCarree => ProjectionKind::PlateCarree,
            Self::Mercator(_) => ProjectionKind::Mercator,
            Self::LambertConformal(_) => ProjectionKind::LambertConformal,
        }
    }

    /// Geographic `(lat, lon)` in degrees to planar `(x, y)`.
    pub fn forward(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        match self {
            Self::PlateCarree => {
                if lat.is_finite() && lon.is_finite() {
                    Some((lon, lat))
                } else {
                    None
                }
            }
            Self::Mercator(p) => p.forward(lat, lon),
            Self::LambertConformal(p) => p.forward(lat, lon),
        }
    }

    /// Planar `(x, y)` back to geographic `(lat, lon)` in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            Self::PlateCarree => {
                if x.is_finite() && y.is_finite() {
                    Some((y, x))
                } else {
                    None
                }
            }
            Self::Mercator(p) => p.inverse(x, y),
            Self::LambertConformal(p) => p.inverse(x, y),
        }
    }

    /// Planar bounds enclosing a geographic extent.
    ///
    /// Under a conic projection the box edges are curved, so the edges are
    /// sampled rather than only the corners.
    pub fn projected_bounds(&self, extent: &BoundingBox) -> Result<PlanarBounds, ProjectionError> {
        const SAMPLES: usize = 32;
        let mut bounds = PlanarBounds::empty();

        for t in 0..=SAMPLES {
            let frac = t as f64 / SAMPLES as f64;
            let lat = extent.south + frac * extent.height();
            let lon = extent.west + frac * extent.width();
            for (plat, plon) in [
                (extent.south, lon),
                (extent.north, lon),
                (lat, extent.west),
                (lat, extent.east),
            ] {
                if let Some((x, y)) = self.forward(plat, plon) {
                    bounds.include(x, y);
                }
            }
        }

        if bounds.is_valid() {
            Ok(bounds)
        } else {
            Err(ProjectionError::UnprojectableExtent(format!(
                "{:?} under {}",
                extent,
                self.kind()
            )))
        }
    }
}

/// Axis-aligned rectangle in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PlanarBounds {
    fn empty() -> Self {
        Self {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn is_valid(&self) -> bool {
        self.max_x > self.min_x && self.max_y > self.min_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colorado() -> BoundingBox {
        BoundingBox::new(43.0, 35.0, -100.0, -111.0)
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ProjectionKind::from_name("Lambert").unwrap(), ProjectionKind::LambertConformal);
        assert_eq!(ProjectionKind::from_name("plate-carree").unwrap(), ProjectionKind::PlateCarree);
        assert!(ProjectionKind::from_name("robinson").is_err());
    }

    #[test]
    fn test_plate_carree_is_identity_on_degrees() {
        let proj = MapProjection::PlateCarree;
        assert_eq!(proj.forward(40.0, -105.0), Some((-105.0, 40.0)));
        assert_eq!(proj.inverse(-105.0, 40.0), Some((40.0, -105.0)));
    }

    #[test]
    fn test_plate_carree_bounds_match_extent() {
        let bounds = MapProjection::PlateCarree.projected_bounds(&colorado()).unwrap();
        assert_eq!(bounds.min_x, -111.0);
        assert_eq!(bounds.max_x, -100.0);
        assert_eq!(bounds.min_y, 35.0);
        assert_eq!(bounds.max_y, 43.0);
    }

    #[test]
    fn test_lambert_bounds_enclose_corners() {
        let extent = colorado();
        let proj = ProjectionKind::LambertConformal.for_extent(&extent).unwrap();
        let bounds = proj.projected_bounds(&extent).unwrap();
        for (lat, lon) in [(35.0, -111.0), (35.0, -100.0), (43.0, -111.0), (43.0, -100.0)] {
            let (x, y) = proj.forward(lat, lon).unwrap();
            assert!(x >= bounds.min_x && x <= bounds.max_x);
            assert!(y >= bounds.min_y && y <= bounds.max_y);
        }
    }

    #[test]
    fn test_lambert_parallels_follow_extent() {
        let proj = ProjectionKind::LambertConformal.for_extent(&colorado()).unwrap();
        let MapProjection::LambertConformal(lcc) = proj else {
            panic!("expected Lambert, got {:?}", proj.kind());
        };
        assert!((lcc.latin1.to_degrees() - (35.0 + 8.0 / 6.0)).abs() < 1e-9);
        assert!((lcc.latin2.to_degrees() - (43.0 - 8.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_lambert_southern_extent_opens_south() {
        // Southeast Australia
        let extent = BoundingBox::new(-28.0, -44.0, 154.0, 138.0);
        let proj = ProjectionKind::LambertConformal.for_extent(&extent).unwrap();
        let MapProjection::LambertConformal(lcc) = &proj else {
            panic!("expected Lambert, got {:?}", proj.kind());
        };
        assert!(lcc.latin1 < 0.0 && lcc.latin2 < 0.0);
        assert!(lcc.cone_constant() < 0.0);

        // North stays up inside the box
        let (_, y_south) = proj.forward(-44.0, 146.0).unwrap();
        let (_, y_north) = proj.forward(-28.0, 146.0).unwrap();
        assert!(y_north > y_south);

        let bounds = proj.projected_bounds(&extent).unwrap();
        assert!(bounds.width() > 0.0 && bounds.height() > 0.0);
    }
}
