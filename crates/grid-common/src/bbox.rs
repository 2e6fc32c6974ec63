//! Geographic bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// Stored as the four edges used by subset queries. Longitudes follow
/// whatever convention the caller picked (-180..180 or 0..360); the box is
/// only valid when `west < east` in that convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its edges.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Parse a "north,south,east,west" string (the order the CLI accepts).
    pub fn from_nsew_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| -> Result<f64, BboxParseError> {
            p.trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        let bbox = Self {
            north: parse(parts[0])?,
            south: parse(parts[1])?,
            east: parse(parts[2])?,
            west: parse(parts[3])?,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check the ordering invariants: finite edges, `south < north`, `west < east`.
    pub fn validate(&self) -> Result<(), BboxParseError> {
        let edges = [self.north, self.south, self.east, self.west];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(BboxParseError::NonFinite);
        }
        if self.south >= self.north {
            return Err(BboxParseError::InvertedLatitude {
                south: self.south,
                north: self.north,
            });
        }
        if self.west >= self.east {
            return Err(BboxParseError::InvertedLongitude {
                west: self.west,
                east: self.east,
            });
        }
        if self.north > 90.0 {
            return Err(BboxParseError::LatitudeOutOfRange(self.north));
        }
        if self.south < -90.0 {
            return Err(BboxParseError::LatitudeOutOfRange(self.south));
        }
        Ok(())
    }

    /// Longitudinal span in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitudinal span in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center point as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Check if a (lat, lon) point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Extent in the `[west, east, south, north]` order map axes use.
    pub fn extent(&self) -> [f64; 4] {
        [self.west, self.east, self.south, self.north]
    }

    /// Expand the box by `margin` degrees on every side, clamping latitudes.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            north: (self.north + margin).min(90.0),
            south: (self.south - margin).max(-90.0),
            east: self.east + margin,
            west: self.west - margin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounding box format: {0}. Expected 'north,south,east,west'")]
    InvalidFormat(String),

    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),

    #[error("Bounding box edges must be finite")]
    NonFinite,

    #[error("South edge {south} must be below north edge {north}")]
    InvertedLatitude { south: f64, north: f64 },

    #[error("West edge {west} must be left of east edge {east}")]
    InvertedLongitude { west: f64, east: f64 },

    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nsew() {
        let bbox = BoundingBox::from_nsew_string("43,35,-100,-111").unwrap();
        assert_eq!(bbox.north, 43.0);
        assert_eq!(bbox.south, 35.0);
        assert_eq!(bbox.east, -100.0);
        assert_eq!(bbox.west, -111.0);
    }

    #[test]
    fn test_validate_rejects_inverted() {
        let bbox = BoundingBox::new(30.0, 40.0, -100.0, -110.0);
        assert!(matches!(
            bbox.validate(),
            Err(BboxParseError::InvertedLatitude { .. })
        ));

        let bbox = BoundingBox::new(40.0, 30.0, -110.0, -100.0);
        assert!(matches!(
            bbox.validate(),
            Err(BboxParseError::InvertedLongitude { .. })
        ));
    }

    #[test]
    fn test_extent_order() {
        let bbox = BoundingBox::new(43.0, 35.0, -100.0, -111.0);
        assert_eq!(bbox.extent(), [-111.0, -100.0, 35.0, 43.0]);
    }
}
