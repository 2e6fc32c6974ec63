//! Spherical Mercator projection.

use std::f64::consts::PI;

use crate::EARTH_RADIUS;

/// Latitude limit beyond which Mercator y diverges.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical Mercator with an adjustable central meridian.
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    /// Central meridian in degrees
    pub central_lon: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
}

impl Mercator {
    pub fn new(central_lon: f64) -> Self {
        Self {
            central_lon,
            earth_radius: EARTH_RADIUS,
        }
    }

    /// Geographic (degrees) to projected (meters). Latitudes are clamped to
    /// [`MAX_LATITUDE`].
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> Option<(f64, f64)> {
        if !lat_deg.is_finite() || !lon_deg.is_finite() {
            return None;
        }
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let mut dlon = lon_deg - self.central_lon;
        while dlon > 180.0 {
            dlon -= 360.0;
        }
        while dlon < -180.0 {
            dlon += 360.0;
        }
        let x = self.earth_radius * dlon.to_radians();
        let y = self.earth_radius * (PI / 4.0 + lat / 2.0).tan().ln();
        Some((x, y))
    }

    /// Projected (meters) to geographic `(lat, lon)` in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let lat = (2.0 * (y / self.earth_radius).exp().atan() - PI / 2.0).to_degrees();
        let lon = (x / self.earth_radius).to_degrees() + self.central_lon;
        Some((lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_origin() {
        let proj = Mercator::new(0.0);
        let (x, y) = proj.forward(0.0, 0.0).unwrap();
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip() {
        let proj = Mercator::new(-105.0);
        let (x, y) = proj.forward(40.0, -104.0).unwrap();
        let (lat, lon) = proj.inverse(x, y).unwrap();
        assert!((lat - 40.0).abs() < 1e-9);
        assert!((lon - -104.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_poles() {
        let proj = Mercator::new(0.0);
        let (_, y_pole) = proj.forward(90.0, 0.0).unwrap();
        let (_, y_max) = proj.forward(MAX_LATITUDE, 0.0).unwrap();
        assert_eq!(y_pole, y_max);
    }
}
