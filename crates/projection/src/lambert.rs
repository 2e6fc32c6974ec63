//! Lambert Conformal Conic projection.
//!
//! Maps a cone secant to the Earth's surface onto a flat plane. It is the
//! usual choice for mid-latitude regional forecast maps.
//!
//! The projection parameters include:
//! - Central latitude (lat0): latitude of the projection origin
//! - Central longitude (lon0): the central meridian
//! - Standard parallels: latin1 and latin2 (equal for a tangent cone)
//!
//! Projected coordinates are meters east/north of the origin.

use std::f64::consts::PI;

use crate::{ProjectionError, EARTH_RADIUS};

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of origin in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection centred on `(central_lat, central_lon)` with the
    /// given standard parallels, all in degrees.
    pub fn new(
        central_lat: f64,
        central_lon: f64,
        latin1_deg: f64,
        latin2_deg: f64,
    ) -> Result<Self, ProjectionError> {
        for (name, value) in [
            ("central_latitude", central_lat),
            ("standard_parallel_1", latin1_deg),
            ("standard_parallel_2", latin2_deg),
        ] {
            if !value.is_finite() || value.abs() >= 90.0 {
                return Err(ProjectionError::InvalidParameter { name, value });
            }
        }
        if !central_lon.is_finite() {
            return Err(ProjectionError::InvalidParameter {
                name: "central_longitude",
                value: central_lon,
            });
        }

        let to_rad = PI / 180.0;
        let lat0 = central_lat * to_rad;
        let lon0 = central_lon * to_rad;
        let latin1 = latin1_deg * to_rad;
        let latin2 = latin2_deg * to_rad;
        let earth_radius = EARTH_RADIUS;

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };
        if n.abs() < 1e-10 {
            // Parallels symmetric about the equator degenerate into a cylinder.
            return Err(ProjectionError::InvalidParameter {
                name: "standard_parallels",
                value: latin1_deg,
            });
        }

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (PI / 4.0 + lat0 / 2.0).tan().powf(n);

        Ok(Self {
            lon0,
            lat0,
            latin1,
            latin2,
            earth_radius,
            n,
            f,
            rho0,
        })
    }

    /// Projection fitted to the latitude band `[south, north]`.
    ///
    /// The standard parallels sit one sixth of the band in from each edge and
    /// the origin at the band centre, so the cone opens toward the pole of
    /// whichever hemisphere the band lies in.
    pub fn for_band(south: f64, north: f64, central_lon: f64) -> Result<Self, ProjectionError> {
        let span = north - south;
        Self::new(
            (south + north) / 2.0,
            central_lon,
            south + span / 6.0,
            north - span / 6.0,
        )
    }

    /// Geographic (degrees) to projected (meters) coordinates.
    ///
    /// Returns `None` at the pole opposite the cone apex, where rho is infinite.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> Option<(f64, f64)> {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;

        let dlon = normalize_angle(lon_deg * to_rad - self.lon0);
        let t = (PI / 4.0 + lat / 2.0).tan();
        if t <= 0.0 || !t.is_finite() {
            return None;
        }

        let rho = self.earth_radius * self.f / t.powf(self.n);
        let theta = self.n * dlon;

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();
        if x.is_finite() && y.is_finite() {
            Some((x, y))
        } else {
            None
        }
    }

    /// Projected (meters) to geographic (degrees) coordinates, `(lat, lon)`.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let to_deg = 180.0 / PI;
        let dy = self.rho0 - y;

        let mut rho = (x * x + dy * dy).sqrt();
        let theta = if self.n < 0.0 {
            rho = -rho;
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };

        let lat = if rho == 0.0 {
            PI / 2.0 * self.n.signum()
        } else {
            2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0
        };
        let lon = normalize_angle(self.lon0 + theta / self.n);

        let (lat, lon) = (lat * to_deg, lon * to_deg);
        if lat.is_finite() && lon.is_finite() {
            Some((lat, lon))
        } else {
            None
        }
    }

    /// Cone constant, exposed for diagnostics.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }
}

/// Normalize an angle in radians to [-π, π].
fn normalize_angle(mut a: f64) -> f64 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}
