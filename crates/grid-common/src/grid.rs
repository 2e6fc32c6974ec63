//! Gridded fields on regular latitude/longitude axes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::NdArray;

/// A 2-D field sampled on a lat/lon grid at a single time.
///
/// Invariant: `values.shape() == [lats.len(), lons.len()]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridField {
    values: NdArray,
    lats: Vec<f64>,
    lons: Vec<f64>,
    time: DateTime<Utc>,
    units: String,
}

impl GridField {
    /// Build a field, squeezing the value array and checking it against the axes.
    pub fn new(
        values: NdArray,
        lats: Vec<f64>,
        lons: Vec<f64>,
        time: DateTime<Utc>,
        units: impl Into<String>,
    ) -> GridResult<Self> {
        let values = values.squeeze();
        let expected = vec![lats.len(), lons.len()];

        // A 1x1 or 1xN subset squeezes below two dimensions; restore the axes.
        let values = if values.ndim() < 2 && values.len() == lats.len() * lons.len() {
            NdArray::new(expected.clone(), values.into_values())?
        } else {
            values
        };

        if values.shape() != expected.as_slice() {
            return Err(GridError::ShapeMismatch {
                context: "grid field values vs lat/lon axes".to_string(),
                expected,
                actual: values.shape().to_vec(),
            });
        }

        Ok(Self {
            values,
            lats,
            lons,
            time,
            units: units.into(),
        })
    }

    /// Build a field from an array whose dimensions are named by `dims`.
    ///
    /// A square grid stored (lon, lat) has the same shape as one stored
    /// (lat, lon), so the latitude dimension `lat.0` must come before the
    /// longitude dimension `lon.0`.
    pub fn from_dimensions(
        values: NdArray,
        dims: &[String],
        lat: (&str, Vec<f64>),
        lon: (&str, Vec<f64>),
        time: DateTime<Utc>,
        units: impl Into<String>,
    ) -> GridResult<Self> {
        let position = |name: &str| dims.iter().position(|d| d == name);
        match (position(lat.0), position(lon.0)) {
            (Some(i), Some(j)) if i < j => Self::new(values, lat.1, lon.1, time, units),
            _ => Err(GridError::AxisOrder {
                lat: lat.0.to_string(),
                lon: lon.0.to_string(),
                dims: dims.to_vec(),
            }),
        }
    }

    pub fn values(&self) -> &NdArray {
        &self.values
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    /// (rows, cols) = (number of latitudes, number of longitudes).
    pub fn shape(&self) -> (usize, usize) {
        (self.lats.len(), self.lons.len())
    }

    /// Value at latitude index `i`, longitude index `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get2(i, j)
    }

    /// Replace the values with `f(value)` and relabel the units.
    pub fn convert(&self, f: impl Fn(f64) -> f64, units: impl Into<String>) -> Self {
        Self {
            values: self.values.map(f),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            time: self.time,
            units: units.into(),
        }
    }
}

/// Paired 2-D latitude and longitude grids of identical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonMesh {
    pub lat2d: NdArray,
    pub lon2d: NdArray,
}

impl LatLonMesh {
    pub fn shape(&self) -> (usize, usize) {
        match self.lat2d.shape() {
            [rows, cols] => (*rows, *cols),
            _ => (0, 0),
        }
    }

    /// (lat, lon) of mesh cell `(i, j)`.
    pub fn point(&self, i: usize, j: usize) -> Option<(f64, f64)> {
        Some((self.lat2d.get2(i, j)?, self.lon2d.get2(i, j)?))
    }

    /// Iterate every (lat, lon) point in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lat2d
            .values()
            .iter()
            .copied()
            .zip(self.lon2d.values().iter().copied())
    }
}

/// Outer-product meshing of a latitude and a longitude vector.
///
/// For `L` latitudes and `M` longitudes both grids have shape `(L, M)` and
/// cell `(i, j)` holds `(lats[i], lons[j])`.
pub fn meshgrid(lats: &[f64], lons: &[f64]) -> LatLonMesh {
    let rows = lats.len();
    let cols = lons.len();
    let mut lat2d = Vec::with_capacity(rows * cols);
    let mut lon2d = Vec::with_capacity(rows * cols);

    for &lat in lats {
        for &lon in lons {
            lat2d.push(lat);
            lon2d.push(lon);
        }
    }

    LatLonMesh {
        lat2d: NdArray::from_raw(vec![rows, cols], lat2d),
        lon2d: NdArray::from_raw(vec![rows, cols], lon2d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_grid_field_squeezes_time_axis() {
        let values = NdArray::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let field = GridField::new(values, vec![40.0, 39.5], vec![-105.0, -104.5, -104.0], time, "K")
            .unwrap();
        assert_eq!(field.shape(), (2, 3));
        assert_eq!(field.get(1, 2), Some(6.0));
    }

    #[test]
    fn test_grid_field_rejects_mismatch() {
        let values = NdArray::new(vec![2, 2], vec![0.0; 4]).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let err = GridField::new(values, vec![1.0, 2.0, 3.0], vec![1.0, 2.0], time, "K").unwrap_err();
        assert_eq!(err.code(), "ShapeMismatch");
    }

    #[test]
    fn test_single_point_field() {
        let values = NdArray::new(vec![1, 1, 1], vec![280.0]).unwrap();
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let field = GridField::new(values, vec![40.0], vec![-105.0], time, "K").unwrap();
        assert_eq!(field.shape(), (1, 1));
        assert_eq!(field.get(0, 0), Some(280.0));
    }

    #[test]
    fn test_named_dimensions_in_lat_lon_order() {
        let values = NdArray::new(vec![1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let dims: Vec<String> = ["time", "lat", "lon"].iter().map(|d| d.to_string()).collect();
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let field = GridField::from_dimensions(
            values,
            &dims,
            ("lat", vec![40.0, 39.5]),
            ("lon", vec![-105.0, -104.5]),
            time,
            "K",
        )
        .unwrap();
        assert_eq!(field.get(0, 1), Some(2.0));
    }

    #[test]
    fn test_transposed_square_grid_rejected() {
        let values = NdArray::new(vec![1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let dims: Vec<String> = ["time", "lon", "lat"].iter().map(|d| d.to_string()).collect();
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let err = GridField::from_dimensions(
            values,
            &dims,
            ("lat", vec![40.0, 39.5]),
            ("lon", vec![-105.0, -104.5]),
            time,
            "K",
        )
        .unwrap_err();
        assert_eq!(err.code(), "AxisOrder");
    }

    #[test]
    fn test_meshgrid_small() {
        let mesh = meshgrid(&[10.0, 20.0], &[1.0, 2.0, 3.0]);
        assert_eq!(mesh.shape(), (2, 3));
        assert_eq!(mesh.point(1, 0), Some((20.0, 1.0)));
        assert_eq!(mesh.point(0, 2), Some((10.0, 3.0)));
    }
}
