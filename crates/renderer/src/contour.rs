//! Filled contour levels, band classification and grid sampling.
//!
//! A filled contour plot with `n` bands needs `n + 1` level boundaries. Levels
//! are placed on "nice" multiples of a step size chosen from the data range,
//! so colorbar ticks read as round numbers.

use grid_common::{LatLonMesh, NdArray};

use crate::colormap::{Color, Colormap};
use crate::error::{RenderError, RenderResult};

/// Smallest "nice" step (1, 2, 2.5 or 5 times a power of ten) that splits
/// `[min, max]` into at most `target` intervals.
pub fn nice_interval(min_value: f64, max_value: f64, target: usize) -> f64 {
    let range = max_value - min_value;
    if range <= 0.0 || !range.is_finite() || target == 0 {
        return 1.0;
    }

    let raw = range / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    for factor in [1.0, 2.0, 2.5, 5.0, 10.0] {
        let step = factor * magnitude;
        if step >= raw * (1.0 - 1e-9) {
            return step;
        }
    }
    10.0 * magnitude
}

/// Level boundaries for `bands` filled bands covering `[min, max]`.
///
/// The boundaries enclose the data range; the number of bands actually
/// produced is at most `bands` and at least one.
pub fn filled_levels(min_value: f64, max_value: f64, bands: usize) -> RenderResult<Vec<f64>> {
    if bands == 0 {
        return Err(RenderError::InvalidLevels(bands));
    }
    if !min_value.is_finite() || !max_value.is_finite() {
        return Err(RenderError::InvalidCoordinates(format!(
            "non-finite data range {}..{}",
            min_value, max_value
        )));
    }
    if max_value <= min_value {
        // Constant field: one band around the value
        return Ok(vec![min_value - 0.5, min_value + 0.5]);
    }
    if bands == 1 {
        return Ok(vec![min_value, max_value]);
    }

    let mut step = nice_interval(min_value, max_value, bands);
    loop {
        let lo = (min_value / step).floor() as i64;
        let hi = (max_value / step).ceil() as i64;
        let hi = if hi == lo { lo + 1 } else { hi };
        if (hi - lo) as usize <= bands {
            return Ok((lo..=hi).map(|k| k as f64 * step).collect());
        }
        // Rounding outward added a band; take the next nice step.
        step = nice_interval(0.0, step * 1.5, 1);
    }
}

/// Level boundaries paired with one fill color per band.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourSet {
    pub levels: Vec<f64>,
    pub colors: Vec<Color>,
    pub colormap: Colormap,
}

impl ContourSet {
    pub fn new(levels: Vec<f64>, colormap: Colormap) -> RenderResult<Self> {
        if levels.len() < 2 {
            return Err(RenderError::InvalidLevels(levels.len()));
        }
        let colors = colormap.discrete(levels.len() - 1);
        Ok(Self {
            levels,
            colors,
            colormap,
        })
    }

    pub fn band_count(&self) -> usize {
        self.colors.len()
    }

    /// Band holding `value`: `levels[i] <= value < levels[i + 1]`, with the
    /// top boundary belonging to the last band.
    pub fn band_index(&self, value: f64) -> Option<usize> {
        let first = *self.levels.first()?;
        let last = *self.levels.last()?;
        if value.is_nan() || value < first || value > last {
            return None;
        }
        let idx = self.levels.partition_point(|&l| l <= value);
        Some(idx.saturating_sub(1).min(self.band_count() - 1))
    }

    pub fn color_for(&self, value: f64) -> Option<Color> {
        self.band_index(value).map(|i| self.colors[i])
    }
}

/// Bilinear sampler over a rectilinear lat/lon grid.
#[derive(Debug, Clone)]
pub struct GridSampler<'a> {
    lats: Vec<f64>,
    lons: Vec<f64>,
    values: &'a NdArray,
}

impl<'a> GridSampler<'a> {
    /// Check the mesh and values agree and recover the 1-D axes.
    pub fn new(mesh: &LatLonMesh, values: &'a NdArray) -> RenderResult<Self> {
        let lat_shape = mesh.lat2d.shape();
        let lon_shape = mesh.lon2d.shape();
        if lat_shape.len() != 2 {
            return Err(RenderError::ShapeMismatch {
                context: "latitude grid must be 2-D".to_string(),
                expected: vec![0, 0],
                actual: lat_shape.to_vec(),
            });
        }
        if lon_shape != lat_shape {
            return Err(RenderError::ShapeMismatch {
                context: "longitude grid vs latitude grid".to_string(),
                expected: lat_shape.to_vec(),
                actual: lon_shape.to_vec(),
            });
        }
        if values.shape() != lat_shape {
            return Err(RenderError::ShapeMismatch {
                context: "value grid vs coordinate grids".to_string(),
                expected: lat_shape.to_vec(),
                actual: values.shape().to_vec(),
            });
        }

        let (rows, cols) = (lat_shape[0], lat_shape[1]);
        let lats: Vec<f64> = (0..rows).filter_map(|i| mesh.lat2d.get2(i, 0)).collect();
        let lons: Vec<f64> = (0..cols).filter_map(|j| mesh.lon2d.get2(0, j)).collect();

        for (name, axis) in [("latitude", &lats), ("longitude", &lons)] {
            if !is_strictly_monotonic(axis) {
                return Err(RenderError::InvalidCoordinates(format!(
                    "{} axis is not strictly monotonic",
                    name
                )));
            }
        }

        Ok(Self { lats, lons, values })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.lats.len(), self.lons.len())
    }

    /// True when the grid spans an area (at least 2x2 points).
    pub fn has_area(&self) -> bool {
        self.lats.len() >= 2 && self.lons.len() >= 2
    }

    /// Interpolated value at `(lat, lon)`; `None` outside the grid or when a
    /// neighbouring cell is missing.
    pub fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
        let fy = fractional_index(&self.lats, lat)?;
        let fx = fractional_index(&self.lons, lon)?;

        let y1 = fy.floor() as usize;
        let x1 = fx.floor() as usize;
        let y2 = (y1 + 1).min(self.lats.len() - 1);
        let x2 = (x1 + 1).min(self.lons.len() - 1);
        let dy = fy - y1 as f64;
        let dx = fx - x1 as f64;

        let v11 = self.values.get2(y1, x1)?;
        let v21 = self.values.get2(y1, x2)?;
        let v12 = self.values.get2(y2, x1)?;
        let v22 = self.values.get2(y2, x2)?;

        let v1 = v11 * (1.0 - dx) + v21 * dx;
        let v2 = v12 * (1.0 - dx) + v22 * dx;
        let value = v1 * (1.0 - dy) + v2 * dy;
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

fn is_strictly_monotonic(axis: &[f64]) -> bool {
    if axis.iter().any(|v| !v.is_finite()) {
        return false;
    }
    axis.windows(2).all(|w| w[1] > w[0]) || axis.windows(2).all(|w| w[1] < w[0])
}

/// Fractional position of `v` along a monotonic axis, `None` if outside it.
fn fractional_index(axis: &[f64], v: f64) -> Option<f64> {
    match axis {
        [] => None,
        [only] => (*only == v).then_some(0.0),
        _ => {
            let ascending = axis[axis.len() - 1] > axis[0];
            let (lo, hi) = if ascending {
                (axis[0], axis[axis.len() - 1])
            } else {
                (axis[axis.len() - 1], axis[0])
            };
            if v.is_nan() || v < lo || v > hi {
                return None;
            }

            let i = if ascending {
                axis.partition_point(|&a| a <= v)
            } else {
                axis.partition_point(|&a| a >= v)
            };
            let i = i.clamp(1, axis.len() - 1);
            let (a0, a1) = (axis[i - 1], axis[i]);
            Some((i - 1) as f64 + (v - a0) / (a1 - a0))
        }
    }
}
