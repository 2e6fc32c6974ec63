//! Synthetic forecast-like values and coordinate axes.

/// Creates a test grid with surface temperature values in Kelvin.
///
/// The values range from 250K in the top-left corner to just under 310K
/// in the bottom-right, a gradient similar to real surface temperatures.
///
/// # Returns
///
/// A `Vec<f64>` in row-major order.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f64 / width.max(1) as f64;
            let y_factor = row as f64 / height.max(1) as f64;
            data.push(250.0 + x_factor * 30.0 + y_factor * 30.0);
        }
    }
    data
}

/// Evenly spaced coordinate axis from `start` in steps of `step`.
///
/// NCSS returns latitude descending (north to south) for GFS, so a negative
/// `step` is common.
///
/// ```
/// use test_utils::create_axis;
///
/// assert_eq!(create_axis(43.0, -0.5, 3), vec![43.0, 42.5, 42.0]);
/// ```
pub fn create_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Latitude axis covering `north..=south` at `resolution` degrees, descending.
pub fn create_lat_axis(north: f64, south: f64, resolution: f64) -> Vec<f64> {
    let count = ((north - south) / resolution).round() as usize + 1;
    create_axis(north, -resolution, count)
}

/// Longitude axis covering `west..=east` at `resolution` degrees, ascending.
pub fn create_lon_axis(west: f64, east: f64, resolution: f64) -> Vec<f64> {
    let count = ((east - west) / resolution).round() as usize + 1;
    create_axis(west, resolution, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_temperature_grid() {
        let grid = create_temperature_grid(100, 100);
        assert_eq!(grid.len(), 10000);

        for &temp in &grid {
            assert!(temp >= 250.0 && temp <= 310.0, "Temperature {} out of range", temp);
        }
        assert!(grid[0] < grid[9999]);
    }

    #[test]
    fn test_lat_lon_axes() {
        let lats = create_lat_axis(43.0, 35.0, 0.25);
        assert_eq!(lats.len(), 33);
        assert_eq!(lats[0], 43.0);
        assert!((lats[32] - 35.0).abs() < 1e-9);

        let lons = create_lon_axis(-111.0, -100.0, 0.25);
        assert_eq!(lons.len(), 45);
        assert_eq!(lons[0], -111.0);
        assert!((lons[44] - -100.0).abs() < 1e-9);
    }
}
