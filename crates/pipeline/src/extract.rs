//! Turning a decoded subset response into a display-ready grid.

use chrono::{DateTime, Utc};
use grid_common::{
    meshgrid, BoundingBox, CfTimeUnits, GridError, GridField, LatLonMesh, NdArray, UnitTransform,
};
use netcdf_parser::{SubsetResponse, Variable};
use tracing::{debug, warn};

use crate::config::CoordinateNames;
use crate::error::{PipelineError, PipelineResult};

/// Fallback names tried when the configured lat/lon variables are absent.
const LAT_FALLBACKS: &[&str] = &["lat", "latitude"];
const LON_FALLBACKS: &[&str] = &["lon", "longitude"];

/// Pull `variable` and its coordinates out of `response` as a grid field in
/// the variable's native units.
///
/// The time coordinate is whichever name sits at `names.time_index` in the
/// variable's declared `coordinates` list. Longitudes are shifted into the
/// convention of `extent` (servers often answer in 0..360).
pub fn extract_field(
    response: &SubsetResponse,
    variable: &str,
    names: &CoordinateNames,
    extent: &BoundingBox,
) -> PipelineResult<GridField> {
    let data = response.get(variable).ok_or_else(|| {
        PipelineError::variable_not_found(
            variable,
            format!(
                "absent from response (variables: {})",
                response.names().collect::<Vec<_>>().join(", ")
            ),
        )
    })?;

    let time = forecast_time(response, data, names.time_index)?;
    let (lat_dim, lats) = coordinate_vector(response, variable, &names.lat, LAT_FALLBACKS)?;
    let (lon_dim, lons) = coordinate_vector(response, variable, &names.lon, LON_FALLBACKS)?;
    let lons = align_longitudes(lons, extent.center().1);

    let units = data.units.clone().unwrap_or_default();
    let field = match (lat_dim, lon_dim) {
        (Some(lat_dim), Some(lon_dim)) => GridField::from_dimensions(
            data.data.clone(),
            &data.dimensions,
            (&lat_dim, lats),
            (&lon_dim, lons),
            time,
            units,
        ),
        // Scalar coordinates name no dimension; only the shape can be checked.
        _ => GridField::new(data.data.squeeze(), lats, lons, time, units),
    };
    field.map_err(|e| {
        PipelineError::render_mismatch(
            format!("{} does not fit its lat/lon axes", variable),
            Some(e.into()),
        )
    })
}

/// Decode the variable's time coordinate to a single instant.
pub fn forecast_time(
    response: &SubsetResponse,
    data: &Variable,
    time_index: usize,
) -> PipelineResult<DateTime<Utc>> {
    let name = data.coordinate(time_index).ok_or_else(|| {
        PipelineError::variable_not_found(
            &data.name,
            format!(
                "no coordinate at position {} in {:?}",
                time_index, data.coordinates
            ),
        )
    })?;

    let time_var = response.get(name).ok_or_else(|| {
        PipelineError::variable_not_found(
            &data.name,
            format!("time coordinate {} absent from response", name),
        )
    })?;

    let values = time_var.data.squeeze();
    let value = match values.values() {
        [] => {
            return Err(PipelineError::variable_not_found(
                &data.name,
                format!("time coordinate {} is empty", name),
            ))
        }
        [only] => *only,
        [first, ..] => {
            warn!(
                coordinate = name,
                count = values.len(),
                "Several times returned; using the first"
            );
            *first
        }
    };

    let units = time_var.units.as_deref().ok_or_else(|| {
        PipelineError::variable_not_found(
            &data.name,
            format!("time coordinate {} has no units", name),
        )
    })?;

    let time = CfTimeUnits::parse(units)
        .and_then(|u| u.to_datetime(value))
        .map_err(|e: GridError| {
            PipelineError::variable_not_found(
                &data.name,
                format!("time coordinate {} cannot be decoded: {}", name, e),
            )
        })?;

    debug!(coordinate = name, value, units, time = %time, "Forecast time resolved");
    Ok(time)
}

/// 1-D coordinate values of `preferred`, or of the first fallback present,
/// with the name of the dimension they run along.
fn coordinate_vector(
    response: &SubsetResponse,
    variable: &str,
    preferred: &str,
    fallbacks: &[&str],
) -> PipelineResult<(Option<String>, Vec<f64>)> {
    let found = std::iter::once(preferred)
        .chain(fallbacks.iter().copied())
        .find_map(|name| response.get(name));

    let coord = found.ok_or_else(|| {
        PipelineError::variable_not_found(
            variable,
            format!("coordinate {} absent from response", preferred),
        )
    })?;

    let squeezed = coord.data.squeeze();
    if squeezed.ndim() > 1 {
        return Err(PipelineError::render_mismatch(
            format!(
                "coordinate {} is not one-dimensional: shape {:?}",
                coord.name,
                squeezed.shape()
            ),
            None,
        ));
    }
    let dim = coord
        .dimensions
        .iter()
        .zip(coord.data.shape())
        .max_by_key(|(_, len)| **len)
        .map(|(name, _)| name.clone());
    Ok((dim, squeezed.into_values()))
}

/// Shift each longitude by a multiple of 360 so it lies within 180 degrees
/// of `reference`.
pub fn align_longitudes(lons: Vec<f64>, reference: f64) -> Vec<f64> {
    lons.into_iter()
        .map(|lon| lon - 360.0 * ((lon - reference) / 360.0).round())
        .collect()
}

/// Apply the display transform to every value.
pub fn convert_units(field: &GridField, transform: UnitTransform) -> GridField {
    field.convert(|v| transform.apply(v), transform.display_units(field.units()))
}

/// Paired 2-D lat/lon grids for a field.
pub fn build_mesh(field: &GridField) -> LatLonMesh {
    meshgrid(field.lats(), field.lons())
}

/// Check the mesh and value grid share one 2-D shape.
pub fn check_render_inputs(mesh: &LatLonMesh, values: &NdArray) -> PipelineResult<()> {
    let lat_shape = mesh.lat2d.shape();
    if lat_shape.len() != 2 || mesh.lon2d.shape() != lat_shape || values.shape() != lat_shape {
        return Err(PipelineError::render_mismatch(
            format!(
                "lat {:?}, lon {:?} and values {:?} must share one 2-D shape",
                lat_shape,
                mesh.lon2d.shape(),
                values.shape()
            ),
            None,
        ));
    }
    Ok(())
}

/// `"Temperature (°F) forecast for 15 January 2024 12:00Z"`.
pub fn format_title(label: &str, units: &str, time: DateTime<Utc>) -> String {
    format!(
        "{} ({}) forecast for {}",
        label,
        units,
        time.format("%d %B %Y %H:%MZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn colorado() -> BoundingBox {
        BoundingBox::new(43.0, 35.0, -100.0, -111.0)
    }

    /// Coordinate variable along a dimension of its own name.
    fn var(name: &str, shape: Vec<usize>, values: Vec<f64>) -> Variable {
        let dims = shape.iter().map(|_| name.to_string()).collect();
        Variable::new(name, dims, NdArray::new(shape, values).unwrap())
    }

    fn grid_var(name: &str, dims: &[&str], shape: Vec<usize>, values: Vec<f64>) -> Variable {
        let dims = dims.iter().map(|d| d.to_string()).collect();
        Variable::new(name, dims, NdArray::new(shape, values).unwrap())
    }

    fn response(time_name: &str) -> SubsetResponse {
        SubsetResponse::from_variables([
            grid_var(
                "Temperature_surface",
                &[time_name, "lat", "lon"],
                vec![1, 2, 3],
                vec![270.0, 271.0, 272.0, 273.0, 274.0, 275.0],
            )
            .with_coordinates(&format!("reftime {} lat lon", time_name))
            .with_units("K"),
            var(time_name, vec![1], vec![12.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
            var("reftime", vec![], vec![0.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
            var("lat", vec![2], vec![40.0, 39.75]),
            var("lon", vec![3], vec![255.0, 255.25, 255.5]),
        ])
    }

    #[test]
    fn test_extract_uses_positional_time() {
        let names = CoordinateNames::default();
        let field =
            extract_field(&response("time1"), "Temperature_surface", &names, &colorado()).unwrap();
        assert_eq!(field.shape(), (2, 3));
        assert_eq!(field.time(), Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(field.units(), "K");
        assert_eq!(field.lons(), &[-105.0, -104.75, -104.5]);
    }

    #[test]
    fn test_align_longitudes() {
        assert_eq!(align_longitudes(vec![249.0, 260.0], -105.5), vec![-111.0, -100.0]);
        assert_eq!(align_longitudes(vec![-111.0, -100.0], -105.5), vec![-111.0, -100.0]);
        assert_eq!(align_longitudes(vec![-10.0, 10.0], 180.0), vec![350.0, 10.0]);
    }

    #[test]
    fn test_time_index_out_of_range() {
        let names = CoordinateNames {
            time_index: 7,
            ..CoordinateNames::default()
        };
        let err =
            extract_field(&response("time"), "Temperature_surface", &names, &colorado()).unwrap_err();
        assert_eq!(err.kind(), "VariableNotFound");
    }

    #[test]
    fn test_latitude_fallback() {
        let mut resp = response("time");
        let lat = resp.variables.remove("lat").unwrap();
        resp.variables.insert(
            "latitude".to_string(),
            Variable {
                name: "latitude".to_string(),
                ..lat
            },
        );
        let names = CoordinateNames::default();
        let field = extract_field(&resp, "Temperature_surface", &names, &colorado()).unwrap();
        assert_eq!(field.lats(), &[40.0, 39.75]);
    }

    #[test]
    fn test_lon_lat_storage_order_rejected() {
        // Square grid: shape matches either way round
        let resp = SubsetResponse::from_variables([
            grid_var("Temperature_surface", &["time", "lon", "lat"], vec![1, 2, 2], vec![270.0; 4])
                .with_coordinates("reftime time lat lon")
                .with_units("K"),
            var("time", vec![1], vec![12.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
            var("reftime", vec![], vec![0.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
            var("lat", vec![2], vec![40.0, 39.75]),
            var("lon", vec![2], vec![255.0, 255.25]),
        ]);
        let names = CoordinateNames::default();
        let err = extract_field(&resp, "Temperature_surface", &names, &colorado()).unwrap_err();
        assert_eq!(err.kind(), "RenderInputMismatch");
    }

    #[test]
    fn test_undecodable_time_units() {
        let mut resp = response("time");
        resp.variables.get_mut("time").unwrap().units = Some("fortnights since 2024".to_string());
        let names = CoordinateNames::default();
        let err = extract_field(&resp, "Temperature_surface", &names, &colorado()).unwrap_err();
        assert_eq!(err.kind(), "VariableNotFound");
    }

    #[test]
    fn test_title_format() {
        let time = Utc.with_ymd_and_hms(2024, 1, 5, 6, 0, 0).unwrap();
        assert_eq!(
            format_title("Temperature", "\u{00b0}F", time),
            "Temperature (\u{00b0}F) forecast for 05 January 2024 06:00Z"
        );
    }

    #[test]
    fn test_check_render_inputs() {
        let mesh = meshgrid(&[1.0, 2.0], &[3.0, 4.0, 5.0]);
        assert!(check_render_inputs(&mesh, &NdArray::new(vec![2, 3], vec![0.0; 6]).unwrap()).is_ok());
        let err = check_render_inputs(&mesh, &NdArray::new(vec![3, 2], vec![0.0; 6]).unwrap()).unwrap_err();
        assert_eq!(err.kind(), "RenderInputMismatch");
    }
}
