//! NetCDF decoding for NetCDF Subset Service (NCSS) responses.
//!
//! An NCSS grid request returns a small NetCDF-3 or NetCDF-4 file holding the
//! requested variables plus every coordinate variable they reference. This
//! crate turns those bytes into a [`SubsetResponse`]: a name-keyed map of
//! [`Variable`]s with their dimensions, units, parsed `coordinates` list and
//! unpacked values.
//!
//! # NCSS Response Structure
//!
//! A typical GFS surface temperature subset looks like:
//!
//! ```text
//! float Temperature_surface(time=1, latitude=33, longitude=45);
//!     :units = "K";
//!     :coordinates = "reftime time latitude longitude ";
//! double time(time=1);
//!     :units = "Hour since 2024-01-15T00:00:00Z";
//! ```
//!
//! The coordinate list is ordered, so callers look coordinates up by position
//! rather than by name.

pub mod error;
pub mod native;

use std::collections::BTreeMap;

use grid_common::NdArray;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{decode_subset_bytes, decode_subset_file, silence_hdf5_errors};

/// One decoded variable of a subset response.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Dimension names in storage order
    pub dimensions: Vec<String>,
    /// Entries of the CF `coordinates` attribute, in declared order
    pub coordinates: Vec<String>,
    pub units: Option<String>,
    /// Values with fill/missing as NaN and packing undone
    pub data: NdArray,
}

impl Variable {
    pub fn new(name: impl Into<String>, dimensions: Vec<String>, data: NdArray) -> Self {
        Self {
            name: name.into(),
            dimensions,
            coordinates: Vec::new(),
            units: None,
            data,
        }
    }

    /// Set the coordinate list from a raw `coordinates` attribute.
    pub fn with_coordinates(mut self, attribute: &str) -> Self {
        self.coordinates = parse_coordinates(attribute);
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Name of the coordinate at `index` in the declared list.
    pub fn coordinate(&self, index: usize) -> Option<&str> {
        self.coordinates.get(index).map(String::as_str)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }
}

/// All variables returned by one subset request, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubsetResponse {
    pub variables: BTreeMap<String, Variable>,
}

impl SubsetResponse {
    pub fn from_variables(variables: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            variables: variables
                .into_iter()
                .map(|v| (v.name.clone(), v))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Split a CF `coordinates` attribute into names, keeping order.
pub fn parse_coordinates(attribute: &str) -> Vec<String> {
    attribute.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates_keeps_order() {
        assert_eq!(
            parse_coordinates("reftime time latitude longitude "),
            vec!["reftime", "time", "latitude", "longitude"]
        );
        assert!(parse_coordinates("   ").is_empty());
    }

    #[test]
    fn test_response_lookup() {
        let response = SubsetResponse::from_variables([
            Variable::new("lat", vec!["lat".into()], NdArray::from_vec(vec![40.0])),
            Variable::new("lon", vec!["lon".into()], NdArray::from_vec(vec![-105.0])),
        ]);
        assert_eq!(response.len(), 2);
        assert!(response.contains("lat"));
        assert!(response.get("Temperature_surface").is_none());
        assert_eq!(response.names().collect::<Vec<_>>(), vec!["lat", "lon"]);
    }

    #[test]
    fn test_positional_coordinate() {
        let var = Variable::new("T", vec![], NdArray::scalar(280.0)).with_coordinates("time1 lat lon");
        assert_eq!(var.coordinate(0), Some("time1"));
        assert_eq!(var.coordinate(3), None);
    }
}
