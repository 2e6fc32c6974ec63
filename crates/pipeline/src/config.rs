//! Run configuration for the pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use grid_common::{BoundingBox, UnitTransform};
use projection::ProjectionKind;
use renderer::{BoundaryResolution, Colormap};
use serde::{Deserialize, Serialize};
use thredds_client::{DatasetHandle, ResponseFormat};

/// GFS 0.25 degree "Best" time series on the Unidata THREDDS server.
pub const DEFAULT_CATALOG_URL: &str = "https://thredds.ucar.edu/thredds/catalog/grib/NCEP/GFS/Global_0p25deg/catalog.xml?dataset=grib/NCEP/GFS/Global_0p25deg/Best";

pub const DEFAULT_VARIABLE: &str = "Temperature_surface";

/// How the dataset is picked from the resolved catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSelector {
    /// First dataset listed
    #[default]
    First,
    /// Dataset whose name or ID matches exactly
    Named(String),
}

impl DatasetSelector {
    /// `"first"` (any case) or an empty string selects the first dataset.
    pub fn from_arg(arg: &str) -> Self {
        let trimmed = arg.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("first") {
            Self::First
        } else {
            Self::Named(trimmed.to_string())
        }
    }

    pub fn select<'a>(&self, datasets: &'a [DatasetHandle]) -> Option<&'a DatasetHandle> {
        match self {
            Self::First => datasets.first(),
            Self::Named(name) => datasets.iter().find(|d| d.matches(name)),
        }
    }
}

impl fmt::Display for DatasetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Time the subset is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRequest {
    /// Sampled from the pipeline clock when the query is built
    #[default]
    Now,
    At(DateTime<Utc>),
}

/// Where each coordinate is looked up in the subset response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateNames {
    /// Position of the time coordinate in the variable's `coordinates` list
    pub time_index: usize,
    pub lat: String,
    pub lon: String,
}

impl Default for CoordinateNames {
    fn default() -> Self {
        Self {
            time_index: 1,
            lat: "lat".to_string(),
            lon: "lon".to_string(),
        }
    }
}

/// Figure settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub levels: usize,
    pub colormap: Colormap,
    pub projection: ProjectionKind,
    pub boundary_resolution: BoundaryResolution,
    pub width: u32,
    pub height: u32,
    pub scatter: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            levels: 20,
            colormap: Colormap::Coolwarm,
            projection: ProjectionKind::LambertConformal,
            boundary_resolution: BoundaryResolution::Medium,
            width: 1200,
            height: 900,
            scatter: true,
        }
    }
}

/// Everything one run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub catalog_url: String,
    pub dataset: DatasetSelector,
    pub variable: String,
    /// Label used in the title, e.g. "Temperature"
    pub variable_label: String,
    pub bbox: BoundingBox,
    pub time: TimeRequest,
    pub format: ResponseFormat,
    pub coordinates: CoordinateNames,
    pub units: UnitTransform,
    pub render: RenderOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            dataset: DatasetSelector::First,
            variable: DEFAULT_VARIABLE.to_string(),
            variable_label: "Temperature".to_string(),
            bbox: BoundingBox::new(43.0, 35.0, -100.0, -111.0),
            time: TimeRequest::Now,
            format: ResponseFormat::NetCdf4,
            coordinates: CoordinateNames::default(),
            units: UnitTransform::KelvinToFahrenheit,
            render: RenderOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thredds_client::AccessEndpoint;

    fn handle(name: &str, id: Option<&str>) -> DatasetHandle {
        DatasetHandle {
            name: name.to_string(),
            id: id.map(str::to_string),
            url_path: None,
            access: Vec::<AccessEndpoint>::new(),
        }
    }

    #[test]
    fn test_selector_from_arg() {
        assert_eq!(DatasetSelector::from_arg("first"), DatasetSelector::First);
        assert_eq!(DatasetSelector::from_arg(""), DatasetSelector::First);
        assert_eq!(
            DatasetSelector::from_arg("Best GFS Half Degree Forecast Time Series"),
            DatasetSelector::Named("Best GFS Half Degree Forecast Time Series".to_string())
        );
    }

    #[test]
    fn test_selector_matches_name_or_id() {
        let datasets = vec![
            handle("Full Collection (Reference / Forecast Time) Dataset", Some("gfs/TwoD")),
            handle("Best GFS Quarter Degree Forecast Time Series", Some("gfs/Best")),
        ];
        assert_eq!(DatasetSelector::First.select(&datasets), Some(&datasets[0]));
        assert_eq!(
            DatasetSelector::Named("gfs/Best".to_string()).select(&datasets),
            Some(&datasets[1])
        );
        assert_eq!(DatasetSelector::Named("gfs".to_string()).select(&datasets), None);
        assert_eq!(DatasetSelector::First.select(&[]), None);
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.variable, "Temperature_surface");
        assert_eq!(config.format, ResponseFormat::NetCdf4);
        assert_eq!(config.render.levels, 20);
        assert_eq!(config.coordinates.time_index, 1);
        assert!(config.bbox.validate().is_ok());
    }
}
