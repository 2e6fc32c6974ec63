//! Run configuration for the forecast-map binary.
//!
//! Settings are layered: command-line flags win over `FORECAST_MAP_*`
//! environment variables (clap resolves those two), which win over the
//! optional YAML file, which wins over the built-in defaults.
//!
//! The YAML file supports `${VAR}` and `${VAR:-default}` substitution.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use grid_common::{parse_iso8601, BoundingBox, UnitTransform};
use pipeline::{CoordinateNames, DatasetSelector, PipelineConfig, TimeRequest};
use projection::ProjectionKind;
use renderer::{BoundaryResolution, Colormap, RendererConfig};
use serde::Deserialize;
use thredds_client::ResponseFormat;

/// Written when neither a flag nor the config file names an output.
pub const DEFAULT_OUTPUT: &str = "forecast_map.png";

#[derive(Parser, Debug)]
#[command(name = "forecast-map")]
#[command(about = "Fetch a forecast grid subset from a THREDDS server and render it as a PNG map")]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "FORECAST_MAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// THREDDS catalog URL
    #[arg(long, env = "FORECAST_MAP_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Dataset name or ID, or "first"
    #[arg(long, env = "FORECAST_MAP_DATASET")]
    pub dataset: Option<String>,

    /// Variable to fetch
    #[arg(long, env = "FORECAST_MAP_VARIABLE")]
    pub variable: Option<String>,

    /// Bounding box as north,south,east,west
    #[arg(long, env = "FORECAST_MAP_BBOX", value_parser = parse_bbox)]
    pub bbox: Option<BoundingBox>,

    /// Forecast time (ISO 8601) or "now"
    #[arg(long, env = "FORECAST_MAP_TIME", value_parser = parse_time)]
    pub time: Option<TimeRequest>,

    /// Number of contour levels
    #[arg(long, env = "FORECAST_MAP_LEVELS")]
    pub levels: Option<usize>,

    #[arg(long, env = "FORECAST_MAP_COLORMAP")]
    pub colormap: Option<Colormap>,

    /// plate_carree, mercator or lambert_conformal
    #[arg(long, env = "FORECAST_MAP_PROJECTION", value_parser = ProjectionKind::from_name)]
    pub projection: Option<ProjectionKind>,

    /// Boundary detail: 110m, 50m or 10m
    #[arg(long, env = "FORECAST_MAP_RESOLUTION")]
    pub resolution: Option<BoundaryResolution>,

    /// Display units: fahrenheit, celsius or native
    #[arg(long, env = "FORECAST_MAP_UNITS", value_parser = parse_units)]
    pub units: Option<UnitTransform>,

    /// GeoJSON boundary overlay
    #[arg(long, env = "FORECAST_MAP_BOUNDARIES")]
    pub boundaries: Option<PathBuf>,

    /// TrueType font for the title and labels
    #[arg(long, env = "FORECAST_MAP_FONT")]
    pub font: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, env = "FORECAST_MAP_OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(long, env = "FORECAST_MAP_WIDTH")]
    pub width: Option<u32>,

    #[arg(long, env = "FORECAST_MAP_HEIGHT")]
    pub height: Option<u32>,

    /// Do not mark grid sample points
    #[arg(long, env = "FORECAST_MAP_NO_SCATTER")]
    pub no_scatter: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "FORECAST_MAP_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", env = "FORECAST_MAP_LOG_LEVEL")]
    pub log_level: String,

    /// Emit JSON log lines
    #[arg(long, env = "FORECAST_MAP_LOG_JSON")]
    pub log_json: bool,
}

fn parse_bbox(s: &str) -> Result<BoundingBox, grid_common::bbox::BboxParseError> {
    BoundingBox::from_nsew_string(s)
}

fn parse_time(s: &str) -> Result<TimeRequest, String> {
    if s.trim().eq_ignore_ascii_case("now") {
        return Ok(TimeRequest::Now);
    }
    parse_iso8601(s.trim())
        .map(TimeRequest::At)
        .ok_or_else(|| format!("expected an ISO 8601 time or \"now\", got {:?}", s))
}

fn parse_units(s: &str) -> Result<UnitTransform, String> {
    UnitTransform::from_name(s).ok_or_else(|| format!("unknown units: {}", s))
}

// ============================================================================
// YAML file
// ============================================================================

/// Contents of the YAML configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub catalog_url: Option<String>,
    pub dataset: Option<String>,
    pub variable: Option<String>,
    pub variable_label: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub time: Option<String>,
    pub format: Option<ResponseFormat>,
    pub units: Option<String>,
    pub coordinates: Option<CoordinatesSection>,
    pub render: RenderSection,
    pub boundaries: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatesSection {
    pub time_index: Option<usize>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSection {
    pub levels: Option<usize>,
    pub colormap: Option<Colormap>,
    pub projection: Option<ProjectionKind>,
    pub boundary_resolution: Option<BoundaryResolution>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scatter: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&expanded)?)
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            bail!("Unclosed variable substitution: ${{{}", after);
        };
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr.trim()))
    }
}

// ============================================================================
// Layered result
// ============================================================================

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub renderer: RendererConfig,
    pub output: PathBuf,
    pub timeout: Option<Duration>,
}

impl AppConfig {
    /// Read the config file named by `args` (if any) and layer `args` over it.
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::layer(args, file)
    }

    pub fn layer(args: &Args, file: FileConfig) -> Result<Self> {
        let mut pipeline = PipelineConfig::default();

        if let Some(url) = args.catalog_url.clone().or(file.catalog_url) {
            pipeline.catalog_url = url;
        }
        if let Some(dataset) = args.dataset.as_deref().or(file.dataset.as_deref()) {
            pipeline.dataset = DatasetSelector::from_arg(dataset);
        }
        if let Some(variable) = args.variable.clone().or(file.variable) {
            pipeline.variable = variable;
        }
        if let Some(label) = file.variable_label {
            pipeline.variable_label = label;
        }
        if let Some(bbox) = args.bbox.or(file.bbox) {
            pipeline.bbox = bbox;
        }

        let file_time = file
            .time
            .as_deref()
            .map(parse_time)
            .transpose()
            .map_err(anyhow::Error::msg)
            .context("Invalid time in config file")?;
        if let Some(time) = args.time.or(file_time) {
            pipeline.time = time;
        }

        if let Some(format) = file.format {
            pipeline.format = format;
        }

        let file_units = file
            .units
            .as_deref()
            .map(parse_units)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        if let Some(units) = args.units.or(file_units) {
            pipeline.units = units;
        }

        if let Some(coords) = file.coordinates {
            let defaults = CoordinateNames::default();
            pipeline.coordinates = CoordinateNames {
                time_index: coords.time_index.unwrap_or(defaults.time_index),
                lat: coords.lat.unwrap_or(defaults.lat),
                lon: coords.lon.unwrap_or(defaults.lon),
            };
        }

        let render = &mut pipeline.render;
        let section = file.render;
        if let Some(levels) = args.levels.or(section.levels) {
            if levels == 0 {
                bail!("levels must be at least 1");
            }
            render.levels = levels;
        }
        if let Some(colormap) = args.colormap.or(section.colormap) {
            render.colormap = colormap;
        }
        if let Some(projection) = args.projection.or(section.projection) {
            render.projection = projection;
        }
        if let Some(resolution) = args.resolution.or(section.boundary_resolution) {
            render.boundary_resolution = resolution;
        }
        if let Some(width) = args.width.or(section.width) {
            render.width = width;
        }
        if let Some(height) = args.height.or(section.height) {
            render.height = height;
        }
        if args.no_scatter {
            render.scatter = false;
        } else if let Some(scatter) = section.scatter {
            render.scatter = scatter;
        }

        let timeout = match args.timeout_secs.or(file.timeout_secs) {
            Some(0) => bail!("timeout must be at least one second"),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            pipeline,
            renderer: RendererConfig {
                boundaries_path: args.boundaries.clone().or(file.boundaries),
                font_path: args.font.clone().or(file.font),
            },
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["forecast-map"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    const YAML: &str = r#"
catalog_url: https://thredds.example.org/thredds/catalog.xml
dataset: gfs/Best
variable: Temperature_height_above_ground
variable_label: 2 m temperature
bbox: { north: 50.0, south: 30.0, east: -90.0, west: -120.0 }
time: 2024-01-15T12:00:00Z
units: celsius
coordinates:
  time_index: 2
render:
  levels: 12
  colormap: viridis
  projection: mercator
  boundary_resolution: 10m
  scatter: false
boundaries: /data/states.geojson
output: out/map.png
timeout_secs: 30
"#;

    #[test]
    fn test_defaults_without_file_or_flags() {
        let config = AppConfig::layer(&args(&[]), FileConfig::default()).unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert!(config.timeout.is_none());
        assert!(config.renderer.boundaries_path.is_none());
    }

    #[test]
    fn test_file_values_applied() {
        let file = FileConfig::from_yaml(YAML).unwrap();
        let config = AppConfig::layer(&args(&[]), file).unwrap();
        let p = &config.pipeline;

        assert_eq!(p.catalog_url, "https://thredds.example.org/thredds/catalog.xml");
        assert_eq!(p.dataset, DatasetSelector::Named("gfs/Best".to_string()));
        assert_eq!(p.variable, "Temperature_height_above_ground");
        assert_eq!(p.variable_label, "2 m temperature");
        assert_eq!(p.bbox, BoundingBox::new(50.0, 30.0, -90.0, -120.0));
        assert_eq!(
            p.time,
            TimeRequest::At(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(p.units, UnitTransform::KelvinToCelsius);
        assert_eq!(p.coordinates.time_index, 2);
        assert_eq!(p.coordinates.lat, "lat");
        assert_eq!(p.render.levels, 12);
        assert_eq!(p.render.colormap, Colormap::Viridis);
        assert_eq!(p.render.projection, ProjectionKind::Mercator);
        assert_eq!(p.render.boundary_resolution, BoundaryResolution::Fine);
        assert!(!p.render.scatter);
        assert_eq!(
            config.renderer.boundaries_path,
            Some(PathBuf::from("/data/states.geojson"))
        );
        assert_eq!(config.output, PathBuf::from("out/map.png"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig::from_yaml(YAML).unwrap();
        let config = AppConfig::layer(
            &args(&[
                "--variable",
                "Temperature_surface",
                "--bbox",
                "43,35,-100,-111",
                "--time",
                "now",
                "--levels",
                "8",
                "--projection",
                "lambert",
                "--colormap",
                "coolwarm",
                "--dataset",
                "first",
                "-o",
                "flag.png",
            ]),
            file,
        )
        .unwrap();
        let p = &config.pipeline;

        assert_eq!(p.variable, "Temperature_surface");
        assert_eq!(p.bbox, BoundingBox::new(43.0, 35.0, -100.0, -111.0));
        assert_eq!(p.time, TimeRequest::Now);
        assert_eq!(p.dataset, DatasetSelector::First);
        assert_eq!(p.render.levels, 8);
        assert_eq!(p.render.projection, ProjectionKind::LambertConformal);
        assert_eq!(p.render.colormap, Colormap::Coolwarm);
        assert_eq!(config.output, PathBuf::from("flag.png"));
        // Untouched by flags
        assert_eq!(p.render.boundary_resolution, BoundaryResolution::Fine);
    }

    #[test]
    fn test_bad_flags_rejected() {
        for (flag, value) in [
            ("--bbox", "35,43,-100,-111"),
            ("--time", "yesterday"),
            ("--projection", "polar"),
            ("--colormap", "rainbow"),
            ("--units", "rankine"),
        ] {
            assert!(
                Args::try_parse_from(["forecast-map", flag, value]).is_err(),
                "{} {} accepted",
                flag,
                value
            );
        }
    }

    #[test]
    fn test_zero_levels_rejected() {
        let err = AppConfig::layer(&args(&["--levels", "0"]), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("levels"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(FileConfig::from_yaml("colour_map: viridis\n").is_err());
    }

    #[test]
    fn test_empty_file() {
        let file = FileConfig::from_yaml("").unwrap();
        assert!(file.catalog_url.is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast-map.yaml");
        fs::write(&path, "variable: Pressure_surface\nunits: native\n").unwrap();

        let config = AppConfig::load(&args(&["--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(config.pipeline.variable, "Pressure_surface");
        assert_eq!(config.pipeline.units, UnitTransform::Identity);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(&args(&["--config", "/nonexistent/forecast-map.yaml"]))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/forecast-map.yaml"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("FORECAST_MAP_TEST_VARIABLE", "Temperature_surface");
        std::env::remove_var("FORECAST_MAP_TEST_UNSET");
        assert_eq!(
            expand_env_vars("variable: ${FORECAST_MAP_TEST_VARIABLE}").unwrap(),
            "variable: Temperature_surface"
        );
        assert_eq!(
            expand_env_vars("levels: ${FORECAST_MAP_TEST_UNSET:-20}").unwrap(),
            "levels: 20"
        );
        assert!(expand_env_vars("${FORECAST_MAP_TEST_UNSET}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }
}
