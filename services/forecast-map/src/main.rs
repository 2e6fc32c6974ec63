//! Forecast map generator.
//!
//! Resolves a THREDDS catalog, fetches a bounding-box subset of one forecast
//! variable through the NetCDF Subset Service and writes it as a PNG map.

mod config;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pipeline::Pipeline;
use renderer::MapRenderer;
use thredds_client::{ClientConfig, ThreddsClient};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use config::{AppConfig, Args};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    // Before libnetcdf touches any file
    netcdf_parser::silence_hdf5_errors();

    let config = AppConfig::load(&args)?;
    info!(
        catalog = %config.pipeline.catalog_url,
        dataset = %config.pipeline.dataset,
        variable = %config.pipeline.variable,
        bbox = ?config.pipeline.bbox,
        output = %config.output.display(),
        "Starting forecast map run"
    );

    let mut client_config = ClientConfig::default();
    if let Some(timeout) = config.timeout {
        client_config.request_timeout = timeout;
    }
    let client = ThreddsClient::new(client_config).context("Failed to build HTTP client")?;
    let renderer = MapRenderer::new(&config.renderer);

    let pipeline = Pipeline::new(client, renderer, config.pipeline.clone());
    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Forecast map run failed");
            return Err(e.into());
        }
    };

    let png = report.output.to_png().context("Failed to encode PNG")?;
    write_output(&config.output, &png)?;

    info!(
        dataset = %report.dataset,
        forecast_time = %report.forecast_time,
        grid = ?report.grid_shape,
        range = ?report.value_range,
        levels = report.output.levels.len(),
        bytes = png.len(),
        path = %config.output.display(),
        "Forecast map written"
    );
    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn write_output(path: &Path, png: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, png).with_context(|| format!("Failed to write: {}", path.display()))
}
