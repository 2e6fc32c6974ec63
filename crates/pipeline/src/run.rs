//! The fetch-and-render run, step by step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use renderer::RenderSpec;
use thredds_client::{CatalogReference, DatasetHandle, NcssQuery, ThreddsError};
use tracing::{info, instrument, warn};

use crate::collaborators::{CatalogClient, Clock, RenderBackend, SubsetService, SystemClock};
use crate::config::{DatasetSelector, PipelineConfig, TimeRequest};
use crate::error::{CollaboratorError, PipelineError, PipelineResult};
use crate::extract::{build_mesh, check_render_inputs, convert_units, extract_field, format_title};

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport<O> {
    pub dataset: String,
    pub query_url: String,
    pub forecast_time: DateTime<Utc>,
    /// (latitudes, longitudes)
    pub grid_shape: (usize, usize),
    /// Smallest and largest display value; `None` when every value is missing
    pub value_range: Option<(f64, f64)>,
    pub title: String,
    pub output: O,
}

/// Catalog-to-figure orchestration over pluggable collaborators.
///
/// Steps run strictly in sequence; the first failure ends the run.
pub struct Pipeline<C, R> {
    catalog: C,
    renderer: R,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl<C, R> Pipeline<C, R>
where
    C: CatalogClient,
    R: RenderBackend,
{
    pub fn new(catalog: C, renderer: R, config: PipelineConfig) -> Self {
        Self {
            catalog,
            renderer,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used to timestamp the query.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Resolve, query, fetch, transform and render.
    #[instrument(skip(self), fields(catalog = %self.config.catalog_url, variable = %self.config.variable))]
    pub async fn run(&self) -> PipelineResult<RunReport<R::Output>> {
        let config = &self.config;

        // 1. Resolve dataset
        let dataset = self.resolve_dataset().await?;

        // 2. Subset access point
        let endpoint = self.catalog.subset_access(&dataset).map_err(|e| {
            PipelineError::UnsupportedAccess {
                dataset: dataset.name.clone(),
                source: Some(e),
            }
        })?;
        info!(dataset = %dataset.name, endpoint = %endpoint.url(), "Subset endpoint selected");

        // 3. Build query
        let query = self.build_query(&endpoint)?;
        let query_url = query.to_url(endpoint.url()).to_string();
        info!(url = %query_url, "Subset query built");

        // 4. Execute query
        let response = endpoint.fetch(&query).await.map_err(|e| {
            PipelineError::SubsetRequestFailed {
                url: query_url.clone(),
                source: e,
            }
        })?;
        info!(variables = response.len(), "Subset response received");

        // 5-6. Extract and squeeze
        let raw = extract_field(&response, &config.variable, &config.coordinates, &config.bbox)?;
        info!(
            shape = ?raw.shape(),
            forecast_time = %raw.time(),
            units = raw.units(),
            "Field extracted"
        );

        // 7. Convert units
        let field = convert_units(&raw, config.units);
        let value_range = field.values().min_max();
        info!(units = field.units(), range = ?value_range, "Units converted");

        // 8. Mesh
        let mesh = build_mesh(&field);
        check_render_inputs(&mesh, field.values())?;

        // 9. Render
        let title = format_title(&config.variable_label, field.units(), field.time());
        let spec = self.render_spec(&title, field.units())?;
        let output = self
            .renderer
            .render(&spec, &field, &mesh)
            .map_err(|e| PipelineError::render_mismatch("renderer rejected the grid", Some(e)))?;
        info!(title = %title, "Figure rendered");

        Ok(RunReport {
            dataset: dataset.name,
            query_url,
            forecast_time: field.time(),
            grid_shape: field.shape(),
            value_range,
            title,
            output,
        })
    }

    async fn resolve_dataset(&self) -> PipelineResult<DatasetHandle> {
        let url = &self.config.catalog_url;
        let unavailable = |reason: String, source: Option<CollaboratorError>| {
            PipelineError::CatalogUnavailable {
                catalog: url.clone(),
                reason,
                source,
            }
        };

        let reference = CatalogReference::parse(url)
            .map_err(|e| unavailable("invalid catalog URL".to_string(), Some(e.into())))?;
        let datasets = self
            .catalog
            .resolve(&reference)
            .await
            .map_err(|e| unavailable("catalog request failed".to_string(), Some(e)))?;

        if datasets.is_empty() {
            return Err(unavailable("catalog lists no datasets".to_string(), None));
        }
        if self.config.dataset == DatasetSelector::First && datasets.len() > 1 {
            warn!(
                count = datasets.len(),
                selected = %datasets[0].name,
                "Catalog lists several datasets; using the first"
            );
        }

        let selected = self
            .config
            .dataset
            .select(&datasets)
            .cloned()
            .ok_or_else(|| unavailable(format!("no dataset named {}", self.config.dataset), None))?;
        info!(dataset = %selected.name, id = ?selected.id, "Dataset resolved");
        Ok(selected)
    }

    fn build_query<S: SubsetService>(&self, endpoint: &S) -> PipelineResult<NcssQuery> {
        let config = &self.config;
        let time = match config.time {
            TimeRequest::Now => self.clock.now(),
            TimeRequest::At(time) => time,
        };

        let mut query = endpoint.new_query();
        query
            .bbox(config.bbox)
            .time(time)
            .accept(config.format)
            .variable(config.variable.clone());
        query.validate().map_err(|e| match e {
            ThreddsError::InvalidQuery(message) => PipelineError::InvalidQuery(message),
            other => PipelineError::InvalidQuery(other.to_string()),
        })?;
        Ok(query)
    }

    fn render_spec(&self, title: &str, units: &str) -> PipelineResult<RenderSpec> {
        let options = &self.config.render;
        let projection = options
            .projection
            .for_extent(&self.config.bbox)
            .map_err(|e| {
                PipelineError::render_mismatch("projection cannot show extent", Some(e.into()))
            })?;

        Ok(RenderSpec {
            extent: self.config.bbox,
            projection,
            levels: options.levels,
            colormap: options.colormap,
            title: title.to_string(),
            colorbar_label: units.to_string(),
            boundary_resolution: options.boundary_resolution,
            width: options.width,
            height: options.height,
            scatter: options.scatter,
        })
    }
}
