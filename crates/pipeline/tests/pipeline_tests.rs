//! End-to-end runs against stub collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use grid_common::{BoundingBox, GridField, LatLonMesh, NdArray};
use netcdf_parser::{SubsetResponse, Variable};
use pipeline::{
    CatalogClient, CollaboratorError, DatasetSelector, FixedClock, Pipeline, PipelineConfig,
    PipelineError, RenderBackend, RenderOptions, SubsetService,
};
use renderer::{MapRenderer, RenderSpec};
use reqwest::Url;
use test_utils::assert_slice_approx_eq;
use thredds_client::{
    AccessEndpoint, CatalogReference, ClientConfig, DatasetHandle, NcssQuery, ResponseFormat,
    ServiceKind, ThreddsClient, TimeSelection,
};

// ============================================================================
// Stub collaborators
// ============================================================================

const NCSS_URL: &str = "https://thredds.example.org/thredds/ncss/grid/grib/NCEP/GFS/Best";

fn query_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 4, 17, 0).unwrap()
}

fn dataset(name: &str, with_ncss: bool) -> DatasetHandle {
    let mut access = vec![AccessEndpoint {
        service: ServiceKind::OpenDap,
        url: Url::parse("https://thredds.example.org/thredds/dodsC/grib/NCEP/GFS/Best").unwrap(),
    }];
    if with_ncss {
        access.push(AccessEndpoint {
            service: ServiceKind::NetcdfSubset,
            url: Url::parse(NCSS_URL).unwrap(),
        });
    }
    DatasetHandle {
        name: name.to_string(),
        id: Some(format!("gfs/{}", name)),
        url_path: Some("grib/NCEP/GFS/Best".to_string()),
        access,
    }
}

#[derive(Clone)]
struct StubEndpoint {
    url: Url,
    response: Result<SubsetResponse, String>,
    queries: Arc<Mutex<Vec<NcssQuery>>>,
}

#[async_trait]
impl SubsetService for StubEndpoint {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn fetch(&self, query: &NcssQuery) -> Result<SubsetResponse, CollaboratorError> {
        self.queries.lock().unwrap().push(query.clone());
        self.response.clone().map_err(Into::into)
    }
}

struct StubCatalog {
    datasets: Result<Vec<DatasetHandle>, String>,
    response: Result<SubsetResponse, String>,
    queries: Arc<Mutex<Vec<NcssQuery>>>,
}

impl StubCatalog {
    fn new(datasets: Vec<DatasetHandle>, response: SubsetResponse) -> Self {
        Self {
            datasets: Ok(datasets),
            response: Ok(response),
            queries: Arc::default(),
        }
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    type Endpoint = StubEndpoint;

    async fn resolve(
        &self,
        _catalog: &CatalogReference,
    ) -> Result<Vec<DatasetHandle>, CollaboratorError> {
        self.datasets.clone().map_err(Into::into)
    }

    fn subset_access(&self, dataset: &DatasetHandle) -> Result<StubEndpoint, CollaboratorError> {
        let url = dataset
            .subset_url()
            .ok_or_else(|| format!("{} has no NetcdfSubset access", dataset.name))?;
        Ok(StubEndpoint {
            url: url.clone(),
            response: self.response.clone(),
            queries: Arc::clone(&self.queries),
        })
    }
}

/// What the renderer was handed.
#[derive(Debug, Clone)]
struct RenderCall {
    spec: RenderSpec,
    field: GridField,
    mesh: LatLonMesh,
}

#[derive(Default)]
struct RecordingRenderer {
    calls: Mutex<Vec<RenderCall>>,
    fail: bool,
}

impl RenderBackend for RecordingRenderer {
    type Output = usize;

    fn render(
        &self,
        spec: &RenderSpec,
        field: &GridField,
        mesh: &LatLonMesh,
    ) -> Result<usize, CollaboratorError> {
        if self.fail {
            return Err("figure exploded".into());
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(RenderCall {
            spec: spec.clone(),
            field: field.clone(),
            mesh: mesh.clone(),
        });
        Ok(calls.len())
    }
}

/// Coordinate variable along a dimension of its own name.
fn var(name: &str, shape: Vec<usize>, values: Vec<f64>) -> Variable {
    let dims = shape.iter().map(|_| name.to_string()).collect();
    Variable::new(name, dims, NdArray::new(shape, values).unwrap())
}

/// A 2x2 GFS-like subset: reftime/time scalars, 0..360 longitudes.
fn two_by_two(time_name: &str) -> SubsetResponse {
    SubsetResponse::from_variables([
        Variable::new(
            "Temperature_surface",
            vec![time_name.to_string(), "lat".to_string(), "lon".to_string()],
            NdArray::new(vec![1, 2, 2], vec![273.15, 373.15, 300.0, 250.0]).unwrap(),
        )
        .with_coordinates(&format!("reftime {} lat lon", time_name))
        .with_units("K"),
        var(time_name, vec![1], vec![6.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
        var("reftime", vec![1], vec![0.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
        var("lat", vec![2], vec![40.0, 39.75]),
        var("lon", vec![2], vec![254.75, 255.0]),
    ])
}

fn config() -> PipelineConfig {
    PipelineConfig {
        render: RenderOptions {
            width: 400,
            height: 300,
            ..RenderOptions::default()
        },
        ..PipelineConfig::default()
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_end_to_end_two_by_two() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time"));
    let queries = Arc::clone(&catalog.queries);
    let renderer = RecordingRenderer::default();

    let pipeline = Pipeline::new(catalog, renderer, config()).with_clock(FixedClock(query_time()));
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.dataset, "Best");
    assert_eq!(report.grid_shape, (2, 2));
    assert_eq!(report.output, 1);
    assert_eq!(
        report.forecast_time,
        Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap()
    );
    assert_eq!(
        report.title,
        "Temperature (\u{00b0}F) forecast for 15 January 2024 06:00Z"
    );
    assert!(report.query_url.starts_with(NCSS_URL));
    assert!(report.query_url.contains("north=43"));
    assert!(report.query_url.contains("var=Temperature_surface"));

    // The query carried the box, the clock's time, the format and one variable.
    let sent = queries.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].bbox, Some(BoundingBox::new(43.0, 35.0, -100.0, -111.0)));
    assert_eq!(sent[0].time, Some(TimeSelection::Instant(query_time())));
    assert_eq!(sent[0].accept, Some(ResponseFormat::NetCdf4));
    assert_eq!(
        sent[0].variables.iter().collect::<Vec<_>>(),
        vec!["Temperature_surface"]
    );
}

#[tokio::test]
async fn test_renderer_receives_matching_grids() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time"));
    let pipeline = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .with_clock(FixedClock(query_time()));
    pipeline.run().await.unwrap();

    let calls = pipeline_calls(&pipeline);
    assert_eq!(calls.len(), 1);
    let call = &calls[0];

    assert_eq!(call.mesh.lat2d.shape(), &[2, 2]);
    assert_eq!(call.mesh.lon2d.shape(), &[2, 2]);
    assert_eq!(call.field.values().shape(), &[2, 2]);
    assert_eq!(call.mesh.point(1, 0), Some((39.75, -105.25)));

    assert_slice_approx_eq!(
        call.field.values().values(),
        &[32.0, 212.0, 80.33, -9.67],
        1e-6
    );
    assert_eq!(call.field.units(), "\u{00b0}F");

    assert_eq!(
        call.spec.title,
        "Temperature (\u{00b0}F) forecast for 15 January 2024 06:00Z"
    );
    assert_eq!(call.spec.extent, BoundingBox::new(43.0, 35.0, -100.0, -111.0));
    assert_eq!(call.spec.levels, 20);
    assert!(call.spec.scatter);
}

fn pipeline_calls(pipeline: &Pipeline<StubCatalog, RecordingRenderer>) -> Vec<RenderCall> {
    pipeline.renderer().calls.lock().unwrap().clone()
}

#[tokio::test]
async fn test_renamed_time_coordinate_found_by_position() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time1"));
    let report = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .with_clock(FixedClock(query_time()))
        .run()
        .await
        .unwrap();
    assert_eq!(
        report.forecast_time,
        Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_named_dataset_selection() {
    let catalog = StubCatalog::new(
        vec![dataset("TwoD", true), dataset("Best", true)],
        two_by_two("time"),
    );
    let config = PipelineConfig {
        dataset: DatasetSelector::Named("gfs/Best".to_string()),
        ..config()
    };
    let report = Pipeline::new(catalog, RecordingRenderer::default(), config)
        .run()
        .await
        .unwrap();
    assert_eq!(report.dataset, "Best");
}

#[tokio::test]
async fn test_real_map_renderer_backend() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time"));
    let renderer = MapRenderer::with_resources(None, None);
    let report = Pipeline::new(catalog, renderer, config())
        .run()
        .await
        .unwrap();
    assert_eq!(report.output.width(), 400);
    assert_eq!(report.output.height(), 300);
    assert!(report.output.levels.len() >= 2);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_missing_variable() {
    let response = SubsetResponse::from_variables([
        var("lat", vec![2], vec![40.0, 39.75]),
        var("lon", vec![2], vec![254.75, 255.0]),
        var("time", vec![1], vec![6.0]).with_units("Hour since 2024-01-15T00:00:00Z"),
    ]);
    let catalog = StubCatalog::new(vec![dataset("Best", true)], response);
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "VariableNotFound");
    match err {
        PipelineError::VariableNotFound { variable, .. } => {
            assert_eq!(variable, "Temperature_surface")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_dataset_without_subset_service() {
    let catalog = StubCatalog::new(vec![dataset("Raw GRIB file", false)], two_by_two("time"));
    let queries = Arc::clone(&catalog.queries);
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "UnsupportedAccess");
    assert!(queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_catalog() {
    let catalog = StubCatalog::new(vec![], two_by_two("time"));
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CatalogUnavailable");
}

#[tokio::test]
async fn test_catalog_request_failure_keeps_source() {
    let catalog = StubCatalog {
        datasets: Err("connection refused".to_string()),
        response: Ok(two_by_two("time")),
        queries: Arc::default(),
    };
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "CatalogUnavailable");
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "connection refused");
}

#[tokio::test]
async fn test_unknown_named_dataset() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time"));
    let config = PipelineConfig {
        dataset: DatasetSelector::Named("Nonexistent".to_string()),
        ..config()
    };
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config)
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CatalogUnavailable");
    assert!(err.to_string().contains("Nonexistent"));
}

#[tokio::test]
async fn test_fetch_failure() {
    let catalog = StubCatalog {
        datasets: Ok(vec![dataset("Best", true)]),
        response: Err("HTTP 500".to_string()),
        queries: Arc::default(),
    };
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "SubsetRequestFailed");
}

#[tokio::test]
async fn test_inverted_bbox_rejected_before_fetch() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time"));
    let queries = Arc::clone(&catalog.queries);
    let config = PipelineConfig {
        bbox: BoundingBox::new(35.0, 43.0, -100.0, -111.0),
        ..config()
    };
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "InvalidQuery");
    assert!(queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_renderer_failure_is_render_input_mismatch() {
    let catalog = StubCatalog::new(vec![dataset("Best", true)], two_by_two("time"));
    let renderer = RecordingRenderer {
        fail: true,
        ..RecordingRenderer::default()
    };
    let err = Pipeline::new(catalog, renderer, config())
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "RenderInputMismatch");
}

#[tokio::test]
async fn test_value_grid_not_matching_axes() {
    let mut response = two_by_two("time");
    response
        .variables
        .insert("lon".to_string(), var("lon", vec![3], vec![254.75, 255.0, 255.25]));
    let catalog = StubCatalog::new(vec![dataset("Best", true)], response);
    let err = Pipeline::new(catalog, RecordingRenderer::default(), config())
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "RenderInputMismatch");
}

// ============================================================================
// Real THREDDS client over a local socket
// ============================================================================

#[tokio::test]
async fn test_thredds_client_unreachable_catalog() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = PipelineConfig {
        catalog_url: format!("http://{}/thredds/catalog.xml", addr),
        ..config()
    };
    let client = ThreddsClient::new(ClientConfig::default()).unwrap();
    let err = Pipeline::new(client, RecordingRenderer::default(), config)
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CatalogUnavailable");
}

#[tokio::test]
async fn test_invalid_catalog_url() {
    let config = PipelineConfig {
        catalog_url: "not a url".to_string(),
        ..config()
    };
    let client = ThreddsClient::new(ClientConfig::default()).unwrap();
    let err = Pipeline::new(client, RecordingRenderer::default(), config)
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CatalogUnavailable");
}
