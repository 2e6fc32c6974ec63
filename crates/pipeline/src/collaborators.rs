//! Seams between the pipeline and the outside world.
//!
//! The pipeline only talks to a catalog, a subset endpoint, a renderer and a
//! clock through these traits. The production implementations for the
//! THREDDS client and the map renderer live here too.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grid_common::{GridField, LatLonMesh};
use netcdf_parser::SubsetResponse;
use renderer::{MapRenderer, RenderSpec, RenderedMap};
use reqwest::Url;
use thredds_client::{CatalogReference, DatasetHandle, NcssQuery, SubsetEndpoint, ThreddsClient};

use crate::error::CollaboratorError;

/// Resolves catalogs and hands out subset endpoints for their datasets.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    type Endpoint: SubsetService;

    /// Datasets listed by the catalog.
    async fn resolve(
        &self,
        catalog: &CatalogReference,
    ) -> Result<Vec<DatasetHandle>, CollaboratorError>;

    /// Subset endpoint bound to `dataset`; fails when it has none.
    fn subset_access(&self, dataset: &DatasetHandle) -> Result<Self::Endpoint, CollaboratorError>;
}

/// A subset-query capability bound to one dataset.
#[async_trait]
pub trait SubsetService: Send + Sync {
    /// Base URL the query string is appended to.
    fn url(&self) -> &Url;

    fn new_query(&self) -> NcssQuery {
        NcssQuery::new()
    }

    /// Execute the query and decode the response.
    async fn fetch(&self, query: &NcssQuery) -> Result<SubsetResponse, CollaboratorError>;
}

/// Draws the final figure.
pub trait RenderBackend: Send + Sync {
    type Output: Send;

    fn render(
        &self,
        spec: &RenderSpec,
        field: &GridField,
        mesh: &LatLonMesh,
    ) -> Result<Self::Output, CollaboratorError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[async_trait]
impl CatalogClient for ThreddsClient {
    type Endpoint = SubsetEndpoint;

    async fn resolve(
        &self,
        catalog: &CatalogReference,
    ) -> Result<Vec<DatasetHandle>, CollaboratorError> {
        Ok(ThreddsClient::resolve(self, catalog).await?)
    }

    fn subset_access(&self, dataset: &DatasetHandle) -> Result<SubsetEndpoint, CollaboratorError> {
        Ok(self.subset_endpoint(dataset)?)
    }
}

#[async_trait]
impl SubsetService for SubsetEndpoint {
    fn url(&self) -> &Url {
        SubsetEndpoint::url(self)
    }

    fn new_query(&self) -> NcssQuery {
        SubsetEndpoint::new_query(self)
    }

    async fn fetch(&self, query: &NcssQuery) -> Result<SubsetResponse, CollaboratorError> {
        Ok(SubsetEndpoint::fetch(self, query).await?)
    }
}

impl RenderBackend for MapRenderer {
    type Output = RenderedMap;

    fn render(
        &self,
        spec: &RenderSpec,
        field: &GridField,
        mesh: &LatLonMesh,
    ) -> Result<RenderedMap, CollaboratorError> {
        Ok(MapRenderer::render(self, spec, mesh, field.values())?)
    }
}
