//! HTTP access to THREDDS catalogs and NCSS endpoints.

use std::time::Duration;

use bytes::Bytes;
use netcdf_parser::{decode_subset_bytes, SubsetResponse};
use reqwest::{Client, Response, Url};
use tracing::{debug, info, instrument};

use crate::catalog::{Catalog, CatalogReference, DatasetHandle};
use crate::error::{ThreddsError, ThreddsResult};
use crate::ncss::NcssQuery;

/// Longest server error body kept in [`ThreddsError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("forecast-map/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Client for one or more THREDDS servers.
#[derive(Debug, Clone)]
pub struct ThreddsClient {
    client: Client,
}

impl ThreddsClient {
    pub fn new(config: ClientConfig) -> ThreddsResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .tcp_nodelay(true)
            .build()
            .map_err(ThreddsError::ClientBuild)?;

        Ok(Self { client })
    }

    /// Fetch and parse a catalog document.
    #[instrument(skip(self), fields(catalog = %reference))]
    pub async fn fetch_catalog(&self, reference: &CatalogReference) -> ThreddsResult<Catalog> {
        let response = send(&self.client, reference.url()).await?;
        let xml = response.text().await.map_err(|e| ThreddsError::Http {
            url: reference.to_string(),
            source: e,
        })?;

        let catalog = Catalog::parse(&xml, reference.url())?;
        info!(
            datasets = catalog.datasets.len(),
            services = catalog.services.len(),
            catalog_refs = catalog.catalog_refs.len(),
            "Catalog resolved"
        );
        Ok(catalog)
    }

    /// Datasets listed by a catalog.
    pub async fn resolve(&self, reference: &CatalogReference) -> ThreddsResult<Vec<DatasetHandle>> {
        Ok(self.fetch_catalog(reference).await?.datasets)
    }

    /// Subset endpoint bound to a dataset, if it offers NCSS.
    pub fn subset_endpoint(&self, dataset: &DatasetHandle) -> ThreddsResult<SubsetEndpoint> {
        let url = dataset
            .subset_url()
            .ok_or_else(|| ThreddsError::NoSubsetService {
                dataset: dataset.name.clone(),
            })?;

        Ok(SubsetEndpoint {
            url: url.clone(),
            client: self.client.clone(),
        })
    }
}

/// NetCDF Subset Service endpoint of one dataset.
#[derive(Debug, Clone)]
pub struct SubsetEndpoint {
    url: Url,
    client: Client,
}

impl SubsetEndpoint {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Empty query to be filled in by the caller.
    pub fn new_query(&self) -> NcssQuery {
        NcssQuery::new()
    }

    /// Validated request URL for `query`.
    pub fn query_url(&self, query: &NcssQuery) -> ThreddsResult<Url> {
        query.validate()?;
        Ok(query.to_url(&self.url))
    }

    /// Raw response body for `query`.
    #[instrument(skip(self, query), fields(endpoint = %self.url))]
    pub async fn fetch_bytes(&self, query: &NcssQuery) -> ThreddsResult<Bytes> {
        let url = self.query_url(query)?;
        let response = send(&self.client, &url).await?;
        let body = response.bytes().await.map_err(|e| ThreddsError::Http {
            url: url.to_string(),
            source: e,
        })?;
        debug!(bytes = body.len(), "Subset downloaded");
        Ok(body)
    }

    /// Fetch and decode a subset.
    pub async fn fetch(&self, query: &NcssQuery) -> ThreddsResult<SubsetResponse> {
        let body = self.fetch_bytes(query).await?;
        let response = decode_subset_bytes(&body)?;
        info!(
            variables = ?response.names().collect::<Vec<_>>(),
            "Subset decoded"
        );
        Ok(response)
    }
}

/// GET `url`, turning non-success statuses into [`ThreddsError::Status`].
async fn send(client: &Client, url: &Url) -> ThreddsResult<Response> {
    debug!(url = %url, "GET");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ThreddsError::Http {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ThreddsError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        message: truncate(body.trim(), MAX_ERROR_BODY),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
