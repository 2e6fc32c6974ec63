//! THREDDS catalog XML parsing.
//!
//! A catalog declares services (optionally grouped under a `Compound`
//! service) and a tree of datasets. A dataset reaches a service either
//! through explicit `<access>` elements or through a `serviceName`, which
//! can be inherited from an ancestor's `<metadata inherited="true">`.
//!
//! Parsing resolves every leaf dataset to a [`DatasetHandle`] carrying one
//! absolute URL per service it can be accessed with.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ThreddsError, ThreddsResult};

/// Identifier of a remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReference(Url);

impl CatalogReference {
    pub fn parse(url: &str) -> ThreddsResult<Self> {
        Url::parse(url)
            .map(Self)
            .map_err(|e| ThreddsError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for CatalogReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service types a dataset can be accessed through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    NetcdfSubset,
    OpenDap,
    HttpServer,
    Wms,
    Compound,
    Other(String),
}

impl ServiceKind {
    pub fn from_service_type(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "netcdfsubset" => Self::NetcdfSubset,
            "opendap" => Self::OpenDap,
            "httpserver" => Self::HttpServer,
            "wms" => Self::Wms,
            "compound" => Self::Compound,
            _ => Self::Other(s.to_string()),
        }
    }
}

/// A `<service>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub kind: ServiceKind,
    pub base: String,
    /// Members of a compound service
    pub children: Vec<Service>,
}

impl Service {
    fn find(&self, name: &str) -> Option<&Service> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// The concrete services this one stands for.
    fn leaves(&self) -> Vec<&Service> {
        if self.kind == ServiceKind::Compound {
            self.children.iter().flat_map(|c| c.leaves()).collect()
        } else {
            vec![self]
        }
    }
}

/// One way of reaching a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessEndpoint {
    pub service: ServiceKind,
    pub url: Url,
}

/// A resolved dataset entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetHandle {
    pub name: String,
    pub id: Option<String>,
    pub url_path: Option<String>,
    pub access: Vec<AccessEndpoint>,
}

impl DatasetHandle {
    /// First endpoint of the given service kind.
    pub fn endpoint(&self, kind: &ServiceKind) -> Option<&Url> {
        self.access
            .iter()
            .find(|a| &a.service == kind)
            .map(|a| &a.url)
    }

    /// NetCDF Subset Service endpoint, if the dataset exposes one.
    pub fn subset_url(&self) -> Option<&Url> {
        self.endpoint(&ServiceKind::NetcdfSubset)
    }

    /// True when `name` equals the dataset name or ID.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.id.as_deref() == Some(name)
    }
}

/// A `<catalogRef>` pointing at a child catalog. Not followed automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRef {
    pub title: Option<String>,
    pub href: Url,
}

/// Parsed catalog document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    pub services: Vec<Service>,
    pub datasets: Vec<DatasetHandle>,
    pub catalog_refs: Vec<CatalogRef>,
}

impl Catalog {
    /// Parse catalog XML fetched from `base`; relative service bases and
    /// catalogRef links resolve against it.
    pub fn parse(xml: &str, base: &Url) -> ThreddsResult<Self> {
        let raw = RawCatalog::read(xml)?;
        Ok(raw.resolve(base))
    }

    pub fn find_service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find_map(|s| s.find(name))
    }
}

// =============================================================================
// Event-level parsing
// =============================================================================

/// Dataset as written, before service references are resolved.
#[derive(Debug, Default)]
struct RawDataset {
    name: String,
    id: Option<String>,
    url_path: Option<String>,
    service_name: Option<String>,
    inherited_service: Option<String>,
    /// (serviceName, urlPath) pairs from `<access>`
    access: Vec<(String, String)>,
    has_children: bool,
    /// Position of the opening tag among all datasets
    order: usize,
}

#[derive(Debug, Default)]
struct RawCatalog {
    services: Vec<Service>,
    /// Leaf datasets with the service name inherited from ancestors
    datasets: Vec<(RawDataset, Option<String>)>,
    catalog_refs: Vec<(Option<String>, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    ServiceName { inherited: bool },
}

impl RawCatalog {
    fn read(xml: &str) -> ThreddsResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut catalog = RawCatalog::default();
        let mut service_stack: Vec<Service> = Vec::new();
        let mut dataset_stack: Vec<RawDataset> = Vec::new();
        // One entry per open <metadata>: whether it is inherited
        let mut metadata_stack: Vec<bool> = Vec::new();
        let mut text_target = TextTarget::None;
        let mut opened_datasets = 0usize;

        let mut buf = Vec::new();
        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| ThreddsError::CatalogParse {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.local_name().as_ref() {
                        b"service" => {
                            let service = Service {
                                name: attr(e, b"name").unwrap_or_default(),
                                kind: ServiceKind::from_service_type(
                                    &attr(e, b"serviceType").unwrap_or_default(),
                                ),
                                base: attr(e, b"base").unwrap_or_default(),
                                children: Vec::new(),
                            };
                            if is_empty {
                                attach_service(&mut catalog.services, &mut service_stack, service);
                            } else {
                                service_stack.push(service);
                            }
                        }
                        b"dataset" => {
                            if let Some(parent) = dataset_stack.last_mut() {
                                parent.has_children = true;
                            }
                            let dataset = RawDataset {
                                name: attr(e, b"name").unwrap_or_default(),
                                id: attr(e, b"ID"),
                                url_path: attr(e, b"urlPath"),
                                service_name: attr(e, b"serviceName"),
                                order: opened_datasets,
                                ..Default::default()
                            };
                            opened_datasets += 1;
                            if is_empty {
                                let inherited = inherited_service(&dataset_stack);
                                catalog.datasets.push((dataset, inherited));
                            } else {
                                dataset_stack.push(dataset);
                            }
                        }
                        b"metadata" if !is_empty => {
                            metadata_stack.push(attr(e, b"inherited").as_deref() == Some("true"));
                        }
                        b"serviceName" if !is_empty => {
                            text_target = TextTarget::ServiceName {
                                inherited: metadata_stack.last().copied().unwrap_or(false),
                            };
                        }
                        b"access" => {
                            if let (Some(dataset), Some(service)) =
                                (dataset_stack.last_mut(), attr(e, b"serviceName"))
                            {
                                let path = attr(e, b"urlPath").unwrap_or_default();
                                dataset.access.push((service, path));
                            }
                        }
                        b"catalogRef" => {
                            if let Some(href) = attr(e, b"href") {
                                catalog.catalog_refs.push((attr(e, b"title"), href));
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(t) => {
                    if let TextTarget::ServiceName { inherited } = text_target {
                        let name = t
                            .unescape()
                            .map_err(|e| ThreddsError::CatalogParse {
                                position: reader.buffer_position(),
                                message: e.to_string(),
                            })?
                            .trim()
                            .to_string();
                        if let Some(dataset) = dataset_stack.last_mut() {
                            if inherited {
                                dataset.inherited_service = Some(name);
                            } else {
                                dataset.service_name = Some(name);
                            }
                        }
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"service" => {
                        if let Some(service) = service_stack.pop() {
                            attach_service(&mut catalog.services, &mut service_stack, service);
                        }
                    }
                    b"dataset" => {
                        if let Some(dataset) = dataset_stack.pop() {
                            if !dataset.has_children
                                || dataset.url_path.is_some()
                                || !dataset.access.is_empty()
                            {
                                let inherited = dataset
                                    .inherited_service
                                    .clone()
                                    .or_else(|| inherited_service(&dataset_stack));
                                catalog.datasets.push((dataset, inherited));
                            }
                        }
                    }
                    b"metadata" => {
                        metadata_stack.pop();
                    }
                    b"serviceName" => text_target = TextTarget::None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        // Containers close after their children; restore document order.
        catalog.datasets.sort_by_key(|(dataset, _)| dataset.order);
        Ok(catalog)
    }

    fn resolve(self, base: &Url) -> Catalog {
        let lookup = Catalog {
            services: self.services,
            ..Default::default()
        };

        let datasets = self
            .datasets
            .into_iter()
            .map(|(raw, inherited)| resolve_dataset(&lookup, base, raw, inherited))
            .collect();

        let catalog_refs = self
            .catalog_refs
            .into_iter()
            .filter_map(|(title, href)| match base.join(&href) {
                Ok(href) => Some(CatalogRef { title, href }),
                Err(e) => {
                    warn!(href = %href, error = %e, "Skipping catalogRef with invalid href");
                    None
                }
            })
            .collect();

        Catalog {
            services: lookup.services,
            datasets,
            catalog_refs,
        }
    }
}

fn resolve_dataset(
    lookup: &Catalog,
    base: &Url,
    raw: RawDataset,
    inherited: Option<String>,
) -> DatasetHandle {
    let mut pairs = raw.access.clone();
    if pairs.is_empty() {
        if let (Some(path), Some(service)) = (
            raw.url_path.as_ref(),
            raw.service_name.clone().or(inherited),
        ) {
            pairs.push((service, path.clone()));
        }
    }

    let mut access = Vec::new();
    for (service_name, path) in pairs {
        let Some(service) = lookup.find_service(&service_name) else {
            warn!(dataset = %raw.name, service = %service_name, "Dataset references undeclared service");
            continue;
        };
        for leaf in service.leaves() {
            let joined = format!("{}{}", leaf.base, path);
            match base.join(&joined) {
                Ok(url) => access.push(AccessEndpoint {
                    service: leaf.kind.clone(),
                    url,
                }),
                Err(e) => {
                    warn!(dataset = %raw.name, url = %joined, error = %e, "Skipping unresolvable access URL")
                }
            }
        }
    }

    debug!(dataset = %raw.name, endpoints = access.len(), "Resolved dataset access");

    DatasetHandle {
        name: raw.name,
        id: raw.id,
        url_path: raw.url_path,
        access,
    }
}

fn attach_service(top: &mut Vec<Service>, stack: &mut [Service], service: Service) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(service),
        None => top.push(service),
    }
}

/// Nearest service name an ancestor made inheritable.
fn inherited_service(stack: &[RawDataset]) -> Option<String> {
    stack
        .iter()
        .rev()
        .find_map(|d| d.inherited_service.clone())
}

/// Attribute value by local name, ignoring namespace prefixes.
fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}
