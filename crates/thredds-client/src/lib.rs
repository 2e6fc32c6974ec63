//! Client for THREDDS Data Server catalogs and the NetCDF Subset Service.
//!
//! - [`catalog`]: parse `catalog.xml` into datasets with resolved access URLs
//! - [`ncss`]: build, encode and decode grid subset queries
//! - [`client`]: HTTP transport for both, decoding subsets with `netcdf-parser`

pub mod catalog;
pub mod client;
pub mod error;
pub mod ncss;

pub use catalog::{
    AccessEndpoint, Catalog, CatalogRef, CatalogReference, DatasetHandle, Service, ServiceKind,
};
pub use client::{ClientConfig, SubsetEndpoint, ThreddsClient};
pub use error::{ThreddsError, ThreddsResult};
pub use ncss::{NcssQuery, ResponseFormat, TimeSelection};
