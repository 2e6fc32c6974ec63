//! Fetch a bounding-box subset of a forecast grid from a THREDDS server and
//! render it as a map.
//!
//! [`Pipeline::run`] resolves the catalog, picks a dataset, builds and sends
//! an NCSS query, extracts the requested variable with its time and lat/lon
//! coordinates, converts units, meshes the axes and hands everything to a
//! [`RenderBackend`]. Each collaborator sits behind a trait in
//! [`collaborators`] so runs can be exercised without a network.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod extract;
pub mod run;

pub use collaborators::{
    CatalogClient, Clock, FixedClock, RenderBackend, SubsetService, SystemClock,
};
pub use config::{
    CoordinateNames, DatasetSelector, PipelineConfig, RenderOptions, TimeRequest,
    DEFAULT_CATALOG_URL, DEFAULT_VARIABLE,
};
pub use error::{CollaboratorError, PipelineError, PipelineResult};
pub use extract::{build_mesh, convert_units, extract_field, format_title};
pub use run::{Pipeline, RunReport};
