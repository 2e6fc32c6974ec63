//! Common types and utilities shared across the forecast-map workspace.

pub mod array;
pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;
pub mod units;

pub use array::NdArray;
pub use bbox::BoundingBox;
pub use error::{GridError, GridResult};
pub use grid::{meshgrid, GridField, LatLonMesh};
pub use time::{decode_cf_time, parse_iso8601, CfTimeUnits};
pub use units::UnitTransform;
