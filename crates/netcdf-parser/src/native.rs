//! Native NetCDF decoding using the netcdf library.
//!
//! The netcdf library requires a file path (it wraps libnetcdf/HDF5 which need
//! file handles). When decoding a response body, we write it to a temp file
//! first.
//!
//! On Linux, we use `/dev/shm` (memory-backed tmpfs) to minimize I/O latency.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use grid_common::NdArray;
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::{parse_coordinates, SubsetResponse, Variable};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Call this early in `main()`, before any HDF5/NetCDF operations occur.
/// It is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Decode an NCSS response body.
pub fn decode_subset_bytes(data: &[u8]) -> NetCdfResult<SubsetResponse> {
    if data.is_empty() {
        return Err(NetCdfError::InvalidFormat("empty response body".to_string()));
    }
    silence_hdf5_errors();

    let temp_file = TempNc::write(data)?;
    decode_subset_file(temp_file.path())
}

/// Decode a NetCDF file already on disk.
pub fn decode_subset_file(path: &Path) -> NetCdfResult<SubsetResponse> {
    silence_hdf5_errors();

    let nc_file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let mut variables = Vec::new();
    for var in nc_file.variables() {
        let name = var.name();
        match read_variable(&var) {
            Ok(decoded) => variables.push(decoded),
            // Non-numeric variables (e.g. char projection names) are not grid data.
            Err(NetCdfError::ReadError { message, .. }) => {
                debug!(variable = %name, error = %message, "Skipping unreadable variable");
            }
            Err(e) => return Err(e),
        }
    }

    if variables.is_empty() {
        warn!(path = %path.display(), "NetCDF file contains no numeric variables");
    }

    Ok(SubsetResponse::from_variables(variables))
}

fn read_variable(var: &netcdf::Variable) -> NetCdfResult<Variable> {
    let name = var.name();
    let dimensions: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let raw: Vec<f64> = var.get_values(..).map_err(|e| NetCdfError::ReadError {
        variable: name.clone(),
        message: e.to_string(),
    })?;

    let packing = Packing::from_variable(var);
    let values: Vec<f64> = raw.into_iter().map(|v| packing.unpack(v)).collect();

    let data = NdArray::new(shape, values)?;

    Ok(Variable {
        coordinates: get_string_attr(var, "coordinates")
            .map(|s| parse_coordinates(&s))
            .unwrap_or_default(),
        units: get_string_attr(var, "units"),
        name,
        dimensions,
        data,
    })
}

/// CF packing and missing-data attributes of one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    fill_value: Option<f64>,
    missing_value: Option<f64>,
    scale_factor: f64,
    add_offset: f64,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable) -> Self {
        Self {
            fill_value: get_f64_attr(var, "_FillValue"),
            missing_value: get_f64_attr(var, "missing_value"),
            scale_factor: get_f64_attr(var, "scale_factor").unwrap_or(1.0),
            add_offset: get_f64_attr(var, "add_offset").unwrap_or(0.0),
        }
    }

    /// Fill and missing values compare against the packed value.
    fn unpack(&self, raw: f64) -> f64 {
        if raw.is_nan() || self.is_missing(raw) {
            return f64::NAN;
        }
        raw * self.scale_factor + self.add_offset
    }

    fn is_missing(&self, raw: f64) -> bool {
        [self.fill_value, self.missing_value]
            .iter()
            .flatten()
            .any(|&m| m == raw || (m.is_nan() && raw.is_nan()))
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Temp file holding a response body; removed on drop.
struct TempNc {
    path: PathBuf,
}

impl TempNc {
    fn write(data: &[u8]) -> NetCdfResult<Self> {
        let path = get_optimal_temp_dir().join(generate_temp_filename());
        let mut file = std::fs::File::create(&path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempNc {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Get the optimal temp directory for NetCDF file operations.
///
/// On Linux, uses /dev/shm (memory-backed tmpfs) if available for faster I/O.
/// Falls back to the system temp directory on other platforms or if /dev/shm is unavailable.
fn get_optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let shm_path = Path::new("/dev/shm");
        if shm_path.is_dir() {
            // Verify we can write to /dev/shm
            let test_path = shm_path.join(format!(".ncss_test_{}", std::process::id()));
            if std::fs::write(&test_path, b"test").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return shm_path.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

/// Generate a unique temp file name from process ID, thread ID and a counter.
fn generate_temp_filename() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let tid = std::thread::current().id();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("ncss_subset_{}_{:?}_{}.nc", pid, tid, count)
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Strs(mut parts) if !parts.is_empty() => Some(parts.remove(0)),
        _ => None,
    }
}
