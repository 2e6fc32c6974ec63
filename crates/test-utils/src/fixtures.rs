//! Common test fixtures for forecast-map tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios when talking to a THREDDS server and drawing its grids.

use std::io::Write;

/// Common bounding box definitions for testing, as `(north, south, east, west)`.
pub mod bbox {
    /// The default forecast box over the central Rockies
    pub const COLORADO: (f64, f64, f64, f64) = (43.0, 35.0, -100.0, -111.0);

    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (55.0, 20.0, -60.0, -130.0);

    /// Global bounding box
    pub const GLOBAL: (f64, f64, f64, f64) = (90.0, -90.0, 180.0, -180.0);

    /// A single quarter-degree cell
    pub const SINGLE_CELL: (f64, f64, f64, f64) = (40.25, 40.0, -104.75, -105.0);

    /// Invalid bbox (south above north)
    pub const INVERTED: (f64, f64, f64, f64) = (35.0, 43.0, -100.0, -111.0);
}

/// Unit strings as they appear in NCSS responses.
pub mod units {
    /// Time units THREDDS writes for GRIB collections
    pub const THREDDS_HOURS: &str = "Hour since 2024-01-15T00:00:00Z";

    /// Conventional CF spelling
    pub const CF_HOURS: &str = "hours since 2024-01-15 00:00:00";

    pub const KELVIN: &str = "K";
}

/// URL of the GFS quarter-degree "Best" catalog used by the default scenario.
pub const GFS_BEST_CATALOG_URL: &str = "https://thredds.ucar.edu/thredds/catalog/grib/NCEP/GFS/Global_0p25deg/catalog.xml?dataset=grib/NCEP/GFS/Global_0p25deg/Best";

/// Single-dataset catalog in the shape THREDDS returns for `?dataset=...Best`.
///
/// The dataset inherits its services from a compound service through
/// `<metadata inherited="true">`.
pub const CATALOG_GFS_BEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0" xmlns:xlink="http://www.w3.org/1999/xlink" name="Catalog grib/NCEP/GFS/Global_0p25deg/Best" version="1.0.6">
  <service name="VirtualServices" serviceType="Compound" base="">
    <service name="odap" serviceType="OpenDAP" base="/thredds/dodsC/" />
    <service name="wms" serviceType="WMS" base="/thredds/wms/" />
    <service name="ncssGrid" serviceType="NetcdfSubset" base="/thredds/ncss/grid/" />
    <service name="http" serviceType="HTTPServer" base="/thredds/fileServer/" />
  </service>
  <dataset name="Best GFS Quarter Degree Forecast Time Series" ID="grib/NCEP/GFS/Global_0p25deg/Best" urlPath="grib/NCEP/GFS/Global_0p25deg/Best">
    <metadata inherited="true">
      <serviceName>VirtualServices</serviceName>
      <dataType>GRID</dataType>
      <dataFormat>GRIB-2</dataFormat>
    </metadata>
    <documentation type="summary">Two Best Time Series for each valid time.</documentation>
  </dataset>
</catalog>
"#;

/// Catalog with a container dataset, explicit `<access>` elements and a catalogRef.
pub const CATALOG_NESTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.0.6">
  <service name="all" serviceType="Compound" base="">
    <service name="ncss" serviceType="NetcdfSubset" base="/thredds/ncss/grid/" />
    <service name="dods" serviceType="OpenDAP" base="/thredds/dodsC/" />
  </service>
  <service name="files" serviceType="HTTPServer" base="/thredds/fileServer/" />
  <dataset name="GFS Quarter Degree Forecast" ID="grib/NCEP/GFS/Global_0p25deg">
    <metadata inherited="true">
      <serviceName>all</serviceName>
    </metadata>
    <dataset name="Full Collection (Reference / Forecast Time) Dataset" ID="grib/NCEP/GFS/Global_0p25deg/TwoD" urlPath="grib/NCEP/GFS/Global_0p25deg/TwoD" />
    <dataset name="Best GFS Quarter Degree Forecast Time Series" ID="grib/NCEP/GFS/Global_0p25deg/Best" urlPath="grib/NCEP/GFS/Global_0p25deg/Best" />
    <dataset name="Raw GRIB file" ID="gfs-raw">
      <access serviceName="files" urlPath="grib/NCEP/GFS/Global_0p25deg/GFS_Global_0p25deg_20240115_0000.grib2" />
    </dataset>
    <catalogRef xlink:href="latest.xml" xlink:title="Latest Collection for GFS Quarter Degree Forecast" name="" />
  </dataset>
</catalog>
"#;

/// Catalog whose only dataset is served over plain HTTP.
pub const CATALOG_NO_SUBSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0" version="1.0.6">
  <service name="files" serviceType="HTTPServer" base="/thredds/fileServer/" />
  <dataset name="GFS_Global_0p25deg_20240115_0000.grib2" ID="gfs-file" urlPath="grib/NCEP/GFS/Global_0p25deg/GFS_Global_0p25deg_20240115_0000.grib2">
    <serviceName>files</serviceName>
  </dataset>
</catalog>
"#;

/// Catalog with services but no datasets.
pub const CATALOG_EMPTY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0" version="1.0.6">
  <service name="ncss" serviceType="NetcdfSubset" base="/thredds/ncss/grid/" />
</catalog>
"#;

/// Two boundary lines crossing the Colorado box, plus a polygon.
pub const BOUNDARIES_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "Colorado-Wyoming" },
      "geometry": {
        "type": "LineString",
        "coordinates": [[-109.05, 41.0], [-106.0, 41.0], [-104.5, 41.0], [-102.05, 41.0]]
      }
    },
    {
      "type": "Feature",
      "properties": { "name": "Colorado-Utah" },
      "geometry": {
        "type": "MultiLineString",
        "coordinates": [[[-109.05, 41.0], [-109.05, 37.0]]]
      }
    },
    {
      "type": "Feature",
      "properties": { "name": "box" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[-105.0, 39.0], [-104.0, 39.0], [-104.0, 40.0], [-105.0, 40.0], [-105.0, 39.0]]]
      }
    }
  ]
}"#;

/// Write `contents` to a named temporary file with the given suffix.
///
/// The file is deleted when the returned handle is dropped.
pub fn write_temp_file(contents: &[u8], suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("forecast-map-test-")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}
