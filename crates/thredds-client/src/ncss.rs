//! NetCDF Subset Service (NCSS) grid queries.
//!
//! A query selects a lat/lon box, a time and a set of variables, plus the
//! response format. It encodes to the NCSS query-string grammar:
//!
//! ```text
//! north=43&south=35&east=-100&west=-111&time=2024-01-15T12:00:00Z&accept=netcdf4&var=Temperature_surface
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use grid_common::{parse_iso8601, BoundingBox};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ThreddsError, ThreddsResult};

/// Placeholder endpoint for encoding and decoding bare query strings.
const QUERY_BASE: &str = "http://localhost/ncss/grid";

/// Response encodings NCSS can return for grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResponseFormat {
    #[serde(rename = "netcdf")]
    NetCdf3,
    #[default]
    #[serde(rename = "netcdf4")]
    NetCdf4,
}

impl ResponseFormat {
    /// Value of the `accept` query parameter.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::NetCdf3 => "netcdf",
            Self::NetCdf4 => "netcdf4",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ResponseFormat {
    type Err = ThreddsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netcdf" | "netcdf3" => Ok(Self::NetCdf3),
            "netcdf4" => Ok(Self::NetCdf4),
            other => Err(ThreddsError::InvalidQuery(format!(
                "unsupported response format: {}",
                other
            ))),
        }
    }
}

/// Temporal part of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSelection {
    /// Nearest available time to an instant
    Instant(DateTime<Utc>),
    /// Time closest to now, decided by the server
    Present,
    /// Every available time
    All,
}

/// A grid subset request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NcssQuery {
    pub bbox: Option<BoundingBox>,
    pub time: Option<TimeSelection>,
    pub variables: BTreeSet<String>,
    pub accept: Option<ResponseFormat>,
}

impl NcssQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lonlat_box(&mut self, north: f64, south: f64, east: f64, west: f64) -> &mut Self {
        self.bbox = Some(BoundingBox::new(north, south, east, west));
        self
    }

    pub fn bbox(&mut self, bbox: BoundingBox) -> &mut Self {
        self.bbox = Some(bbox);
        self
    }

    /// Request the time nearest `time`. NCSS times carry whole seconds, so
    /// any fractional part is truncated.
    pub fn time(&mut self, time: DateTime<Utc>) -> &mut Self {
        self.time_selection(TimeSelection::Instant(time))
    }

    pub fn time_selection(&mut self, selection: TimeSelection) -> &mut Self {
        self.time = Some(match selection {
            TimeSelection::Instant(t) => TimeSelection::Instant(t.trunc_subsecs(0)),
            other => other,
        });
        self
    }

    pub fn accept(&mut self, format: ResponseFormat) -> &mut Self {
        self.accept = Some(format);
        self
    }

    /// Add a variable. Names containing commas are rejected by
    /// [`validate`](Self::validate) since NCSS splits `var` on commas.
    pub fn variable(&mut self, name: impl Into<String>) -> &mut Self {
        self.variables.insert(name.into());
        self
    }

    pub fn variables<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables.extend(names.into_iter().map(Into::into));
        self
    }

    /// Check the query can be sent: at least one variable, names that survive
    /// the `var` list encoding, ordered bounds.
    pub fn validate(&self) -> ThreddsResult<()> {
        if self.variables.is_empty() {
            return Err(ThreddsError::InvalidQuery(
                "at least one variable is required".to_string(),
            ));
        }
        for name in &self.variables {
            if name.trim().is_empty() {
                return Err(ThreddsError::InvalidQuery(
                    "variable names must not be blank".to_string(),
                ));
            }
            if name.contains(',') || name.trim() != name {
                return Err(ThreddsError::InvalidQuery(format!(
                    "variable name cannot be encoded: {:?}",
                    name
                )));
            }
        }
        if let Some(bbox) = &self.bbox {
            bbox.validate()
                .map_err(|e| ThreddsError::InvalidQuery(e.to_string()))?;
        }
        Ok(())
    }

    /// Ordered `(key, value)` pairs of the encoded query.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(bbox) = &self.bbox {
            pairs.push(("north", bbox.north.to_string()));
            pairs.push(("south", bbox.south.to_string()));
            pairs.push(("east", bbox.east.to_string()));
            pairs.push(("west", bbox.west.to_string()));
        }
        match self.time {
            Some(TimeSelection::Instant(t)) => {
                pairs.push(("time", t.to_rfc3339_opts(SecondsFormat::Secs, true)))
            }
            Some(TimeSelection::Present) => pairs.push(("time", "present".to_string())),
            Some(TimeSelection::All) => pairs.push(("temporal", "all".to_string())),
            None => {}
        }
        if let Some(accept) = self.accept {
            pairs.push(("accept", accept.wire_name().to_string()));
        }
        for var in &self.variables {
            pairs.push(("var", var.clone()));
        }
        pairs
    }

    /// The endpoint URL with this query attached, replacing any existing query.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.set_query(None);
        let pairs = self.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())));
        }
        url
    }

    /// Form-encoded query string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        Url::parse(QUERY_BASE)
            .map(|base| self.to_url(&base).query().unwrap_or_default().to_string())
            .unwrap_or_default()
    }

    /// Decode the query of an NCSS URL.
    ///
    /// Unknown parameters are rejected so that an encoded query recovers
    /// exactly what was built.
    pub fn from_url(url: &Url) -> ThreddsResult<Self> {
        let mut query = NcssQuery::new();
        let mut edges: [Option<f64>; 4] = [None; 4];

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "north" => edges[0] = Some(parse_edge(&key, &value)?),
                "south" => edges[1] = Some(parse_edge(&key, &value)?),
                "east" => edges[2] = Some(parse_edge(&key, &value)?),
                "west" => edges[3] = Some(parse_edge(&key, &value)?),
                "time" if value.eq_ignore_ascii_case("present") => {
                    query.time_selection(TimeSelection::Present);
                }
                "time" => {
                    let t = parse_iso8601(&value).ok_or_else(|| {
                        ThreddsError::InvalidQuery(format!("invalid time: {}", value))
                    })?;
                    query.time(t);
                }
                "temporal" if value.eq_ignore_ascii_case("all") => {
                    query.time_selection(TimeSelection::All);
                }
                "accept" => {
                    query.accept(value.parse()?);
                }
                "var" => {
                    query.variables(value.split(',').map(str::trim).filter(|v| !v.is_empty()));
                }
                other => {
                    return Err(ThreddsError::InvalidQuery(format!(
                        "unexpected parameter: {}={}",
                        other, value
                    )))
                }
            }
        }

        match edges {
            [Some(n), Some(s), Some(e), Some(w)] => {
                query.lonlat_box(n, s, e, w);
            }
            [None, None, None, None] => {}
            _ => {
                return Err(ThreddsError::InvalidQuery(
                    "north, south, east and west must be given together".to_string(),
                ))
            }
        }

        Ok(query)
    }

    /// Decode a bare query string (with or without the leading `?`).
    pub fn from_query_string(query: &str) -> ThreddsResult<Self> {
        let raw = format!("{}?{}", QUERY_BASE, query.trim_start_matches('?'));
        let url = Url::parse(&raw).map_err(|e| ThreddsError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        Self::from_url(&url)
    }
}

fn parse_edge(key: &str, value: &str) -> ThreddsResult<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ThreddsError::InvalidQuery(format!("invalid {}: {}", key, value)))
}
