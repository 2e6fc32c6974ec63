//! Time handling for CF-convention time coordinates.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{GridError, GridResult};

/// Parsed CF time units, e.g. `"Hour since 2024-01-15T00:00:00Z"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    /// Length of one unit step in seconds
    pub step_seconds: i64,
    /// Reference time the offsets count from
    pub epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse a `"<unit> since <reference>"` string.
    pub fn parse(units: &str) -> GridResult<Self> {
        let lower = units.trim().to_ascii_lowercase();
        let (unit, reference) = lower
            .split_once(" since ")
            .ok_or_else(|| GridError::InvalidTimeUnits(units.to_string()))?;

        let step_seconds = match unit.trim() {
            "second" | "seconds" | "sec" | "secs" | "s" => 1,
            "minute" | "minutes" | "min" | "mins" => 60,
            "hour" | "hours" | "hr" | "hrs" | "h" => 3600,
            "day" | "days" | "d" => 86_400,
            _ => return Err(GridError::InvalidTimeUnits(units.to_string())),
        };

        let epoch = parse_reference_time(reference.trim())
            .ok_or_else(|| GridError::InvalidTimeUnits(units.to_string()))?;

        Ok(Self {
            step_seconds,
            epoch,
        })
    }

    /// Convert an offset in these units to an absolute time.
    pub fn to_datetime(&self, value: f64) -> GridResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(GridError::TimeOutOfRange(value));
        }
        let millis = (value * self.step_seconds as f64 * 1000.0).round();
        // i64::MAX is not representable as f64; the cast rounds up to 2^63.
        if millis.abs() >= i64::MAX as f64 {
            return Err(GridError::TimeOutOfRange(value));
        }
        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| self.epoch.checked_add_signed(offset))
            .ok_or(GridError::TimeOutOfRange(value))
    }
}

/// Decode a CF time value given its `units` attribute.
pub fn decode_cf_time(value: f64, units: &str) -> GridResult<DateTime<Utc>> {
    CfTimeUnits::parse(units)?.to_datetime(value)
}

/// Parse an ISO 8601 timestamp, assuming UTC when no offset is given.
pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let trimmed = s.trim_end_matches('Z').trim_end_matches(" utc").trim();

    // Try without timezone (assume UTC)
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    // Try date only
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

fn parse_reference_time(s: &str) -> Option<DateTime<Utc>> {
    // Units strings were lowercased; restore the separators RFC 3339 wants.
    let normalized = s.replace('t', "T").replace('z', "Z");
    parse_iso8601(&normalized).or_else(|| parse_iso8601(s))
}
