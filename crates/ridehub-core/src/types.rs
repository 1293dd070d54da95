use chrono::{DateTime, Datelike, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, RidehubError};

/// Unique identifier for a reservation (UUIDv7, so ids sort by creation time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub String);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference to a driver owned by the (external) driver roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub String);

impl DriverId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DriverId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DriverId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to a vehicle; usually assigned together with a driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VehicleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Current UTC time truncated to the precision we persist (microseconds).
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Unix seconds of `0000-01-01T00:00:00Z` and `9999-12-31T23:59:59Z`, the
/// ends of the four-digit-year range the storage layout can hold.
const MIN_STORABLE_SECS: i64 = -62_167_219_200;
const MAX_STORABLE_SECS: i64 = 253_402_300_799;

/// Whether `ts` falls in years 0000..=9999.
pub fn is_storable(ts: DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Pull `ts` into the storable range. Only meant for query bounds, where
/// every stored value already lies inside the range.
pub fn clamp_storable(ts: DateTime<Utc>) -> DateTime<Utc> {
    let lo = DateTime::from_timestamp(MIN_STORABLE_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let hi = DateTime::from_timestamp(MAX_STORABLE_SECS, 999_999_000)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    ts.clamp(lo, hi)
}

/// Fixed-width RFC 3339 form (`2026-01-01T09:30:00.000000Z`).
///
/// Every stored timestamp uses this layout so SQL string comparison matches
/// chronological order. Years outside 0000..=9999 would break both the width
/// and the ordering, so they are refused.
pub fn format_ts(ts: DateTime<Utc>) -> Result<String> {
    if !is_storable(ts) {
        return Err(RidehubError::Timestamp(format!(
            "{ts} is outside years 0000-9999"
        )));
    }
    Ok(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Parse any RFC 3339 timestamp into UTC at persisted precision.
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|e| RidehubError::Timestamp(format!("{s}: {e}")))
}

/// Smallest timestamp strictly after `prev`, or `now` when the clock has moved on.
///
/// Keeps `updated_at` strictly increasing even when two mutations land in
/// the same microsecond or the wall clock steps backwards.
pub fn next_after(prev: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}
