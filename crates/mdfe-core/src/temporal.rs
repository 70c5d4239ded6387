//! # Temporal Types
//!
//! Two timestamp flavours:
//!
//! - [`Timestamp`]: UTC, seconds precision. Used for bookkeeping such as
//!   the instant contingency mode was entered, and persisted as epoch
//!   seconds.
//! - [`FiscalDateTime`]: a date-time that keeps the offset it was declared
//!   with (`2024-03-05T10:15:00-03:00`). Document fields such as `dhEmi`
//!   and `dhEvento` carry local offsets, and the year/month embedded in the
//!   access key are read in that offset, not in UTC.

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MdfeError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, MdfeError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| MdfeError::Temporal(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// A document date-time with an explicit UTC offset, seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalDateTime(DateTime<FixedOffset>);

impl FiscalDateTime {
    /// Current local time with the host's offset.
    pub fn now() -> Self {
        let now = Local::now();
        let fixed = now.with_timezone(now.offset());
        Self(fixed.with_nanosecond(0).unwrap_or(fixed))
    }

    /// Parse an RFC 3339 date-time, keeping its offset.
    pub fn parse(s: &str) -> Result<Self, MdfeError> {
        let dt = DateTime::parse_from_rfc3339(s.trim())
            .map_err(|e| MdfeError::Temporal(format!("invalid date-time {s:?}: {e}")))?;
        Ok(Self(dt.with_nanosecond(0).unwrap_or(dt)))
    }

    /// Wrap an existing offset date-time.
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Two-digit year as it appears in the access key.
    pub fn year2(&self) -> String {
        format!("{:02}", self.0.year().rem_euclid(100))
    }

    /// Two-digit month as it appears in the access key.
    pub fn month2(&self) -> String {
        format!("{:02}", self.0.month())
    }

    /// Calendar date (`YYYY-MM-DD`), as used by closure events.
    pub fn date(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// The same instant as a UTC [`Timestamp`].
    pub fn to_utc(&self) -> Timestamp {
        Timestamp::from_utc(self.0.with_timezone(&Utc))
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS±HH:MM`.
    pub fn to_rfc3339(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }
}

impl std::fmt::Display for FiscalDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ── Timestamp ──

    #[test]
    fn test_now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:30:45Z");
    }

    #[test]
    fn test_epoch_roundtrip() {
        let ts = Timestamp::from_utc(Utc.with_ymd_and_hms(2024, 3, 5, 13, 15, 0).unwrap());
        let back = Timestamp::from_epoch_secs(ts.epoch_secs()).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn test_invalid_epoch_rejected() {
        assert!(Timestamp::from_epoch_secs(i64::MAX).is_err());
    }

    // ── FiscalDateTime ──

    #[test]
    fn test_parse_keeps_offset() {
        let dt = FiscalDateTime::parse("2024-03-05T10:15:00-03:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-05T10:15:00-03:00");
        assert_eq!(dt.to_utc().to_iso8601(), "2024-03-05T13:15:00Z");
    }

    #[test]
    fn test_year_month_read_in_declared_offset() {
        // 23:30 on Jan 31 at -03:00 is already February in UTC.
        let dt = FiscalDateTime::parse("2024-01-31T23:30:00-03:00").unwrap();
        assert_eq!(dt.year2(), "24");
        assert_eq!(dt.month2(), "01");
    }

    #[test]
    fn test_date_component() {
        let dt = FiscalDateTime::parse("2014-05-20T08:00:00-03:00").unwrap();
        assert_eq!(dt.date(), "2014-05-20");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(FiscalDateTime::parse("20/05/2014").is_err());
        assert!(FiscalDateTime::parse("").is_err());
    }
}
