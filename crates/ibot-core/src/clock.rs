//! Timestamp normalization into the display timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::{errors::Error, Result};

/// Shown in place of a local time when the upstream timestamp is unusable.
pub const UNKNOWN_TIME: &str = "unknown time";

/// Converts upstream UTC timestamps into one civil timezone (DST-aware).
#[derive(Clone, Copy, Debug)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// `hh:mm AM/PM <ZONE>`, e.g. `07:05 PM EDT`.
    pub fn to_local_display(&self, ts: &str) -> Result<String> {
        let utc = parse_utc(ts)?;
        Ok(self.display_instant(utc))
    }

    /// Same as [`to_local_display`](Self::to_local_display) but never fails.
    pub fn display_or_unknown(&self, ts: Option<&str>) -> String {
        ts.and_then(|ts| self.to_local_display(ts).ok())
            .unwrap_or_else(|| UNKNOWN_TIME.to_string())
    }

    fn display_instant(&self, utc: DateTime<Utc>) -> String {
        utc.with_timezone(&self.tz)
            .format("%I:%M %p %Z")
            .to_string()
    }

    /// Calendar date of `ts` in the display timezone.
    pub fn to_local_date(&self, ts: &str) -> Result<NaiveDate> {
        let utc = parse_utc(ts)?;
        Ok(utc.with_timezone(&self.tz).date_naive())
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    pub fn local_now(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }
}

/// Parse an upstream ISO-8601 timestamp.
///
/// Accepts RFC 3339 (`Z` or numeric offset) and offset-less timestamps, which
/// are taken as UTC.
pub fn parse_utc(ts: &str) -> Result<DateTime<Utc>> {
    let v = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Timestamp {
            value: ts.to_string(),
            reason: e.to_string(),
        })
}
