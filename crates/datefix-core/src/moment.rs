use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Civil capture time, always expressed in the run's configured time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureMoment(NaiveDateTime);

impl CaptureMoment {
    /// Build from individual fields. Returns `None` unless the fields form a
    /// valid date and time of day.
    pub fn from_fields(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, minute, second)
            .map(Self)
    }

    /// Parse an EXIF "date taken" value (`YYYY:MM:DD HH:MM:SS`).
    pub fn parse_date_taken(raw: &str) -> Option<Self> {
        let cleaned = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        NaiveDateTime::parse_from_str(cleaned, "%Y:%m:%d %H:%M:%S")
            .ok()
            .map(Self)
    }

    /// Wall-clock reading of `instant` in `tz`.
    pub fn from_instant(instant: DateTime<Utc>, tz: Tz) -> Self {
        Self(instant.with_timezone(&tz).naive_local())
    }

    /// `YYYYMMDD_HHMMSS`
    pub fn stem(&self) -> String {
        self.0.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Absolute instant for this wall-clock time in `tz`.
    ///
    /// A time repeated by a DST fall-back resolves to the earlier instant. A
    /// time skipped by a spring-forward gap resolves to the same reading one
    /// hour later.
    pub fn to_instant(&self, tz: Tz) -> DateTime<Utc> {
        let local = tz
            .from_local_datetime(&self.0)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(self.0 + TimeDelta::hours(1))).earliest());
        match local {
            Some(dt) => dt.with_timezone(&Utc),
            // Gaps longer than an hour (calendar shifts) fall back to reading UTC.
            None => Utc.from_utc_datetime(&self.0),
        }
    }
}

impl fmt::Display for CaptureMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}
