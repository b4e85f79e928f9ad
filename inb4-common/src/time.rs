//! Date range utilities
//!
//! Every fetch and cache key is scoped to a [`DateRange`]. Ranges are
//! whole days in UTC: `from` is the start of its day and `to` is the
//! last second of its day.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

/// Inclusive UTC time window for a listening history query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl DateRange {
    /// Create a range from two instants
    ///
    /// Fails when `from` is after `to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidInput(format!(
                "range start {} is after range end {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(Self { from, to })
    }

    /// Range covering `from` 00:00:00 through `to` 23:59:59 (UTC)
    pub fn from_days(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        Self::new(start_of_day(from), end_of_day(to))
    }

    /// Default range: 1 January of the current year through the end of `today`
    pub fn year_to_date(today: NaiveDate) -> Result<Self> {
        let jan_first = NaiveDate::from_ymd_opt(today.year(), 1, 1)
            .ok_or_else(|| Error::Internal(format!("no 1 January in year {}", today.year())))?;
        Self::from_days(jan_first, today)
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Range start as unix seconds
    pub fn from_ts(&self) -> i64 {
        self.from.timestamp()
    }

    /// Range end as unix seconds
    pub fn to_ts(&self) -> i64 {
        self.to.timestamp()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.from.to_rfc3339(), self.to.to_rfc3339())
    }
}

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("invalid date '{}': {}", value, e)))
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    // 23:59:59 is always a valid time
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(last_second))
}
