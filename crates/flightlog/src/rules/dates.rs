//! Calendar helpers shared by the rules.
//!
//! Flight dates carry no time-of-day; they are anchored at local midnight.
//! Period and expiry boundaries extend to the last millisecond of their day.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Midnight at the start of `date`.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 on `date`.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    // 23:59:59.999 always exists, so the fallback is never taken.
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| start_of_day(date))
}

/// Whole calendar days from `from` to `to`; negative when `to` is earlier.
#[must_use]
pub fn calendar_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// `date` shifted by `days`, saturating at the calendar limits.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(if days >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day in the range.
    pub start: NaiveDate,
    /// Last day in the range, included in full.
    pub end: NaiveDate,
}

impl DateRange {
    /// Range from `start` through `end`.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` calendar days ending on `today`, `today` included.
    ///
    /// A window of zero days is treated as `today` alone.
    #[must_use]
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self::new(add_days(today, -span), today)
    }

    /// Whether `date`, taken at the start of its day, falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        let at = start_of_day(date);
        at >= start_of_day(self.start) && at <= end_of_day(self.end)
    }

    /// Whether the instant falls inside the range.
    #[must_use]
    pub fn contains_instant(&self, at: NaiveDateTime) -> bool {
        at >= start_of_day(self.start) && at <= end_of_day(self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Parse a loosely formatted date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY` and full timestamps
/// (RFC 3339 or `YYYY-MM-DDTHH:MM:SS`), keeping only the calendar date.
/// Anything else yields `None`.
#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(input) {
        return Some(ts.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, format) {
            return Some(ts.date());
        }
    }
    ["%Y/%m/%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
}

/// Serde adapter for optional dates that tolerates garbage.
///
/// Malformed or empty strings deserialize to `None` instead of failing, so a
/// bad date reads as "not set".
pub mod lenient {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Deserialize an optional, possibly malformed, date string.
    ///
    /// # Errors
    ///
    /// Only fails when the value is not a string or null at all.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(super::parse_date))
    }

    /// Serialize as `YYYY-MM-DD` or null.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }
}
