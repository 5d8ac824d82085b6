//! Semi-annual period resolution.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::trace;

use super::dates::{calendar_days_between, DateRange};
use crate::settings::SemiannualSettings;

/// Which configured period is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSlot {
    /// Period one.
    One,
    /// Period two.
    Two,
}

impl fmt::Display for PeriodSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("period one"),
            Self::Two => f.write_str("period two"),
        }
    }
}

/// A resolved semi-annual period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    /// The slot it was configured in.
    pub slot: PeriodSlot,
    /// Its inclusive date range.
    pub range: DateRange,
}

impl Period {
    /// Days from `today` until the period's last day; zero on the last day.
    #[must_use]
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        calendar_days_between(today, self.range.end).max(0)
    }
}

/// The period containing `now`, if any.
///
/// A period counts only when both its start and end are set. Period one is
/// checked first, so it wins if the two overlap.
#[must_use]
pub fn resolve_active_period(settings: &SemiannualSettings, now: NaiveDateTime) -> Option<Period> {
    let candidates = [
        (PeriodSlot::One, settings.period_one_start, settings.period_one_end),
        (PeriodSlot::Two, settings.period_two_start, settings.period_two_end),
    ];

    candidates.into_iter().find_map(|(slot, start, end)| {
        let range = DateRange::new(start?, end?);
        let hit = range.contains_instant(now);
        trace!(%slot, %range, hit, "checking semi-annual period");
        hit.then_some(Period { slot, range })
    })
}
