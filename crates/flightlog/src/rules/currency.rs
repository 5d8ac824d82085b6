//! NG/NS currency.
//!
//! Each tracked mode passes two independent gates:
//!
//! - **hours**: hours of that mode flown in the trailing `currency_period_days`
//!   (today included) must reach the required threshold;
//! - **recency**: the most recent flight with hours in that mode must be no more
//!   than `currency_period_days` calendar days ago. Currency lapses at the end
//!   of the day `period` days after that flight.
//!
//! A mode is current only when both gates pass. A threshold of zero turns the
//! mode off entirely.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use super::dates::{add_days, calendar_days_between, end_of_day, DateRange};
use super::hours::{meets_requirement, sum_hours, HoursFilter};
use crate::flight::{FlightMode, FlightRecord};
use crate::settings::CurrencySettings;

/// Days-left at or below which the badge turns red.
pub const RED_THRESHOLD_DAYS: i64 = 15;

/// Overall state of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyState {
    /// Both gates pass.
    Current,
    /// At least one gate fails.
    Expired,
}

/// Colour band for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    /// Lapsed.
    Expired,
    /// Lapses within [`RED_THRESHOLD_DAYS`] days.
    Red,
    /// Past the halfway point of the window.
    Yellow,
    /// Comfortably current.
    Green,
}

/// A short status label with its colour band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Colour band.
    pub tone: BadgeTone,
    /// Label text, e.g. "12d left".
    pub label: String,
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Currency of one mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeCurrency {
    /// The tracked mode (NG or NS).
    pub mode: FlightMode,
    /// Threshold from settings.
    pub required_hours: f64,
    /// Hours of `mode` in the trailing window.
    pub window_hours: f64,
    /// Whether `window_hours` meets `required_hours`.
    pub hours_met: bool,
    /// Date of the most recent flight with hours in `mode`.
    pub last_qualifying_flight: Option<NaiveDate>,
    /// Whether that flight was a simulator session. Advisory only.
    pub anchored_on_simulator: bool,
    /// End of the last current day.
    pub expiration: Option<NaiveDateTime>,
    /// Days until `expiration`, never below zero.
    pub days_left: i64,
    /// Whether the recency gate has lapsed.
    pub is_expired: bool,
    /// Combined state of both gates.
    pub state: CurrencyState,
    /// Remaining share of the window, 0 to 100.
    pub progress_percent: f64,
    /// Display badge.
    pub badge: Badge,
}

/// Currency of every tracked mode. Untracked modes are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyReport {
    /// Window length used.
    pub period_days: u32,
    /// NG currency, when tracked.
    pub ng: Option<ModeCurrency>,
    /// NS currency, when tracked.
    pub ns: Option<ModeCurrency>,
}

impl CurrencyReport {
    /// Tracked modes in display order.
    pub fn tracked(&self) -> impl Iterator<Item = &ModeCurrency> {
        self.ng.iter().chain(self.ns.iter())
    }

    /// Whether every tracked mode is current. True when nothing is tracked.
    #[must_use]
    pub fn all_current(&self) -> bool {
        self.tracked().all(|m| m.state == CurrencyState::Current)
    }
}

/// The latest-dated flight with positive hours in `mode`.
///
/// Among same-day flights the first in input order wins.
#[must_use]
pub fn last_qualifying_flight(flights: &[FlightRecord], mode: FlightMode) -> Option<&FlightRecord> {
    flights
        .iter()
        .filter(|flight| {
            flight
                .hour_breakdown
                .iter()
                .any(|entry| entry.mode == mode && entry.duration > 0.0)
        })
        .filter_map(|flight| flight.date.map(|date| (date, flight)))
        .fold(None, |best: Option<(NaiveDate, &FlightRecord)>, (date, flight)| match best {
            Some((best_date, _)) if best_date >= date => best,
            _ => Some((date, flight)),
        })
        .map(|(_, flight)| flight)
}

/// Share of the window still ahead, as a percentage.
#[must_use]
pub fn progress_percent(days_left: i64, period_days: u32) -> f64 {
    if days_left <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = days_left as f64 / f64::from(period_days.max(1));
    (ratio * 100.0).min(100.0)
}

/// Badge for a mode's state and days remaining.
#[must_use]
pub fn badge(state: CurrencyState, days_left: i64, period_days: u32) -> Badge {
    let (tone, label) = if state == CurrencyState::Expired {
        (BadgeTone::Expired, "Expired".to_string())
    } else if days_left == 0 {
        (BadgeTone::Red, "Expires today".to_string())
    } else if days_left <= RED_THRESHOLD_DAYS {
        (BadgeTone::Red, format!("{days_left}d left"))
    } else if days_left * 2 <= i64::from(period_days) {
        (BadgeTone::Yellow, format!("{days_left}d left"))
    } else {
        (BadgeTone::Green, "Current".to_string())
    };
    Badge { tone, label }
}

/// Evaluate one mode against its threshold.
#[must_use]
pub fn evaluate_mode(
    flights: &[FlightRecord],
    mode: FlightMode,
    required_hours: f64,
    period_days: u32,
    now: NaiveDateTime,
) -> ModeCurrency {
    let today = now.date();

    let window = DateRange::trailing(today, period_days);
    let window_hours = sum_hours(flights, window, HoursFilter::any().mode(mode));
    let hours_met = meets_requirement(window_hours, required_hours);

    let anchor = last_qualifying_flight(flights, mode);
    let last_date = anchor.and_then(|flight| flight.date);
    let expiration_day = last_date.map(|date| add_days(date, i64::from(period_days)));

    let (days_left, is_expired) = match expiration_day {
        Some(day) => {
            let raw = calendar_days_between(today, day);
            (raw.max(0), raw < 0)
        }
        None => (0, true),
    };

    let state = if hours_met && !is_expired {
        CurrencyState::Current
    } else {
        CurrencyState::Expired
    };

    debug!(
        %mode,
        window_hours,
        required_hours,
        ?last_date,
        days_left,
        is_expired,
        ?state,
        "evaluated currency"
    );

    ModeCurrency {
        mode,
        required_hours,
        window_hours,
        hours_met,
        last_qualifying_flight: last_date,
        anchored_on_simulator: anchor.is_some_and(|flight| flight.is_simulator),
        expiration: expiration_day.map(end_of_day),
        days_left,
        is_expired,
        state,
        progress_percent: progress_percent(days_left, period_days),
        badge: badge(state, days_left, period_days),
    }
}

/// Evaluate NG and NS currency. Modes with a zero threshold are skipped.
#[must_use]
pub fn evaluate_currency(
    flights: &[FlightRecord],
    settings: &CurrencySettings,
    now: NaiveDateTime,
) -> CurrencyReport {
    let period = settings.currency_period_days;
    let track = |mode, required: f64| {
        (required > 0.0).then(|| evaluate_mode(flights, mode, required, period, now))
    };

    CurrencyReport {
        period_days: period,
        ng: track(FlightMode::NightGoggle, settings.ng_required_hours),
        ns: track(FlightMode::NightSystem, settings.ns_required_hours),
    }
}
