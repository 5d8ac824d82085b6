//! Semi-annual hour quotas.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use super::hours::{flights_in, meets_requirement, sum_entries, HoursFilter};
use super::window::{resolve_active_period, Period};
use crate::flight::FlightRecord;
use crate::settings::{CustomRequirement, SemiannualSettings};

/// Progress toward one quota.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaProgress {
    /// Hours flown, not capped.
    pub hours: f64,
    /// Hours required.
    pub required: f64,
    /// `hours / required`, clamped to 0..=100. A zero quota reads as 100.
    pub percent: f64,
    /// Whether the quota is met.
    pub met: bool,
}

impl QuotaProgress {
    /// Compare `hours` against `required`.
    #[must_use]
    pub fn new(hours: f64, required: f64) -> Self {
        let met = meets_requirement(hours, required);
        let percent = if required > 0.0 && !met {
            (hours / required * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };
        Self {
            hours,
            required,
            percent,
            met,
        }
    }

    /// Hours still to fly, zero once met.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        if self.met {
            0.0
        } else {
            (self.required - self.hours).max(0.0)
        }
    }
}

/// Progress toward one user-defined quota.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomProgress {
    /// Requirement id.
    pub id: String,
    /// Requirement name.
    pub name: String,
    /// Progress numbers.
    pub progress: QuotaProgress,
}

/// Progress within the active period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemiannualReport {
    /// The active period.
    pub period: Period,
    /// Days left in the period.
    pub days_remaining: i64,
    /// Aircraft hours toward `required_hours`.
    pub aircraft: QuotaProgress,
    /// Simulator hours toward `simulator_required_hours`.
    pub simulator: QuotaProgress,
    /// Custom quotas, in configured order.
    pub custom: Vec<CustomProgress>,
    /// Aircraft quota met, and simulator quota met when one is set.
    pub on_track: bool,
}

/// Outcome of semi-annual evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SemiannualProgress {
    /// Today falls in no configured period; the user needs to set one up.
    NoActivePeriod,
    /// Today falls in a period.
    Active(SemiannualReport),
}

impl SemiannualProgress {
    /// The report, when a period is active.
    #[must_use]
    pub fn report(&self) -> Option<&SemiannualReport> {
        match self {
            Self::NoActivePeriod => None,
            Self::Active(report) => Some(report),
        }
    }
}

fn custom_progress(
    requirement: &CustomRequirement,
    aircraft_flights: &[&FlightRecord],
    simulator_flights: &[&FlightRecord],
) -> CustomProgress {
    let pool = if requirement.is_simulator {
        simulator_flights
    } else {
        aircraft_flights
    };
    let filter = HoursFilter {
        mode: requirement.mode,
        seat: requirement.seat_position.as_deref(),
        ..HoursFilter::default()
    };
    let hours = sum_entries(pool.iter().copied(), filter);

    CustomProgress {
        id: requirement.id.clone(),
        name: requirement.name.clone(),
        progress: QuotaProgress::new(hours, requirement.required_hours),
    }
}

/// Evaluate quotas for the period containing `now`.
#[must_use]
pub fn evaluate_semiannual(
    flights: &[FlightRecord],
    settings: &SemiannualSettings,
    now: NaiveDateTime,
) -> SemiannualProgress {
    let Some(period) = resolve_active_period(settings, now) else {
        debug!("no active semi-annual period");
        return SemiannualProgress::NoActivePeriod;
    };

    let aircraft_filter = HoursFilter::any()
        .simulator(false)
        .aircraft(settings.aircraft_type.as_deref());
    let simulator_filter = HoursFilter::any()
        .simulator(true)
        .aircraft(settings.simulator_aircraft_type.as_deref());

    let aircraft_flights: Vec<&FlightRecord> =
        flights_in(flights, period.range, aircraft_filter).collect();
    let simulator_flights: Vec<&FlightRecord> =
        flights_in(flights, period.range, simulator_filter).collect();

    let aircraft = QuotaProgress::new(
        sum_entries(aircraft_flights.iter().copied(), HoursFilter::any()),
        settings.required_hours,
    );
    let simulator = QuotaProgress::new(
        sum_entries(simulator_flights.iter().copied(), HoursFilter::any()),
        settings.simulator_required_hours,
    );

    let custom = settings
        .custom_fields
        .iter()
        .map(|req| custom_progress(req, &aircraft_flights, &simulator_flights))
        .collect();

    let on_track = aircraft.met && (settings.simulator_required_hours <= 0.0 || simulator.met);

    debug!(
        slot = %period.slot,
        aircraft_hours = aircraft.hours,
        simulator_hours = simulator.hours,
        on_track,
        "evaluated semi-annual progress"
    );

    SemiannualProgress::Active(SemiannualReport {
        period,
        days_remaining: period.days_remaining(now.date()),
        aircraft,
        simulator,
        custom,
        on_track,
    })
}
