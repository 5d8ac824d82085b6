//! Logbook totals.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::flight::{FlightMode, FlightRecord, PilotRole};
use crate::rules::dates::DateRange;
use crate::rules::hours::{flights_in, HoursFilter};

/// Hours summed across a set of flights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogbookTotals {
    /// The date range, when one was applied.
    pub range: Option<DateRange>,
    /// Records counted.
    pub flights: usize,
    /// Records flagged as simulator sessions.
    pub simulator_sessions: usize,
    /// All breakdown hours.
    pub total_hours: f64,
    /// Hours in aircraft.
    pub aircraft_hours: f64,
    /// Hours in simulators.
    pub simulator_hours: f64,
    /// Hours per flight mode.
    pub by_mode: BTreeMap<FlightMode, f64>,
    /// Hours per duty role.
    pub by_role: BTreeMap<PilotRole, f64>,
    /// Hours with no role recorded.
    pub unassigned_role_hours: f64,
    /// Hours per effective aircraft type.
    pub by_aircraft: BTreeMap<String, f64>,
}

impl LogbookTotals {
    fn add(&mut self, flight: &FlightRecord) {
        self.flights += 1;
        let mut hours = 0.0;
        for entry in &flight.hour_breakdown {
            let duration = entry.duration.max(0.0);
            *self.by_mode.entry(entry.mode).or_insert(0.0) += duration;
            hours += duration;
        }

        self.total_hours += hours;
        if flight.is_simulator {
            self.simulator_sessions += 1;
            self.simulator_hours += hours;
        } else {
            self.aircraft_hours += hours;
        }

        match flight.pilot_role {
            Some(role) => *self.by_role.entry(role).or_insert(0.0) += hours,
            None => self.unassigned_role_hours += hours,
        }
        *self
            .by_aircraft
            .entry(flight.effective_aircraft_type().to_string())
            .or_insert(0.0) += hours;
    }

    /// Hours logged under `mode`.
    #[must_use]
    pub fn mode_hours(&self, mode: FlightMode) -> f64 {
        self.by_mode.get(&mode).copied().unwrap_or(0.0)
    }
}

/// Sum `flights`, restricted to `range` when given.
///
/// Undated flights only count when no range is applied.
#[must_use]
pub fn totals(flights: &[FlightRecord], range: Option<DateRange>) -> LogbookTotals {
    let mut totals = LogbookTotals {
        range,
        ..LogbookTotals::default()
    };
    match range {
        Some(range) => flights_in(flights, range, HoursFilter::any()).for_each(|f| totals.add(f)),
        None => flights.iter().for_each(|f| totals.add(f)),
    }
    totals
}
