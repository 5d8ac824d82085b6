//! Mode-hours aggregation over a date range.
//!
//! Flight-level filters (date, aircraft, simulator) decide which flights are
//! considered; entry-level filters (mode, seat) decide which breakdown
//! segments of those flights are summed.

use tracing::trace;

use super::dates::DateRange;
use crate::flight::{FlightRecord, HourEntry, ModeFilter, ALL_AIRCRAFT};

/// Filters applied while summing hours. Every `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoursFilter<'a> {
    /// Breakdown mode to count.
    pub mode: Option<ModeFilter>,
    /// Effective aircraft type to require. `"All Aircraft"` and blank match all.
    pub aircraft: Option<&'a str>,
    /// Required simulator flag.
    pub simulator: Option<bool>,
    /// Breakdown seat position to count.
    pub seat: Option<&'a str>,
}

impl<'a> HoursFilter<'a> {
    /// A filter that counts everything.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a mode.
    #[must_use]
    pub fn mode(mut self, mode: impl Into<ModeFilter>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Restrict to an aircraft type.
    #[must_use]
    pub fn aircraft(mut self, aircraft: Option<&'a str>) -> Self {
        self.aircraft = aircraft;
        self
    }

    /// Restrict to simulator sessions or to aircraft flights.
    #[must_use]
    pub fn simulator(mut self, simulator: bool) -> Self {
        self.simulator = Some(simulator);
        self
    }

    /// Restrict to a seat position.
    #[must_use]
    pub fn seat(mut self, seat: Option<&'a str>) -> Self {
        self.seat = seat;
        self
    }

    /// Whether a flight passes the flight-level filters. Dates are not checked here.
    #[must_use]
    pub fn accepts_flight(&self, flight: &FlightRecord) -> bool {
        if self.simulator.is_some_and(|sim| sim != flight.is_simulator) {
            return false;
        }
        match self.aircraft.map(str::trim) {
            None | Some("" | ALL_AIRCRAFT) => true,
            Some(wanted) => flight.effective_aircraft_type() == wanted,
        }
    }

    /// Whether a breakdown entry passes the mode and seat filters.
    #[must_use]
    pub fn accepts_entry(&self, entry: &HourEntry) -> bool {
        let mode_ok = self.mode.is_none_or(|filter| filter.matches(entry.mode));
        let seat_ok = match self.seat.map(str::trim) {
            None | Some("") => true,
            Some(wanted) => entry.seat_position.as_deref() == Some(wanted),
        };
        mode_ok && seat_ok
    }
}

/// Slack allowed when comparing summed hours against a requirement.
///
/// Decimal tenths do not add exactly in binary (`0.7 + 0.2 + 0.1` falls just
/// short of `1.0`).
pub const HOURS_TOLERANCE: f64 = 1e-9;

/// Whether `hours` reaches `required`, within [`HOURS_TOLERANCE`].
#[must_use]
pub fn meets_requirement(hours: f64, required: f64) -> bool {
    hours + HOURS_TOLERANCE >= required
}

/// Flights dated inside `range` that pass the flight-level filters.
///
/// Undated flights never match.
pub fn flights_in<'f>(
    flights: &'f [FlightRecord],
    range: DateRange,
    filter: HoursFilter<'f>,
) -> impl Iterator<Item = &'f FlightRecord> + 'f {
    flights.iter().filter(move |flight| {
        flight.date.is_some_and(|date| range.contains(date)) && filter.accepts_flight(flight)
    })
}

/// Sum matching breakdown hours across already-selected flights.
///
/// Negative durations are counted as zero.
pub fn sum_entries<'f>(
    flights: impl IntoIterator<Item = &'f FlightRecord>,
    filter: HoursFilter<'_>,
) -> f64 {
    flights
        .into_iter()
        .flat_map(|flight| flight.hour_breakdown.iter())
        .filter(|entry| filter.accepts_entry(entry))
        .map(|entry| entry.duration.max(0.0))
        .sum()
}

/// Total hours in `range` matching every part of `filter`.
///
/// Returns zero for no flights. The result is never rounded.
#[must_use]
pub fn sum_hours(flights: &[FlightRecord], range: DateRange, filter: HoursFilter<'_>) -> f64 {
    let total = sum_entries(flights_in(flights, range, filter), filter);
    trace!(%range, ?filter, total, "summed hours");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::FlightMode;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn first_half() -> DateRange {
        DateRange::new(date(2024, 1, 1), date(2024, 6, 30))
    }

    fn sample_flights() -> Vec<FlightRecord> {
        vec![
            FlightRecord::new(
                date(2024, 1, 10),
                "UH-60M",
                vec![
                    HourEntry::new(FlightMode::Day, 1.0).with_seat("L"),
                    HourEntry::new(FlightMode::NightGoggle, 2.0).with_seat("R"),
                ],
            ),
            FlightRecord::new(
                date(2024, 6, 30),
                "CH-47F",
                vec![HourEntry::new(FlightMode::NightSystem, 1.5)],
            ),
            FlightRecord::new(
                date(2024, 3, 3),
                "UH-60M",
                vec![HourEntry::new(FlightMode::Hood, 1.0)],
            )
            .simulator(),
            FlightRecord::new(
                date(2024, 7, 1),
                "UH-60M",
                vec![HourEntry::new(FlightMode::Day, 9.0)],
            ),
        ]
    }

    #[test]
    fn test_empty_input_is_zero() {
        assert!(sum_hours(&[], first_half(), HoursFilter::any()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_range_is_inclusive() {
        let total = sum_hours(&sample_flights(), first_half(), HoursFilter::any());
        assert!((total - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_nvd_union() {
        let total = sum_hours(&sample_flights(), first_half(), HoursFilter::any().mode(ModeFilter::Nvd));
        assert!((total - 3.5).abs() < 1e-9);

        let ng_only = sum_hours(
            &sample_flights(),
            first_half(),
            HoursFilter::any().mode(FlightMode::NightGoggle),
        );
        assert!((ng_only - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_simulator_and_aircraft_filters() {
        let flights = sample_flights();
        let aircraft = sum_hours(&flights, first_half(), HoursFilter::any().simulator(false));
        assert!((aircraft - 4.5).abs() < 1e-9);

        let sim = sum_hours(&flights, first_half(), HoursFilter::any().simulator(true));
        assert!((sim - 1.0).abs() < 1e-9);

        let blackhawk = sum_hours(
            &flights,
            first_half(),
            HoursFilter::any().simulator(false).aircraft(Some("UH-60M")),
        );
        assert!((blackhawk - 3.0).abs() < 1e-9);

        let all = sum_hours(
            &flights,
            first_half(),
            HoursFilter::any().simulator(false).aircraft(Some(ALL_AIRCRAFT)),
        );
        assert!((all - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_custom_aircraft_type_is_used() {
        let flights = vec![FlightRecord::new(
            date(2024, 2, 1),
            "UH-60M",
            vec![HourEntry::new(FlightMode::Day, 2.0)],
        )
        .with_custom_aircraft("HH-60M")];

        let by_base = sum_hours(&flights, first_half(), HoursFilter::any().aircraft(Some("UH-60M")));
        assert!(by_base.abs() < f64::EPSILON);
        let by_custom = sum_hours(&flights, first_half(), HoursFilter::any().aircraft(Some("HH-60M")));
        assert!((by_custom - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_seat_filter() {
        let total = sum_hours(&sample_flights(), first_half(), HoursFilter::any().seat(Some("R")));
        assert!((total - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_undated_and_negative_entries_ignored() {
        let mut undated = FlightRecord::new(date(2024, 2, 1), "UH-60M", vec![HourEntry::new(FlightMode::Day, 3.0)]);
        undated.date = None;
        let negative = FlightRecord::new(date(2024, 2, 1), "UH-60M", vec![HourEntry::new(FlightMode::Day, -2.0)]);

        let total = sum_hours(&[undated, negative], first_half(), HoursFilter::any());
        assert!(total.abs() < f64::EPSILON);
    }

    #[test]
    fn test_flights_in_then_sum_entries_matches_sum_hours() {
        let flights = sample_flights();
        let filter = HoursFilter::any().simulator(false).mode(ModeFilter::Nvd);
        let selected: Vec<_> = flights_in(&flights, first_half(), filter).collect();
        assert_eq!(selected.len(), 2);
        let staged = sum_entries(selected, filter);
        let direct = sum_hours(&flights, first_half(), filter);
        assert!((staged - direct).abs() < 1e-9);
    }

    #[test]
    fn test_meets_requirement_tolerates_float_drift() {
        assert!(meets_requirement(0.7 + 0.2 + 0.1, 1.0));
        assert!(meets_requirement(2.0, 1.0));
        assert!(!meets_requirement(0.9, 1.0));
        assert!(meets_requirement(0.0, 0.0));
    }
}
