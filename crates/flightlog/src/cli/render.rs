//! Plain-text rendering for command output.

use std::fmt::Write as _;

use crate::flight::{FlightMode, FlightRecord, PilotRole};
use crate::report::LogbookTotals;
use crate::retry::BatchReport;
use crate::rules::expiry::{ExpiryStatus, FieldStatus};
use crate::rules::{EvaluationReport, ModeCurrency, QuotaProgress, SemiannualProgress};

fn hours(value: f64) -> String {
    format!("{value:.1}")
}

fn expiry_line(status: &ExpiryStatus) -> String {
    let when = if status.expired {
        format!("expired {} days ago", -status.days_until_expiry)
    } else if status.days_until_expiry == 0 {
        "expires today".to_string()
    } else {
        format!("{} days left", status.days_until_expiry)
    };
    let flag = if status.warning && !status.expired { "  (!)" } else { "" };
    format!("{} - {when}{flag}", status.expires_on)
}

fn currency_line(out: &mut String, currency: &ModeCurrency) {
    let last = currency
        .last_qualifying_flight
        .map_or_else(|| "never".to_string(), |d| d.to_string());
    let sim = if currency.anchored_on_simulator { " (sim)" } else { "" };
    let _ = writeln!(
        out,
        "  {:<3} {:<14} {}/{} h in window, last flown {last}{sim}",
        currency.mode.code(),
        currency.badge.label,
        hours(currency.window_hours),
        hours(currency.required_hours),
    );
}

fn quota_line(out: &mut String, name: &str, quota: &QuotaProgress) {
    let mark = if quota.met { "done" } else { "open" };
    let _ = writeln!(
        out,
        "  {name:<20} {:>6} / {:<6} {:>5.0}%  {mark}",
        hours(quota.hours),
        hours(quota.required),
        quota.percent,
    );
}

/// Render the combined status view.
#[must_use]
pub fn status(report: &EvaluationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Status as of {}", report.evaluated_at.date());
    let _ = writeln!(out);

    let _ = writeln!(out, "Currency ({}-day window)", report.currency.period_days);
    if report.currency.tracked().next().is_none() {
        let _ = writeln!(out, "  No currency tracked");
    }
    for mode in report.currency.tracked() {
        currency_line(&mut out, mode);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Semi-annual");
    match &report.semiannual {
        SemiannualProgress::NoActivePeriod => {
            let _ = writeln!(out, "  No active period; configure semi-annual periods");
        }
        SemiannualProgress::Active(progress) => {
            let _ = writeln!(
                out,
                "  {} ({}), {} days remaining",
                progress.period.slot, progress.period.range, progress.days_remaining
            );
            quota_line(&mut out, "Aircraft", &progress.aircraft);
            if progress.simulator.required > 0.0 {
                quota_line(&mut out, "Simulator", &progress.simulator);
            }
            for custom in &progress.custom {
                quota_line(&mut out, &custom.name, &custom.progress);
            }
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Expiry");
    match &report.expiry.medical {
        Some(medical) => {
            let _ = writeln!(out, "  {:<20} {}", "Medical", expiry_line(medical));
        }
        None => {
            let _ = writeln!(out, "  {:<20} not recorded", "Medical");
        }
    }
    for field in &report.expiry.fields {
        let value = match &field.status {
            FieldStatus::Informational { value } => value.clone(),
            FieldStatus::Expiry(status) => expiry_line(status),
        };
        let _ = writeln!(out, "  {:<20} {value}", field.name);
    }
    out
}

/// Render flights as a table.
#[must_use]
pub fn flights(flights: &[FlightRecord]) -> String {
    if flights.is_empty() {
        return "No flights logged.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<10}  {:<12}  {:<4}  {:>6}  Breakdown",
        "ID", "Date", "Aircraft", "Role", "Hours"
    );
    for flight in flights {
        let date = flight
            .date
            .map_or_else(|| "undated".to_string(), |d| d.to_string());
        let mut aircraft = flight.effective_aircraft_type().to_string();
        if flight.is_simulator {
            aircraft.push_str(" (S)");
        }
        let breakdown: Vec<String> = flight
            .hour_breakdown
            .iter()
            .map(|e| match &e.seat_position {
                Some(seat) => format!("{}={}@{seat}", e.mode, hours(e.duration)),
                None => format!("{}={}", e.mode, hours(e.duration)),
            })
            .collect();
        let _ = writeln!(
            out,
            "{:>6}  {date:<10}  {aircraft:<12}  {:<4}  {:>6}  {}",
            flight.id.map_or_else(String::new, |id| id.to_string()),
            flight.pilot_role.map_or("", PilotRole::code),
            hours(flight.total_flight_hours),
            breakdown.join(" "),
        );
    }
    out
}

/// Render logbook totals.
#[must_use]
pub fn totals(totals: &LogbookTotals) -> String {
    let mut out = String::new();
    match totals.range {
        Some(range) => {
            let _ = writeln!(out, "Totals for {range}");
        }
        None => {
            let _ = writeln!(out, "Totals for all flights");
        }
    }
    let _ = writeln!(
        out,
        "  Flights: {} ({} simulator)",
        totals.flights, totals.simulator_sessions
    );
    let _ = writeln!(
        out,
        "  Hours:   {} (aircraft {}, simulator {})",
        hours(totals.total_hours),
        hours(totals.aircraft_hours),
        hours(totals.simulator_hours)
    );

    let _ = writeln!(out, "\nBy mode");
    for mode in FlightMode::ALL {
        let _ = writeln!(out, "  {:<3} {:>8}", mode.code(), hours(totals.mode_hours(mode)));
    }

    let _ = writeln!(out, "\nBy role");
    for (role, value) in &totals.by_role {
        let _ = writeln!(out, "  {:<4} {:>8}", role.code(), hours(*value));
    }
    if totals.unassigned_role_hours > 0.0 {
        let _ = writeln!(out, "  {:<4} {:>8}", "-", hours(totals.unassigned_role_hours));
    }

    let _ = writeln!(out, "\nBy aircraft");
    for (aircraft, value) in &totals.by_aircraft {
        let _ = writeln!(out, "  {aircraft:<12} {:>8}", hours(*value));
    }
    out
}

/// Summarize a finished batch.
#[must_use]
pub fn batch(report: &BatchReport) -> String {
    let mut out = format!(
        "{}: {} succeeded, {} skipped, {} failed (of {})\n",
        report.operation,
        report.succeeded,
        report.skipped,
        report.failed(),
        report.total
    );
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "  #{} {}: {} (after {} attempts)",
            failure.index + 1,
            failure.key,
            failure.error,
            failure.attempts
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::HourEntry;
    use crate::retry::{BatchFailure, OperationError};
    use crate::rules::dates::start_of_day;
    use crate::rules::{evaluate, Snapshot};
    use crate::settings::{CurrencySettings, PilotProfile, SemiannualSettings};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_shows_each_section() {
        let flights = vec![FlightRecord::new(
            date(2024, 1, 1),
            "UH-60M",
            vec![HourEntry::new(FlightMode::NightGoggle, 1.0)],
        )];
        let currency = CurrencySettings::default();
        let semiannual = SemiannualSettings::default();
        let profile = PilotProfile {
            medical_expiry: Some(date(2024, 3, 1)),
            ..PilotProfile::default()
        };
        let report = evaluate(
            Snapshot {
                flights: &flights,
                currency: &currency,
                semiannual: &semiannual,
                profile: &profile,
            },
            start_of_day(date(2024, 2, 15)),
        );

        let text = status(&report);
        assert!(text.contains("Status as of 2024-02-15"));
        assert!(text.contains("15d left"));
        assert!(text.contains("No active period"));
        assert!(text.contains("15 days left  (!)"));
    }

    #[test]
    fn test_flights_table() {
        let mut flight = FlightRecord::new(
            date(2024, 1, 2),
            "UH-60M",
            vec![HourEntry::new(FlightMode::Day, 1.25).with_seat("L")],
        )
        .with_role(PilotRole::Pic)
        .simulator();
        flight.id = Some(7);

        let text = flights(&[flight]);
        assert!(text.contains("UH-60M (S)"));
        assert!(text.contains("D=1.2@L") || text.contains("D=1.3@L"));
        assert!(text.contains("PIC"));
        assert_eq!(flights(&[]), "No flights logged.\n");
    }

    #[test]
    fn test_batch_summary_lists_failures() {
        let report = BatchReport {
            operation: "delete",
            total: 2,
            succeeded: 1,
            skipped: 0,
            failures: vec![BatchFailure {
                index: 1,
                key: "flight 9".to_string(),
                attempts: 1,
                error: OperationError::Failed("flight 9 not found".to_string()),
            }],
        };
        let text = batch(&report);
        assert!(text.starts_with("delete: 1 succeeded, 0 skipped, 1 failed (of 2)"));
        assert!(text.contains("#2 flight 9: flight 9 not found"));
    }

    #[test]
    fn test_totals_lists_every_mode() {
        let text = totals(&crate::report::totals(&[], None));
        for mode in FlightMode::ALL {
            assert!(text.contains(mode.code()));
        }
    }
}
