//! Currency and requirement rules.
//!
//! Everything here is a pure function of a data snapshot and an explicit
//! "now" (local wall-clock time). Nothing reads the clock, touches storage or
//! returns an error: missing or malformed inputs degrade to neutral results.
//!
//! - [`window`] picks the active semi-annual period.
//! - [`hours`] sums breakdown hours under date, aircraft, simulator, mode and
//!   seat filters.
//! - [`currency`] evaluates NG/NS currency.
//! - [`semiannual`] evaluates period quotas.
//! - [`expiry`] counts down to the medical and custom expiry dates.

pub mod currency;
pub mod dates;
pub mod expiry;
pub mod hours;
pub mod semiannual;
pub mod window;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::flight::FlightRecord;
use crate::settings::{CurrencySettings, PilotProfile, SemiannualSettings};

pub use currency::{evaluate_currency, Badge, BadgeTone, CurrencyReport, CurrencyState, ModeCurrency};
pub use expiry::{evaluate_expiry, evaluate_profile, ExpiryStatus, FieldStatus, ProfileExpiry};
pub use hours::{sum_hours, HoursFilter};
pub use semiannual::{evaluate_semiannual, QuotaProgress, SemiannualProgress, SemiannualReport};
pub use window::{resolve_active_period, Period, PeriodSlot};

/// Everything the rules read, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// The pilot's flights, in any order.
    pub flights: &'a [FlightRecord],
    /// Currency thresholds.
    pub currency: &'a CurrencySettings,
    /// Semi-annual quotas.
    pub semiannual: &'a SemiannualSettings,
    /// Profile with expiry dates.
    pub profile: &'a PilotProfile,
}

/// Combined output of every rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// The instant the report was computed for.
    pub evaluated_at: NaiveDateTime,
    /// NG/NS currency.
    pub currency: CurrencyReport,
    /// Semi-annual quotas.
    pub semiannual: SemiannualProgress,
    /// Medical and custom expiry fields.
    pub expiry: ProfileExpiry,
}

/// Run every rule over `snapshot` as of `now`.
#[must_use]
pub fn evaluate(snapshot: Snapshot<'_>, now: NaiveDateTime) -> EvaluationReport {
    EvaluationReport {
        evaluated_at: now,
        currency: evaluate_currency(snapshot.flights, snapshot.currency, now),
        semiannual: evaluate_semiannual(snapshot.flights, snapshot.semiannual, now),
        expiry: evaluate_profile(snapshot.profile, now.date()),
    }
}
