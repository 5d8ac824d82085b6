//! Core logbook record types.
//!
//! A [`FlightRecord`] is one logbook line: a date, the aircraft (or simulator),
//! the duty role flown and the hours broken down by flight mode.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::rules::dates::lenient;

/// Aircraft filter value that matches every aircraft type.
pub const ALL_AIRCRAFT: &str = "All Aircraft";

/// Flight condition a block of hours was flown under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FlightMode {
    /// Day.
    Day,
    /// Night, unaided.
    Night,
    /// Night with goggles.
    NightGoggle,
    /// Night with an aircraft night-vision system.
    NightSystem,
    /// Hood (simulated instrument).
    Hood,
    /// Actual weather instrument.
    Weather,
}

impl FlightMode {
    /// Every mode, in logbook column order.
    pub const ALL: [Self; 6] = [
        Self::Day,
        Self::Night,
        Self::NightGoggle,
        Self::NightSystem,
        Self::Hood,
        Self::Weather,
    ];

    /// The logbook code for this mode.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Day => "D",
            Self::Night => "N",
            Self::NightGoggle => "NG",
            Self::NightSystem => "NS",
            Self::Hood => "H",
            Self::Weather => "W",
        }
    }

    /// Whether this mode counts as night-vision-device time.
    #[must_use]
    pub fn is_nvd(self) -> bool {
        matches!(self, Self::NightGoggle | Self::NightSystem)
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FlightMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or_else(|| Error::invalid_input(format!("unknown flight mode: {s}")))
    }
}

impl TryFrom<String> for FlightMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FlightMode> for String {
    fn from(mode: FlightMode) -> Self {
        mode.code().to_string()
    }
}

/// Mode selector used by requirement filters.
///
/// `Nvd` is a synthetic union matching both NG and NS hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModeFilter {
    /// Matches one mode exactly.
    Exact(FlightMode),
    /// Matches NG or NS.
    Nvd,
}

impl ModeFilter {
    /// Whether hours logged under `mode` satisfy this filter.
    #[must_use]
    pub fn matches(self, mode: FlightMode) -> bool {
        match self {
            Self::Exact(wanted) => wanted == mode,
            Self::Nvd => mode.is_nvd(),
        }
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(mode) => mode.fmt(f),
            Self::Nvd => f.write_str("NVD"),
        }
    }
}

impl FromStr for ModeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("NVD") {
            Ok(Self::Nvd)
        } else {
            s.parse().map(Self::Exact)
        }
    }
}

impl TryFrom<String> for ModeFilter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModeFilter> for String {
    fn from(filter: ModeFilter) -> Self {
        filter.to_string()
    }
}

impl From<FlightMode> for ModeFilter {
    fn from(mode: FlightMode) -> Self {
        Self::Exact(mode)
    }
}

/// Duty role flown on a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PilotRole {
    /// Pilot in command.
    Pic,
    /// Pilot.
    Pi,
    /// Second in command.
    Sic,
    /// Instructor pilot.
    Ip,
    /// Certified flight instructor.
    Cfi,
    /// Instrument examiner.
    Ie,
    /// Standardization pilot.
    Sp,
    /// Maintenance pilot.
    Mp,
}

impl PilotRole {
    /// Every role, in display order.
    pub const ALL: [Self; 8] = [
        Self::Pic,
        Self::Pi,
        Self::Sic,
        Self::Ip,
        Self::Cfi,
        Self::Ie,
        Self::Sp,
        Self::Mp,
    ];

    /// The logbook code for this role.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Pic => "PIC",
            Self::Pi => "PI",
            Self::Sic => "SIC",
            Self::Ip => "IP",
            Self::Cfi => "CFI",
            Self::Ie => "IE",
            Self::Sp => "SP",
            Self::Mp => "MP",
        }
    }
}

impl fmt::Display for PilotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PilotRole {
    type Err = Error;

    /// Case-insensitive; `PC` is an alias of `PIC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code == "PC" {
            return Ok(Self::Pic);
        }
        Self::ALL
            .into_iter()
            .find(|role| role.code() == code)
            .ok_or_else(|| Error::invalid_input(format!("unknown pilot role: {s}")))
    }
}

/// One segment of a flight's hour breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourEntry {
    /// Flight mode the hours were logged under.
    pub mode: FlightMode,
    /// Hours, non-negative.
    pub duration: f64,
    /// Seat the hours were flown from, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_position: Option<String>,
}

impl HourEntry {
    /// Create an entry with no seat position.
    #[must_use]
    pub fn new(mode: FlightMode, duration: f64) -> Self {
        Self {
            mode,
            duration,
            seat_position: None,
        }
    }

    /// Attach a seat position.
    #[must_use]
    pub fn with_seat(mut self, seat: impl Into<String>) -> Self {
        self.seat_position = Some(seat.into());
        self
    }
}

/// A logged flight or simulator session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFlightRecord")]
pub struct FlightRecord {
    /// Identifier assigned by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Calendar date flown. `None` when the source date was missing or
    /// unreadable; such records never qualify for any requirement.
    #[serde(serialize_with = "lenient::serialize")]
    pub date: Option<NaiveDate>,

    /// Whether this was a simulator session.
    pub is_simulator: bool,

    /// Aircraft type designator.
    pub aircraft_type: String,

    /// User-entered type that overrides `aircraft_type` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_aircraft_type: Option<String>,

    /// Duty role flown.
    pub pilot_role: Option<PilotRole>,

    /// Hours by mode, in entry order.
    pub hour_breakdown: Vec<HourEntry>,

    /// Total hours as entered; expected to equal the breakdown sum.
    pub total_flight_hours: f64,

    /// Free-form remarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Wire shape accepted on input. Older records carry `is_pic` instead of a
/// role and may omit the total.
#[derive(Debug, Deserialize)]
struct RawFlightRecord {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default, with = "lenient")]
    date: Option<NaiveDate>,
    #[serde(default)]
    is_simulator: bool,
    #[serde(default)]
    aircraft_type: String,
    #[serde(default)]
    custom_aircraft_type: Option<String>,
    #[serde(default)]
    pilot_role: Option<String>,
    #[serde(default)]
    is_pic: Option<bool>,
    #[serde(default)]
    hour_breakdown: Vec<HourEntry>,
    #[serde(default)]
    total_flight_hours: Option<f64>,
    #[serde(default)]
    remarks: Option<String>,
}

impl From<RawFlightRecord> for FlightRecord {
    fn from(raw: RawFlightRecord) -> Self {
        let pilot_role = match raw.pilot_role.as_deref().map(str::parse::<PilotRole>) {
            Some(Ok(role)) => Some(role),
            Some(Err(_)) | None => raw.is_pic.filter(|pic| *pic).map(|_| PilotRole::Pic),
        };
        let total_flight_hours = raw
            .total_flight_hours
            .unwrap_or_else(|| raw.hour_breakdown.iter().map(|e| e.duration).sum());

        Self {
            id: raw.id,
            date: raw.date,
            is_simulator: raw.is_simulator,
            aircraft_type: raw.aircraft_type,
            custom_aircraft_type: raw.custom_aircraft_type.filter(|t| !t.trim().is_empty()),
            pilot_role,
            hour_breakdown: raw.hour_breakdown,
            total_flight_hours,
            remarks: raw.remarks,
        }
    }
}

impl FlightRecord {
    /// Create a flight whose total is the sum of `hour_breakdown`.
    #[must_use]
    pub fn new(date: NaiveDate, aircraft_type: impl Into<String>, hour_breakdown: Vec<HourEntry>) -> Self {
        let total_flight_hours = hour_breakdown.iter().map(|e| e.duration).sum();
        Self {
            id: None,
            date: Some(date),
            is_simulator: false,
            aircraft_type: aircraft_type.into(),
            custom_aircraft_type: None,
            pilot_role: None,
            hour_breakdown,
            total_flight_hours,
            remarks: None,
        }
    }

    /// Mark the record as a simulator session.
    #[must_use]
    pub fn simulator(mut self) -> Self {
        self.is_simulator = true;
        self
    }

    /// Set the duty role.
    #[must_use]
    pub fn with_role(mut self, role: PilotRole) -> Self {
        self.pilot_role = Some(role);
        self
    }

    /// Set a custom aircraft type.
    #[must_use]
    pub fn with_custom_aircraft(mut self, custom: impl Into<String>) -> Self {
        self.custom_aircraft_type = Some(custom.into());
        self
    }

    /// The custom type when set, otherwise `aircraft_type`.
    #[must_use]
    pub fn effective_aircraft_type(&self) -> &str {
        self.custom_aircraft_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.aircraft_type)
    }

    /// Whether the flight was flown as PIC.
    #[must_use]
    pub fn is_pic(&self) -> bool {
        self.pilot_role == Some(PilotRole::Pic)
    }

    /// Sum of the hour breakdown.
    #[must_use]
    pub fn breakdown_total(&self) -> f64 {
        self.hour_breakdown.iter().map(|e| e.duration).sum()
    }

    /// Whether `total_flight_hours` agrees with the breakdown.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        (self.breakdown_total() - self.total_flight_hours).abs() < 1e-6
    }

    /// Hours logged under modes matching `filter`.
    #[must_use]
    pub fn hours_in(&self, filter: ModeFilter) -> f64 {
        self.hour_breakdown
            .iter()
            .filter(|e| filter.matches(e.mode))
            .map(|e| e.duration.max(0.0))
            .sum()
    }

    /// BLAKE3 fingerprint of the record's logbook content, ignoring the id.
    ///
    /// Two records with the same date, aircraft, role and breakdown collide,
    /// which is how repeated imports are detected.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let date = self.date.map(|d| d.to_string()).unwrap_or_default();
        hasher.update(date.as_bytes());
        hasher.update(b"|");
        hasher.update(self.effective_aircraft_type().as_bytes());
        hasher.update(b"|");
        hasher.update(if self.is_simulator { b"sim" } else { b"acft" });
        hasher.update(b"|");
        hasher.update(self.pilot_role.map_or("", PilotRole::code).as_bytes());
        for entry in &self.hour_breakdown {
            let segment = format!(
                "|{}:{:.3}:{}",
                entry.mode,
                entry.duration,
                entry.seat_position.as_deref().unwrap_or("")
            );
            hasher.update(segment.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
