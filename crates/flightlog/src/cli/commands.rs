//! CLI command definitions and argument parsers.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use regex::Regex;

use crate::flight::{FlightMode, HourEntry, PilotRole};
use crate::rules::dates::parse_date;

/// `MODE=HOURS[@SEAT]`, e.g. `NG=1.5@L`.
static HOUR_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<mode>[A-Za-z]{1,2})=(?P<hours>\d+(?:\.\d+)?|\.\d+)(?:@(?P<seat>\S+))?$")
        .expect("Invalid regex pattern")
});

/// Parse a `MODE=HOURS[@SEAT]` argument.
///
/// # Errors
///
/// Returns a message when the argument is malformed or the mode is unknown.
pub fn parse_hour_entry(arg: &str) -> Result<HourEntry, String> {
    let caps = HOUR_ENTRY
        .captures(arg.trim())
        .ok_or_else(|| format!("expected MODE=HOURS[@SEAT], got '{arg}'"))?;

    let mode: FlightMode = caps["mode"].parse().map_err(|e| format!("{e}"))?;
    let hours: f64 = caps["hours"]
        .parse()
        .map_err(|_| format!("invalid hours in '{arg}'"))?;

    let entry = HourEntry::new(mode, hours);
    Ok(match caps.name("seat") {
        Some(seat) => entry.with_seat(seat.as_str()),
        None => entry,
    })
}

/// Parse a date argument in any accepted format.
///
/// # Errors
///
/// Returns a message when the date cannot be read.
pub fn parse_date_arg(arg: &str) -> Result<NaiveDate, String> {
    parse_date(arg).ok_or_else(|| format!("unrecognized date '{arg}' (expected YYYY-MM-DD)"))
}

/// Parse a duty role argument.
///
/// # Errors
///
/// Returns a message for an unknown role.
pub fn parse_role_arg(arg: &str) -> Result<PilotRole, String> {
    arg.parse().map_err(|e| format!("{e}"))
}

/// Flight log commands.
#[derive(Debug, Subcommand)]
pub enum FlightCommand {
    /// Log a flight
    Add(AddFlightCommand),

    /// List logged flights
    List(ListFlightsCommand),

    /// Delete flights by id
    Delete {
        /// Flight ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Import flights from a JSON array
    Import {
        /// JSON file to import
        file: PathBuf,

        /// Skip flights already in the logbook, so re-importing a file adds nothing
        #[arg(long)]
        skip_logged: bool,
    },
}

/// Arguments for logging a flight.
#[derive(Debug, Args)]
pub struct AddFlightCommand {
    /// Date flown
    #[arg(short, long, value_parser = parse_date_arg)]
    pub date: NaiveDate,

    /// Aircraft type designator
    #[arg(short, long)]
    pub aircraft: String,

    /// Custom aircraft type, overriding the designator
    #[arg(long)]
    pub custom_aircraft: Option<String>,

    /// Log as a simulator session
    #[arg(long)]
    pub sim: bool,

    /// Duty role (PIC, PI, SIC, IP, ...)
    #[arg(short, long, value_parser = parse_role_arg)]
    pub role: Option<PilotRole>,

    /// Hour breakdown entries as MODE=HOURS[@SEAT]
    #[arg(short = 'H', long = "hours", value_parser = parse_hour_entry, required = true, num_args = 1..)]
    pub hours: Vec<HourEntry>,

    /// Total hours, if different from the breakdown sum
    #[arg(long)]
    pub total: Option<f64>,

    /// Free-form remarks
    #[arg(long)]
    pub remarks: Option<String>,
}

/// Arguments for listing flights.
#[derive(Debug, Args)]
pub struct ListFlightsCommand {
    /// Only flights on or after this date
    #[arg(long, value_parser = parse_date_arg)]
    pub since: Option<NaiveDate>,

    /// Only flights on or before this date
    #[arg(long, value_parser = parse_date_arg)]
    pub until: Option<NaiveDate>,

    /// Maximum number of flights
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Evaluate as of this date instead of now
    #[arg(short, long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Only flights on or after this date
    #[arg(long, value_parser = parse_date_arg)]
    pub since: Option<NaiveDate>,

    /// Only flights on or before this date
    #[arg(long, value_parser = parse_date_arg)]
    pub until: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Which settings document to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingsKind {
    /// NG/NS currency thresholds
    Currency,
    /// Semi-annual periods and quotas
    Semiannual,
    /// Pilot profile and tracked expiry fields
    Profile,
}

/// Settings commands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show stored settings (defaults where none are stored)
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Replace a settings document from a JSON file
    Import {
        /// Document kind
        #[arg(value_enum)]
        kind: SettingsKind,

        /// JSON file to read
        file: PathBuf,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
