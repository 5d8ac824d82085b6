//! Command-line interface for flightlog.
//!
//! This module provides the CLI structure, argument parsers and text
//! rendering for the `fltlog` binary.

mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    parse_date_arg, parse_hour_entry, parse_role_arg, AddFlightCommand, ConfigCommand,
    FlightCommand, ListFlightsCommand, ReportCommand, SettingsCommand, SettingsKind,
    StatusCommand,
};

use crate::logging::Verbosity;

/// fltlog - Pilot logbook with currency tracking
///
/// Logs flights and simulator sessions, and reports NG/NS currency,
/// semi-annual hour quotas and upcoming expiry dates.
#[derive(Debug, Parser)]
#[command(name = "fltlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log, list, import and delete flights
    #[command(subcommand)]
    Flight(FlightCommand),

    /// Show currency, semi-annual progress and expiry dates
    Status(StatusCommand),

    /// View or replace stored settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Show logbook totals
    Report(ReportCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
