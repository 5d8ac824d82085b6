//! `fltlog` - CLI for flightlog
//!
//! This binary provides the command-line interface for logging flights and
//! checking currency, semi-annual progress and expiry dates.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use flightlog::cli::{
    render, AddFlightCommand, Cli, Command, ConfigCommand, FlightCommand, ListFlightsCommand,
    ReportCommand, SettingsCommand, SettingsKind, StatusCommand,
};
use flightlog::rules::dates::{start_of_day, DateRange};
use flightlog::rules::{evaluate, Snapshot};
use flightlog::{
    init_logging, run_batch, Config, FlightDeletion, FlightImport, FlightRecord, PilotProfile,
    Storage,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Flight(cmd) => handle_flight(&config, cmd).await,
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Settings(cmd) => handle_settings(&config, cmd),
        Command::Report(cmd) => handle_report(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open logbook at {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn profile_fallback(config: &Config) -> PilotProfile {
    PilotProfile {
        medical_warning_days: config.defaults.medical_warning_days,
        ..PilotProfile::default()
    }
}

async fn handle_flight(config: &Config, cmd: FlightCommand) -> Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        FlightCommand::Add(add) => add_flight(&storage, add),
        FlightCommand::List(list) => list_flights(&storage, &list),
        FlightCommand::Delete { ids } => {
            let report =
                run_batch(&config.retry_policy(), &FlightDeletion::new(&storage), &ids).await;
            print!("{}", render::batch(&report));
            report.into_result()?;
            Ok(())
        }
        FlightCommand::Import { file, skip_logged } => {
            let flights: Vec<FlightRecord> = read_json(&file)?;
            let undated = flights.iter().filter(|f| f.date.is_none()).count();
            if undated > 0 {
                warn!(undated, "importing flights without a readable date");
            }
            let import = if skip_logged {
                FlightImport::skip_logged(&storage)?
            } else {
                FlightImport::new(&storage)
            };
            let report = run_batch(&config.retry_policy(), &import, &flights).await;
            print!("{}", render::batch(&report));
            report.into_result()?;
            Ok(())
        }
    }
}

fn add_flight(storage: &Storage, add: AddFlightCommand) -> Result<()> {
    let mut flight = FlightRecord::new(add.date, add.aircraft, add.hours);
    flight.is_simulator = add.sim;
    flight.pilot_role = add.role;
    flight.custom_aircraft_type = add.custom_aircraft.filter(|t| !t.trim().is_empty());
    flight.remarks = add.remarks;
    if let Some(total) = add.total {
        flight.total_flight_hours = total;
    }
    if !flight.is_consistent() {
        warn!(
            total = flight.total_flight_hours,
            breakdown = flight.breakdown_total(),
            "total hours differ from the breakdown"
        );
    }

    let id = storage.insert(&flight)?;
    println!("Logged flight {id}");
    Ok(())
}

fn list_flights(storage: &Storage, list: &ListFlightsCommand) -> Result<()> {
    let flights = storage.list_between(list.since, list.until, Some(list.limit))?;
    if list.json {
        print_json(&flights)
    } else {
        print!("{}", render::flights(&flights));
        Ok(())
    }
}

fn evaluation_time(date: Option<chrono::NaiveDate>) -> NaiveDateTime {
    date.map_or_else(|| Local::now().naive_local(), start_of_day)
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let flights = storage.all()?;
    let currency = storage.load_currency_settings(config.currency_defaults())?;
    let semiannual = storage.load_semiannual_settings()?;
    let profile = storage.load_profile(profile_fallback(config))?;

    let now = evaluation_time(cmd.date);
    debug!(%now, flights = flights.len(), "evaluating status");
    let report = evaluate(
        Snapshot {
            flights: &flights,
            currency: &currency,
            semiannual: &semiannual,
            profile: &profile,
        },
        now,
    );

    if cmd.json {
        print_json(&report)
    } else {
        print!("{}", render::status(&report));
        Ok(())
    }
}

fn handle_settings(config: &Config, cmd: SettingsCommand) -> Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        SettingsCommand::Show { json } => {
            let settings = serde_json::json!({
                "currency": storage.load_currency_settings(config.currency_defaults())?,
                "semiannual": storage.load_semiannual_settings()?,
                "profile": storage.load_profile(profile_fallback(config))?,
            });
            if json {
                println!("{}", serde_json::to_string(&settings)?);
            } else {
                print_json(&settings)?;
            }
        }
        SettingsCommand::Import { kind, file } => {
            match kind {
                SettingsKind::Currency => storage.save_currency_settings(&read_json(&file)?)?,
                SettingsKind::Semiannual => storage.save_semiannual_settings(&read_json(&file)?)?,
                SettingsKind::Profile => storage.save_profile(&read_json(&file)?)?,
            }
            println!("Saved {kind:?} settings from {}", file.display());
        }
    }
    Ok(())
}

fn handle_report(config: &Config, cmd: &ReportCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let flights = storage.all()?;
    let range = (cmd.since.is_some() || cmd.until.is_some()).then(|| {
        DateRange::new(
            cmd.since.unwrap_or(chrono::NaiveDate::MIN),
            cmd.until.unwrap_or(chrono::NaiveDate::MAX),
        )
    });
    let totals = flightlog::report::totals(&flights, range);

    if cmd.json {
        print_json(&totals)
    } else {
        print!("{}", render::totals(&totals));
        Ok(())
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                print_json(config)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:        {}", config.database_path().display());
                println!();
                println!("[Defaults]");
                println!(
                    "  Currency period:      {} days",
                    config.defaults.currency_period_days
                );
                println!("  NG required:          {} h", config.defaults.ng_required_hours);
                println!("  NS required:          {} h", config.defaults.ns_required_hours);
                println!(
                    "  Medical warning:      {} days",
                    config.defaults.medical_warning_days
                );
                println!();
                println!("[Retry]");
                println!("  Max retries:          {}", config.retry.max_retries);
                println!(
                    "  Backoff:              {} ms to {} ms, jitter {} ms",
                    config.retry.base_delay_ms, config.retry.max_delay_ms, config.retry.jitter_ms
                );
                println!("  Inter-op delay:       {} ms", config.retry.inter_op_delay_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
