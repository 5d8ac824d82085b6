//! `flightlog` - A pilot logbook with currency and requirement tracking
//!
//! This library keeps a local logbook of flights and simulator sessions and
//! evaluates night-vision currency, semi-annual hour quotas and expiry dates
//! against it. The evaluation rules in [`rules`] are pure functions; storage,
//! configuration and the bulk-operation retry policy live around them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod flight;
pub mod logging;
pub mod report;
pub mod retry;
pub mod rules;
pub mod settings;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use flight::{FlightMode, FlightRecord, HourEntry, ModeFilter, PilotRole};
pub use logging::init_logging;
pub use report::{totals, LogbookTotals};
pub use retry::{run_batch, BatchReport, BatchTarget, RetryPolicy};
pub use rules::{evaluate, EvaluationReport, Snapshot};
pub use settings::{CurrencySettings, PilotProfile, SemiannualSettings};
pub use storage::{FlightDeletion, FlightImport, Storage, StorageStats};
