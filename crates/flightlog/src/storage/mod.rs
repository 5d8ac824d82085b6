//! Storage layer for flightlog.
//!
//! `SQLite`-backed persistence for flight records and the pilot's settings.
//! Every insert is kept, identical sorties included; each row carries its
//! content fingerprint so imports can recognise flights already logged.
//! Settings are stored as one JSON document per kind.

pub mod batch;
pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flight::{FlightRecord, HourEntry, PilotRole};
use crate::settings::{CurrencySettings, PilotProfile, SemiannualSettings};

pub use batch::{FlightDeletion, FlightImport};

/// Date format used in the `date` column; sorts lexically.
const DATE_FORMAT: &str = "%Y-%m-%d";

const CURRENCY_KEY: &str = "currency";
const SEMIANNUAL_KEY: &str = "semiannual";
const PROFILE_KEY: &str = "profile";

const FLIGHT_COLUMNS: &str = "id, date, is_simulator, aircraft_type, custom_aircraft_type, \
     pilot_role, hour_breakdown, total_flight_hours, remarks";

/// Logbook database.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

/// Summary of the logbook contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of records.
    pub total_flights: i64,
    /// Records flagged as simulator sessions.
    pub simulator_sessions: i64,
    /// Records without a usable date.
    pub undated_flights: i64,
    /// Earliest flight date.
    pub earliest_flight: Option<NaiveDate>,
    /// Latest flight date.
    pub latest_flight: Option<NaiveDate>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl Storage {
    /// Open or create a logbook at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening logbook at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Logbook opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory logbook for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a flight and return its assigned id.
    ///
    /// The record's own `id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, flight: &FlightRecord) -> Result<i64> {
        let fingerprint = flight.fingerprint();
        let breakdown = serde_json::to_string(&flight.hour_breakdown)?;
        self.conn.execute(
            r"
            INSERT INTO flights (date, is_simulator, aircraft_type, custom_aircraft_type,
                                 pilot_role, hour_breakdown, total_flight_hours, remarks, fingerprint)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                format_date(flight.date),
                flight.is_simulator,
                flight.aircraft_type,
                flight.custom_aircraft_type,
                flight.pilot_role.map(PilotRole::code),
                breakdown,
                flight.total_flight_hours,
                flight.remarks,
                fingerprint,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted flight with id {}", id);
        Ok(id)
    }

    /// Number of logged flights per content fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn fingerprint_counts(&self) -> Result<HashMap<String, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT fingerprint, COUNT(*) FROM flights GROUP BY fingerprint")?;
        let counts = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get(0)?, usize::try_from(count).unwrap_or(0)))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }

    /// Get a flight by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<FlightRecord>> {
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = ?1");
        let flight = self
            .conn
            .query_row(&sql, [id], Self::row_to_flight)
            .optional()?;
        Ok(flight)
    }

    /// Get a flight by id, failing when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] for an unknown id, or a database error.
    pub fn require(&self, id: i64) -> Result<FlightRecord> {
        self.get(id)?.ok_or(Error::FlightNotFound { id })
    }

    /// Every flight, newest first. Undated flights sort last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all(&self) -> Result<Vec<FlightRecord>> {
        self.list_between(None, None, None)
    }

    /// Flights dated within `since..=until`, newest first.
    ///
    /// Either bound may be open. When any bound is set, undated flights are
    /// excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_between(
        &self,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> Result<Vec<FlightRecord>> {
        let bounded = since.is_some() || until.is_some();
        let sql = format!(
            r"
            SELECT {FLIGHT_COLUMNS} FROM flights
            WHERE (?1 = 0 OR date IS NOT NULL)
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
            ORDER BY date IS NULL, date DESC, id DESC
            LIMIT ?4
            "
        );

        let limit_i64 = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(&sql)?;
        let flights = stmt
            .query_map(
                params![bounded, format_date(since), format_date(until), limit_i64],
                Self::row_to_flight,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(flights)
    }

    /// Replace the stored flight with `flight.id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the record has no id,
    /// [`Error::FlightNotFound`] for an unknown id, or a database error.
    pub fn update(&self, flight: &FlightRecord) -> Result<()> {
        let id = flight
            .id
            .ok_or_else(|| Error::invalid_input("cannot update a flight without an id"))?;
        let fingerprint = flight.fingerprint();
        let breakdown = serde_json::to_string(&flight.hour_breakdown)?;
        let affected = self.conn.execute(
            r"
            UPDATE flights SET date = ?1, is_simulator = ?2, aircraft_type = ?3,
                custom_aircraft_type = ?4, pilot_role = ?5, hour_breakdown = ?6,
                total_flight_hours = ?7, remarks = ?8, fingerprint = ?9
            WHERE id = ?10
            ",
            params![
                format_date(flight.date),
                flight.is_simulator,
                flight.aircraft_type,
                flight.custom_aircraft_type,
                flight.pilot_role.map(PilotRole::code),
                breakdown,
                flight.total_flight_hours,
                flight.remarks,
                fingerprint,
                id,
            ],
        )?;

        if affected == 0 {
            return Err(Error::FlightNotFound { id });
        }
        debug!("Updated flight {}", id);
        Ok(())
    }

    /// Delete a flight by id.
    ///
    /// Returns `true` if a flight was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM flights WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Count logged flights.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get logbook statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_flights, simulator_sessions, undated_flights, earliest, latest): (
            i64,
            i64,
            i64,
            Option<String>,
            Option<String>,
        ) = self.conn.query_row(
            r"
            SELECT COUNT(*),
                   COALESCE(SUM(is_simulator), 0),
                   COALESCE(SUM(date IS NULL), 0),
                   MIN(date),
                   MAX(date)
            FROM flights
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_flights,
            simulator_sessions,
            undated_flights,
            earliest_flight: parse_date(earliest),
            latest_flight: parse_date(latest),
            db_size_bytes,
        })
    }

    /// Stored currency settings, or `fallback` when none are saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored
    /// document cannot be decoded.
    pub fn load_currency_settings(&self, fallback: CurrencySettings) -> Result<CurrencySettings> {
        Ok(self.load_setting(CURRENCY_KEY)?.unwrap_or(fallback))
    }

    /// Save currency settings after validating them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a zero window or a negative or
    /// non-finite threshold, or a database error.
    pub fn save_currency_settings(&self, settings: &CurrencySettings) -> Result<()> {
        settings.validate()?;
        self.save_setting(CURRENCY_KEY, settings)
    }

    /// Stored semi-annual settings, or empty settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored
    /// document cannot be decoded.
    pub fn load_semiannual_settings(&self) -> Result<SemiannualSettings> {
        Ok(self.load_setting(SEMIANNUAL_KEY)?.unwrap_or_default())
    }

    /// Save semi-annual settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_semiannual_settings(&self, settings: &SemiannualSettings) -> Result<()> {
        self.save_setting(SEMIANNUAL_KEY, settings)
    }

    /// Stored pilot profile, or `fallback` when none is saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored
    /// document cannot be decoded.
    pub fn load_profile(&self, fallback: PilotProfile) -> Result<PilotProfile> {
        Ok(self.load_setting(PROFILE_KEY)?.unwrap_or(fallback))
    }

    /// Save the pilot profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_profile(&self, profile: &PilotProfile) -> Result<()> {
        self.save_setting(PROFILE_KEY, profile)
    }

    fn load_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        value
            .map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    fn save_setting<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn.execute(
            r"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
            ",
            params![key, json],
        )?;
        debug!(key, "saved settings");
        Ok(())
    }

    fn row_to_flight(row: &rusqlite::Row) -> rusqlite::Result<FlightRecord> {
        let date: Option<String> = row.get(1)?;
        let pilot_role: Option<String> = row.get(5)?;
        let breakdown_json: String = row.get(6)?;
        let hour_breakdown: Vec<HourEntry> = serde_json::from_str(&breakdown_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

        Ok(FlightRecord {
            id: Some(row.get(0)?),
            date: parse_date(date),
            is_simulator: row.get(2)?,
            aircraft_type: row.get(3)?,
            custom_aircraft_type: row.get(4)?,
            pilot_role: pilot_role.and_then(|r| r.parse().ok()),
            hour_breakdown,
            total_flight_hours: row.get(7)?,
            remarks: row.get(8)?,
        })
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}
