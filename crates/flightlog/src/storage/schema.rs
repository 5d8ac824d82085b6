//! `SQLite` schema definitions for flightlog.

/// SQL statement to create the flights table.
///
/// `date` is nullable: imported records with an unreadable date are kept but
/// never count toward a requirement. `hour_breakdown` holds a JSON array.
/// `fingerprint` is not unique: identical sorties flown the same day are
/// separate rows.
pub const CREATE_FLIGHTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT,
    is_simulator INTEGER NOT NULL DEFAULT 0,
    aircraft_type TEXT NOT NULL,
    custom_aircraft_type TEXT,
    pilot_role TEXT,
    hour_breakdown TEXT NOT NULL,
    total_flight_hours REAL NOT NULL,
    remarks TEXT,
    fingerprint TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on date for range queries.
pub const CREATE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_date ON flights(date DESC)
";

/// SQL statement to create the settings table.
///
/// One row per settings document, stored as JSON.
pub const CREATE_SETTINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Base schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FLIGHTS_TABLE,
    CREATE_DATE_INDEX,
    CREATE_SETTINGS_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_flights_table_contains_required_columns() {
        assert!(CREATE_FLIGHTS_TABLE.contains("id INTEGER PRIMARY KEY"));
        assert!(CREATE_FLIGHTS_TABLE.contains("aircraft_type TEXT NOT NULL"));
        assert!(CREATE_FLIGHTS_TABLE.contains("hour_breakdown TEXT NOT NULL"));
        assert!(CREATE_FLIGHTS_TABLE.contains("fingerprint TEXT NOT NULL"));
        assert!(!CREATE_FLIGHTS_TABLE.contains("date TEXT NOT NULL"));
    }

    #[test]
    fn test_schema_has_no_unique_constraint_on_content() {
        for statement in SCHEMA_STATEMENTS {
            assert!(!statement.contains("UNIQUE"));
        }
    }
}
