//! Batch targets backed by the logbook.
//!
//! A busy or locked database is the local equivalent of a rate limit: another
//! writer holds the lock, and waiting is the right response.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::ErrorCode;
use tracing::debug;

use super::Storage;
use crate::error::{Error, Result};
use crate::flight::FlightRecord;
use crate::retry::{Applied, BatchTarget, OperationError};

fn classify(error: Error) -> OperationError {
    match &error {
        Error::DatabaseQuery(rusqlite::Error::SqliteFailure(failure, _))
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) =>
        {
            OperationError::RateLimited
        }
        _ => OperationError::Failed(error.to_string()),
    }
}

/// Inserts flights.
///
/// By default every item is inserted. With [`FlightImport::skip_logged`],
/// items whose content is already in the logbook are skipped, one stored copy
/// per item, so re-running an import adds nothing while a file holding two
/// identical sorties still logs both.
#[derive(Debug)]
pub struct FlightImport<'a> {
    storage: &'a Storage,
    logged: Option<RefCell<HashMap<String, usize>>>,
}

impl<'a> FlightImport<'a> {
    /// Import into `storage`, inserting every item.
    #[must_use]
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            logged: None,
        }
    }

    /// Import into `storage`, skipping flights it already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the logged fingerprints cannot be read.
    pub fn skip_logged(storage: &'a Storage) -> Result<Self> {
        let logged = storage.fingerprint_counts()?;
        Ok(Self {
            storage,
            logged: Some(RefCell::new(logged)),
        })
    }

    fn claim_logged_copy(&self, item: &FlightRecord) -> bool {
        let Some(logged) = &self.logged else {
            return false;
        };
        let mut logged = logged.borrow_mut();
        match logged.get_mut(&item.fingerprint()) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait(?Send)]
impl BatchTarget<FlightRecord> for FlightImport<'_> {
    fn operation(&self) -> &'static str {
        "import"
    }

    fn item_key(&self, item: &FlightRecord) -> String {
        let date = item.date.map_or_else(|| "undated".to_string(), |d| d.to_string());
        format!("{date} {}", item.effective_aircraft_type())
    }

    async fn apply(&self, item: &FlightRecord) -> std::result::Result<Applied, OperationError> {
        if self.claim_logged_copy(item) {
            debug!(key = %self.item_key(item), "already logged");
            return Ok(Applied::Skipped);
        }
        self.storage.insert(item).map_err(classify)?;
        Ok(Applied::Done)
    }
}

/// Deletes flights by id.
#[derive(Debug, Clone, Copy)]
pub struct FlightDeletion<'a> {
    storage: &'a Storage,
}

impl<'a> FlightDeletion<'a> {
    /// Delete from `storage`.
    #[must_use]
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

#[async_trait(?Send)]
impl BatchTarget<i64> for FlightDeletion<'_> {
    fn operation(&self) -> &'static str {
        "delete"
    }

    fn item_key(&self, item: &i64) -> String {
        format!("flight {item}")
    }

    async fn apply(&self, item: &i64) -> std::result::Result<Applied, OperationError> {
        if self.storage.delete(*item).map_err(classify)? {
            Ok(Applied::Done)
        } else {
            Err(OperationError::Failed(
                Error::FlightNotFound { id: *item }.to_string(),
            ))
        }
    }
}
