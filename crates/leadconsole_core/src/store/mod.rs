//! Reference lead store backed by SQLite.
//!
//! # Responsibility
//! - Implement the query and mutation boundaries over the local schema so
//!   hosts, the smoke CLI and tests have a real collaborator.
//! - Map persistence failures onto `TransportError` at the boundary.
//!
//! # Invariants
//! - Facets are AND-ed across dimensions and OR-ed within one; an empty
//!   facet set places no constraint.
//! - Free text never reaches FTS5 as raw syntax; every term is quoted.
//! - Result order is the requested sort followed by `uuid ASC`.

use crate::db::DbError;
use crate::model::lead::LeadId;
use crate::query::TransportError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteLeadStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(LeadId),
    /// Write rejected before touching SQL.
    Validation(String),
    /// Persisted row cannot be decoded into the lead model.
    InvalidData(String),
}

impl StoreError {
    /// Converts into a boundary error for `operation`.
    ///
    /// Busy/locked SQLite failures are reported as retryable.
    pub fn into_transport(self, operation: &'static str) -> TransportError {
        let retryable = matches!(
            &self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)))
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        );
        if retryable {
            TransportError::retryable(operation, self.to_string())
        } else {
            TransportError::new(operation, self.to_string())
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "lead not found: {id}"),
            Self::Validation(message) => write!(f, "invalid lead: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted lead data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Validation(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
