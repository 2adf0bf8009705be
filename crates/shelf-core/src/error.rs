//! Catalog error handling
//!
//! Typed errors for catalog operations with descriptive messages and
//! recovery suggestions. Lookups that miss are not errors; see
//! [`NotFound`] and [`Lookup`].

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Input rejected before touching the store
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The backing storage location has not been provisioned
    #[error("Storage location '{path}' does not exist. Create it before opening the catalog.")]
    StorageLocation { path: PathBuf },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record key is present in only one of the two tables
    #[error("Catalog is inconsistent: record {record_key} has no matching {missing} row")]
    Inconsistent {
        record_key: i64,
        missing: &'static str,
    },

    /// Payload could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CatalogError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CatalogError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Check if the write lock was held by another writer for longer
    /// than the configured busy timeout
    pub fn is_busy(&self) -> bool {
        match self {
            CatalogError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CatalogError::StorageLocation { .. } => {
                Some("Check the data_dir setting, or run with a config that points at an existing directory.")
            }
            CatalogError::Database(_) if self.is_busy() => {
                Some("Another writer held the catalog lock. Retry, or raise busy_timeout_ms.")
            }
            CatalogError::Validation { .. } => Some("Fix the input and try again."),
            _ => None,
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A lookup that did not match anything in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// No version record carries this identity
    Identity(i64),
    /// The identity exists but not at this version
    Version { identity: i64, version: i64 },
    /// No version record carries this name
    Name(String),
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFound::Identity(id) => write!(f, "artifact {} not found", id),
            NotFound::Version { identity, version } => {
                write!(f, "version {} of artifact {} not found", version, identity)
            }
            NotFound::Name(name) => write!(f, "no artifact named '{}'", name),
        }
    }
}

/// Outcome of an operation that can miss without failing
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Missing(NotFound),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Convert into an `Option`, discarding the diagnostic
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing(_) => None,
        }
    }

    /// The diagnostic, when the lookup missed
    pub fn missing(&self) -> Option<&NotFound> {
        match self {
            Lookup::Found(_) => None,
            Lookup::Missing(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Missing(reason) => Lookup::Missing(reason),
        }
    }
}
