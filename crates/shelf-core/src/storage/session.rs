//! Short-lived catalog sessions
//!
//! Every public catalog operation opens its own [`Session`], runs inside one
//! transaction and drops the connection on return. Dropping a
//! `rusqlite::Transaction` without committing rolls it back, so an error or
//! a panic inside the closure leaves the store untouched.
//!
//! Writes start with `BEGIN IMMEDIATE`, which takes SQLite's reserved lock
//! up front. That lock is exclusive among writers for the whole store, so the
//! read-then-insert sequence of a save never interleaves with another save,
//! whether the other writer is a thread or a separate process. A writer that
//! finds the lock taken waits up to `busy_timeout` before failing with a
//! busy error.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::storage::schema::{init_schema, needs_init};

/// One open connection to the catalog database
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Open a session on the catalog at `path`
    ///
    /// The directory containing `path` must already exist. The database
    /// file and schema are created on first use.
    pub fn open(path: &Path, busy_timeout: Duration) -> CatalogResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(CatalogError::StorageLocation {
                    path: parent.to_path_buf(),
                });
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;

        let mut session = Self { conn };
        if needs_init(&session.conn) {
            session.write(|tx| {
                debug!("initializing catalog schema at {:?}", path);
                init_schema(tx).map_err(Into::into)
            })?;
        }

        Ok(session)
    }

    /// Run `f` inside a write transaction holding the catalog write lock
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise.
    pub fn write<T, F>(&mut self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CatalogResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` against a consistent read snapshot
    pub fn read<T, F>(&mut self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CatalogResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.finish()?;
        Ok(value)
    }
}
