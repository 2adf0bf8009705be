//! SQLite schema for the catalog
//!
//! Two tables share one record key: `artifacts` holds the per-version
//! metadata and `blobs` holds the payload bytes. `catalog_state` keeps the
//! identity high-water mark so identities survive deletion of every row.

use rusqlite::{Connection, OptionalExtension, Result};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per saved version
        CREATE TABLE IF NOT EXISTS artifacts (
            record_key INTEGER PRIMARY KEY AUTOINCREMENT,
            identity INTEGER NOT NULL,
            name TEXT NOT NULL,
            topic TEXT NOT NULL,
            version INTEGER NOT NULL CHECK (version > 0),
            type_tag TEXT NOT NULL,
            codec TEXT NOT NULL,
            comment TEXT NOT NULL,
            saved_at INTEGER NOT NULL
        );

        -- Payload bytes, keyed like artifacts
        CREATE TABLE IF NOT EXISTS blobs (
            record_key INTEGER PRIMARY KEY AUTOINCREMENT,
            payload BLOB NOT NULL
        );

        -- Store-level counters
        CREATE TABLE IF NOT EXISTS catalog_state (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );

        -- Existence check on save
        CREATE INDEX IF NOT EXISTS idx_artifacts_pair ON artifacts(topic, name);

        -- Lookup by name alone
        CREATE INDEX IF NOT EXISTS idx_artifacts_name ON artifacts(name);

        -- Version numbers are unique within an identity
        CREATE UNIQUE INDEX IF NOT EXISTS idx_artifacts_identity_version
            ON artifacts(identity, version);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.and_then(|v| v.parse().ok()))
}

/// Check if schema needs initialization
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
