//! Catalog access layer
//!
//! Parameterized queries over the `artifacts` and `blobs` tables. Every
//! function takes a connection borrowed from an open transaction
//! (`Transaction` derefs to `Connection`), so callers decide the
//! transaction boundaries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::codec::CodecKind;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ArtifactId, ArtifactSummary, RecordKey, VersionRecord};

const LAST_IDENTITY_KEY: &str = "last_identity";

const RECORD_COLUMNS: &str =
    "record_key, identity, name, topic, version, type_tag, codec, comment, saved_at";

/// Fields of a version about to be inserted
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    pub identity: ArtifactId,
    pub name: &'a str,
    pub topic: &'a str,
    pub version: i64,
    pub type_tag: &'a str,
    pub codec: CodecKind,
    pub comment: &'a str,
    pub saved_at: DateTime<Utc>,
}

/// Identity owning a (topic, name) pair, if any version carries it
///
/// Returns the lowest identity should several ever share the pair.
pub fn pair_identity(conn: &Connection, topic: &str, name: &str) -> CatalogResult<Option<ArtifactId>> {
    let identity = conn.query_row(
        "SELECT MIN(identity) FROM artifacts WHERE topic = ?1 AND name = ?2",
        params![topic, name],
        |row| row.get::<_, Option<ArtifactId>>(0),
    )?;
    Ok(identity)
}

/// Number of versions stored for an identity
pub fn version_count(conn: &Connection, identity: ArtifactId) -> CatalogResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM artifacts WHERE identity = ?1",
        params![identity],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Highest version number stored for an identity
pub fn max_version(conn: &Connection, identity: ArtifactId) -> CatalogResult<Option<i64>> {
    let version = conn.query_row(
        "SELECT MAX(version) FROM artifacts WHERE identity = ?1",
        params![identity],
        |row| row.get::<_, Option<i64>>(0),
    )?;
    Ok(version)
}

/// Allocate a fresh identity and persist the new high-water mark
///
/// The high-water mark outlives deleted rows, so numbers are never handed
/// out twice even when every version of the newest identity is gone.
pub fn allocate_identity(conn: &Connection) -> CatalogResult<ArtifactId> {
    let recorded: Option<i64> = conn
        .query_row(
            "SELECT value FROM catalog_state WHERE key = ?1",
            params![LAST_IDENTITY_KEY],
            |row| row.get(0),
        )
        .optional()?;
    let in_use: Option<i64> =
        conn.query_row("SELECT MAX(identity) FROM artifacts", [], |row| row.get(0))?;

    let next = recorded.unwrap_or(0).max(in_use.unwrap_or(0)) + 1;
    conn.execute(
        "INSERT OR REPLACE INTO catalog_state (key, value) VALUES (?1, ?2)",
        params![LAST_IDENTITY_KEY, next],
    )?;
    Ok(next)
}

/// Insert a version record and its blob under one new record key
pub fn insert_version(
    conn: &Connection,
    version: &NewVersion<'_>,
    payload: &[u8],
) -> CatalogResult<RecordKey> {
    conn.execute(
        "INSERT INTO artifacts (identity, name, topic, version, type_tag, codec, comment, saved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            version.identity,
            version.name,
            version.topic,
            version.version,
            version.type_tag,
            version.codec,
            version.comment,
            version.saved_at.timestamp_millis(),
        ],
    )?;
    let record_key = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO blobs (record_key, payload) VALUES (?1, ?2)",
        params![record_key, payload],
    )?;

    Ok(record_key)
}

/// Delete a version record together with its blob
///
/// Returns false when the key is absent from both tables.
pub fn delete_version(conn: &Connection, record_key: RecordKey) -> CatalogResult<bool> {
    let records = conn.execute(
        "DELETE FROM artifacts WHERE record_key = ?1",
        params![record_key],
    )?;
    let blobs = conn.execute("DELETE FROM blobs WHERE record_key = ?1", params![record_key])?;

    match (records, blobs) {
        (0, 0) => Ok(false),
        (1, 1) => Ok(true),
        (0, _) => Err(CatalogError::Inconsistent {
            record_key,
            missing: "artifacts",
        }),
        _ => Err(CatalogError::Inconsistent {
            record_key,
            missing: "blobs",
        }),
    }
}

/// Payload bytes for a record key
pub fn fetch_payload(conn: &Connection, record_key: RecordKey) -> CatalogResult<Option<Vec<u8>>> {
    let payload = conn
        .query_row(
            "SELECT payload FROM blobs WHERE record_key = ?1",
            params![record_key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(payload)
}

/// A single version record by key
pub fn get_record(conn: &Connection, record_key: RecordKey) -> CatalogResult<Option<VersionRecord>> {
    let sql = format!("SELECT {} FROM artifacts WHERE record_key = ?1", RECORD_COLUMNS);
    let record = conn
        .query_row(&sql, params![record_key], record_from_row)
        .optional()?;
    Ok(record)
}

/// Rewrite name and/or topic on every version of an identity
///
/// Returns the number of rows changed.
pub fn update_identity_meta(
    conn: &Connection,
    identity: ArtifactId,
    name: Option<&str>,
    topic: Option<&str>,
) -> CatalogResult<usize> {
    let changed = conn.execute(
        "UPDATE artifacts
         SET name = COALESCE(?2, name), topic = COALESCE(?3, topic)
         WHERE identity = ?1",
        params![identity, name, topic],
    )?;
    Ok(changed)
}

/// All versions of an identity, oldest version first
pub fn versions(conn: &Connection, identity: ArtifactId) -> CatalogResult<Vec<VersionRecord>> {
    let sql = format!(
        "SELECT {} FROM artifacts WHERE identity = ?1 ORDER BY version",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![identity], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// One summary line per identity, ordered by identity
pub fn summaries(conn: &Connection) -> CatalogResult<Vec<ArtifactSummary>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT a.identity, a.name, a.topic, a.type_tag, s.version_count, s.latest, a.saved_at
        FROM artifacts a
        JOIN (
            SELECT identity, COUNT(*) AS version_count, MAX(version) AS latest
            FROM artifacts
            GROUP BY identity
        ) s ON a.identity = s.identity AND a.version = s.latest
        ORDER BY a.identity
        "#,
    )?;

    let summaries = stmt
        .query_map([], |row| {
            Ok(ArtifactSummary {
                identity: row.get(0)?,
                name: row.get(1)?,
                topic: row.get(2)?,
                type_tag: row.get(3)?,
                version_count: row.get(4)?,
                latest_version: row.get(5)?,
                last_saved: timestamp(row.get(6)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

/// Distinct identities carrying a name, lowest first
pub fn identities_by_name(conn: &Connection, name: &str) -> CatalogResult<Vec<ArtifactId>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT identity FROM artifacts WHERE name = ?1 ORDER BY identity")?;
    let identities = stmt
        .query_map(params![name], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(identities)
}

/// Row counts of (artifacts, blobs)
pub fn row_counts(conn: &Connection) -> CatalogResult<(i64, i64)> {
    let records = conn.query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))?;
    let blobs = conn.query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get(0))?;
    Ok((records, blobs))
}

/// Delete every version and blob; returns the number of versions removed
pub fn clear(conn: &Connection) -> CatalogResult<usize> {
    let removed = conn.execute("DELETE FROM artifacts", [])?;
    conn.execute("DELETE FROM blobs", [])?;
    Ok(removed)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    Ok(VersionRecord {
        record_key: row.get(0)?,
        identity: row.get(1)?,
        name: row.get(2)?,
        topic: row.get(3)?,
        version: row.get(4)?,
        type_tag: row.get(5)?,
        codec: row.get(6)?,
        comment: row.get(7)?,
        saved_at: timestamp(row.get(8)?),
    })
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}
