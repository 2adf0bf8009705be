//! Version selectors
//!
//! A selector picks one version record out of an identity's set:
//! `latest` (highest version number), `first` (lowest) or an explicit
//! version number. Because replacement is delete-then-append, version
//! numbers stay dense and latest/first are plain max/min lookups.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CatalogError, CatalogResult, Lookup, NotFound};
use crate::models::{ArtifactId, RecordKey};
use crate::storage::catalog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selector {
    #[default]
    Latest,
    First,
    Version(i64),
}

/// The record a selector resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub record_key: RecordKey,
    pub version: i64,
}

impl Selector {
    /// Resolve against the versions currently stored for `identity`
    pub fn resolve(&self, conn: &Connection, identity: ArtifactId) -> CatalogResult<Lookup<Resolved>> {
        let sql = match self {
            Selector::Latest => {
                "SELECT record_key, version FROM artifacts WHERE identity = ?1
                 ORDER BY version DESC LIMIT 1"
            }
            Selector::First => {
                "SELECT record_key, version FROM artifacts WHERE identity = ?1
                 ORDER BY version ASC LIMIT 1"
            }
            Selector::Version(version) => {
                if catalog::version_count(conn, identity)? == 0 {
                    return Ok(Lookup::Missing(NotFound::Identity(identity)));
                }
                let found = conn
                    .query_row(
                        "SELECT record_key FROM artifacts WHERE identity = ?1 AND version = ?2",
                        params![identity, version],
                        |row| row.get(0),
                    )
                    .optional()?;
                return Ok(match found {
                    Some(record_key) => Lookup::Found(Resolved {
                        record_key,
                        version: *version,
                    }),
                    None => Lookup::Missing(NotFound::Version {
                        identity,
                        version: *version,
                    }),
                });
            }
        };

        let found = conn
            .query_row(sql, params![identity], |row| {
                Ok(Resolved {
                    record_key: row.get(0)?,
                    version: row.get(1)?,
                })
            })
            .optional()?;

        Ok(match found {
            Some(resolved) => Lookup::Found(resolved),
            None => Lookup::Missing(NotFound::Identity(identity)),
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Latest => write!(f, "latest"),
            Selector::First => write!(f, "first"),
            Selector::Version(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Selector {
    fn from(version: i64) -> Self {
        Selector::Version(version)
    }
}

impl FromStr for Selector {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Selector::Latest);
        }
        if s.eq_ignore_ascii_case("first") {
            return Ok(Selector::First);
        }
        match s.parse::<i64>() {
            Ok(v) if v > 0 => Ok(Selector::Version(v)),
            _ => Err(CatalogError::validation(
                "version",
                format!("'{}' is not latest, first or a positive version number", s),
            )),
        }
    }
}
