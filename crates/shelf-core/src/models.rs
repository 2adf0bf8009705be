//! Data models for the catalog
//!
//! `VersionRecord` mirrors one row of the `artifacts` table. The summary and
//! outcome types are what the manager hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::CodecKind;

/// Stable integer key for a (topic, name) artifact across its versions
pub type ArtifactId = i64;

/// Key shared 1:1 between a version record and its blob
pub type RecordKey = i64;

/// Metadata for one saved version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionRecord {
    pub record_key: RecordKey,
    pub identity: ArtifactId,
    pub name: String,
    pub topic: String,
    /// Positive, dense and unique within the identity
    pub version: i64,
    /// Payload type descriptor (display only)
    pub type_tag: String,
    /// Codec the payload was encoded with
    pub codec: CodecKind,
    pub comment: String,
    pub saved_at: DateTime<Utc>,
}

/// One line of a catalog listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactSummary {
    pub identity: ArtifactId,
    pub name: String,
    pub topic: String,
    /// Type tag of the latest version
    pub type_tag: String,
    pub version_count: i64,
    pub latest_version: i64,
    pub last_saved: DateTime<Utc>,
}

/// Everything needed to write one version, apart from the payload
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub topic: String,
    pub name: String,
    pub comment: String,
    /// Version to replace instead of appending
    pub replace: Option<crate::Selector>,
    /// Overrides the codec-supplied type tag
    pub type_tag: Option<String>,
}

impl SaveRequest {
    pub fn new(topic: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn replace(mut self, selector: crate::Selector) -> Self {
        self.replace = Some(selector);
        self
    }

    pub fn type_tag(mut self, tag: impl Into<String>) -> Self {
        self.type_tag = Some(tag.into());
        self
    }
}

/// Result of a save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// The inserted version
    pub record: VersionRecord,
    /// Version number removed by the replace selector, if any
    pub replaced: Option<i64>,
    /// Set when a replace selector was given but matched nothing
    pub replace_missed: Option<crate::NotFound>,
    /// True when the save allocated a new identity
    pub created: bool,
}
