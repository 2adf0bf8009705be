//! Version manager
//!
//! Decides identity assignment and version numbering on save, resolves
//! selectors on load and delete, and keeps `artifacts` and `blobs` in step
//! by touching both only inside one transaction.
//!
//! ## Save
//!
//! Under the catalog write lock:
//! 1. Look up the identity owning the (topic, name) pair.
//! 2. No identity: allocate `high-water + 1`, insert version 1.
//! 3. Identity found, no replace selector: insert `max version + 1`.
//! 4. Identity found with a single version and a replace selector: that
//!    version is the target whatever the selector says. Delete it, insert
//!    version 1.
//! 5. Identity found with several versions and a replace selector: resolve
//!    and delete the target first, then insert `max remaining + 1`. A
//!    selector that matches nothing is reported and the save appends.
//!
//! An identity whose last version was deleted no longer exists. Saving
//! under its old pair again allocates a new identity; numbers are never
//! reused.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::CodecKind;
use crate::config::Config;
use crate::error::{CatalogError, CatalogResult, Lookup, NotFound};
use crate::models::{ArtifactId, ArtifactSummary, SaveOutcome, SaveRequest, VersionRecord};
use crate::selector::Selector;
use crate::storage::catalog::{self, NewVersion};
use crate::storage::Session;

/// Character sequence rejected in names, topics and comments
pub const FORBIDDEN_SEQUENCE: &str = "''";

/// A stored payload together with the version it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPayload {
    pub record: VersionRecord,
    pub bytes: Vec<u8>,
}

/// Entry point for all catalog reads and writes
///
/// Holds no connection. Each operation opens a [`Session`], so one manager
/// can be cloned freely across threads.
#[derive(Debug, Clone)]
pub struct VersionManager {
    path: PathBuf,
    busy_timeout: Duration,
}

impl VersionManager {
    /// Open the catalog at `path`, creating the schema if needed
    ///
    /// Fails with [`CatalogError::StorageLocation`] when the containing
    /// directory does not exist.
    pub fn open(path: impl Into<PathBuf>, busy_timeout: Duration) -> CatalogResult<Self> {
        let path = path.into();
        Session::open(&path, busy_timeout)?;
        debug!("opened catalog at {:?}", path);
        Ok(Self { path, busy_timeout })
    }

    /// Open the catalog described by a configuration
    pub fn from_config(config: &Config) -> CatalogResult<Self> {
        Self::open(
            config.catalog_path(),
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    /// Path of the catalog database
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn session(&self) -> CatalogResult<Session> {
        Session::open(&self.path, self.busy_timeout)
    }

    // ==================== Writes ====================

    /// Save a payload as a new version, or as a replacement
    ///
    /// `codec` names the encoding of `payload` and is stored with the version.
    pub fn save(
        &self,
        payload: &[u8],
        codec: CodecKind,
        type_tag: &str,
        request: &SaveRequest,
    ) -> CatalogResult<SaveOutcome> {
        validate_text("name", &request.name)?;
        validate_text("topic", &request.topic)?;
        validate_text("comment", &request.comment)?;
        if request.name.is_empty() && request.comment.is_empty() {
            return Err(CatalogError::validation(
                "name",
                "name and comment cannot both be empty",
            ));
        }

        let name = if request.name.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            request.name.clone()
        };
        let topic = request.topic.as_str();

        let outcome = self.session()?.write(|tx| {
            let mut replaced = None;
            let mut replace_missed = None;

            let (identity, created) = match catalog::pair_identity(tx, topic, &name)? {
                None => {
                    let identity = catalog::allocate_identity(tx)?;
                    debug!(identity, topic, name = %name, "new pair, allocated identity");
                    (identity, true)
                }
                Some(identity) => {
                    if let Some(selector) = request.replace {
                        // A lone version is the target whatever the selector says
                        let target = if catalog::version_count(tx, identity)? == 1 {
                            Selector::Latest
                        } else {
                            selector
                        };
                        match target.resolve(tx, identity)? {
                            Lookup::Found(resolved) => {
                                catalog::delete_version(tx, resolved.record_key)?;
                                debug!(identity, version = resolved.version, "replacing version");
                                replaced = Some(resolved.version);
                            }
                            Lookup::Missing(reason) => {
                                warn!("replace target {} not found: {}; appending", selector, reason);
                                replace_missed = Some(reason);
                            }
                        }
                    }
                    (identity, false)
                }
            };

            let version = catalog::max_version(tx, identity)?.unwrap_or(0) + 1;
            let new_version = NewVersion {
                identity,
                name: &name,
                topic,
                version,
                type_tag,
                codec,
                comment: &request.comment,
                saved_at: Utc::now(),
            };
            let record_key = catalog::insert_version(tx, &new_version, payload)?;

            Ok(SaveOutcome {
                record: VersionRecord {
                    record_key,
                    identity,
                    name: name.clone(),
                    topic: topic.to_string(),
                    version,
                    type_tag: type_tag.to_string(),
                    codec,
                    comment: request.comment.clone(),
                    saved_at: new_version.saved_at,
                },
                replaced,
                replace_missed,
                created,
            })
        })?;

        info!(
            identity = outcome.record.identity,
            version = outcome.record.version,
            "saved {}/{}",
            outcome.record.topic,
            outcome.record.name
        );
        Ok(outcome)
    }

    /// Delete the version a selector resolves to, blob included
    ///
    /// An unknown identity or version is reported and nothing changes.
    pub fn delete_by_id(
        &self,
        identity: ArtifactId,
        selector: Selector,
    ) -> CatalogResult<Lookup<VersionRecord>> {
        let result = self.session()?.write(|tx| {
            let resolved = match selector.resolve(tx, identity)? {
                Lookup::Found(resolved) => resolved,
                Lookup::Missing(reason) => return Ok(Lookup::Missing(reason)),
            };
            let record = catalog::get_record(tx, resolved.record_key)?.ok_or(
                CatalogError::Inconsistent {
                    record_key: resolved.record_key,
                    missing: "artifacts",
                },
            )?;
            catalog::delete_version(tx, resolved.record_key)?;
            Ok(Lookup::Found(record))
        })?;

        match &result {
            Lookup::Found(record) => {
                info!(identity, version = record.version, "deleted version")
            }
            Lookup::Missing(reason) => warn!("delete skipped: {}", reason),
        }
        Ok(result)
    }

    /// Change name and/or topic on every version of an identity
    ///
    /// Returns the number of version rows updated. Moving an identity onto
    /// a pair owned by another identity is rejected.
    pub fn update_meta(
        &self,
        identity: ArtifactId,
        name: Option<&str>,
        topic: Option<&str>,
    ) -> CatalogResult<Lookup<usize>> {
        if let Some(name) = name {
            validate_text("name", name)?;
            if name.is_empty() {
                return Err(CatalogError::validation("name", "cannot be empty"));
            }
        }
        if let Some(topic) = topic {
            validate_text("topic", topic)?;
        }

        let result = self.session()?.write(|tx| {
            let current = match catalog::versions(tx, identity)?.into_iter().next() {
                Some(record) => record,
                None => return Ok(Lookup::Missing(NotFound::Identity(identity))),
            };

            let new_name = name.unwrap_or(&current.name);
            let new_topic = topic.unwrap_or(&current.topic);
            if let Some(owner) = catalog::pair_identity(tx, new_topic, new_name)? {
                if owner != identity {
                    return Err(CatalogError::validation(
                        "name",
                        format!(
                            "topic '{}' / name '{}' already belongs to artifact {}",
                            new_topic, new_name, owner
                        ),
                    ));
                }
            }

            let changed = catalog::update_identity_meta(tx, identity, name, topic)?;
            Ok(Lookup::Found(changed))
        })?;

        match &result {
            Lookup::Found(changed) => info!(identity, rows = changed, "updated metadata"),
            Lookup::Missing(reason) => warn!("update skipped: {}", reason),
        }
        Ok(result)
    }

    /// Delete every version and payload
    ///
    /// The identity high-water mark survives, so later saves still get
    /// numbers above anything handed out before.
    pub fn clear(&self) -> CatalogResult<usize> {
        let removed = self.session()?.write(|tx| catalog::clear(tx))?;
        info!(removed, "cleared catalog");
        Ok(removed)
    }

    // ==================== Reads ====================

    /// Fetch the payload a selector resolves to
    pub fn load(
        &self,
        identity: ArtifactId,
        selector: Selector,
    ) -> CatalogResult<Lookup<StoredPayload>> {
        let result = self.session()?.read(|tx| {
            let resolved = match selector.resolve(tx, identity)? {
                Lookup::Found(resolved) => resolved,
                Lookup::Missing(reason) => return Ok(Lookup::Missing(reason)),
            };
            let missing = |table| CatalogError::Inconsistent {
                record_key: resolved.record_key,
                missing: table,
            };
            let record =
                catalog::get_record(tx, resolved.record_key)?.ok_or_else(|| missing("artifacts"))?;
            let bytes =
                catalog::fetch_payload(tx, resolved.record_key)?.ok_or_else(|| missing("blobs"))?;
            Ok(Lookup::Found(StoredPayload { record, bytes }))
        })?;

        if let Lookup::Missing(reason) = &result {
            warn!("load failed: {}", reason);
        }
        Ok(result)
    }

    /// Identity of the artifact carrying `name`
    ///
    /// When several identities share the name under different topics the
    /// earliest one wins and a warning is logged.
    pub fn find_by_name(&self, name: &str) -> CatalogResult<Lookup<ArtifactId>> {
        let identities = self
            .session()?
            .read(|tx| catalog::identities_by_name(tx, name))?;

        match identities.as_slice() {
            [] => {
                let reason = NotFound::Name(name.to_string());
                warn!("lookup failed: {}", reason);
                Ok(Lookup::Missing(reason))
            }
            [only] => Ok(Lookup::Found(*only)),
            [first, ..] => {
                warn!(
                    "{} artifacts named '{}', using artifact {}",
                    identities.len(),
                    name,
                    first
                );
                Ok(Lookup::Found(*first))
            }
        }
    }

    /// Load by name instead of identity
    pub fn load_by_name(
        &self,
        name: &str,
        selector: Selector,
    ) -> CatalogResult<Lookup<StoredPayload>> {
        match self.find_by_name(name)? {
            Lookup::Found(identity) => self.load(identity, selector),
            Lookup::Missing(reason) => Ok(Lookup::Missing(reason)),
        }
    }

    /// One summary per identity
    pub fn list(&self) -> CatalogResult<Vec<ArtifactSummary>> {
        self.session()?.read(|tx| catalog::summaries(tx))
    }

    /// Every version of one identity, oldest first
    pub fn versions(&self, identity: ArtifactId) -> CatalogResult<Lookup<Vec<VersionRecord>>> {
        let records = self
            .session()?
            .read(|tx| catalog::versions(tx, identity))?;
        if records.is_empty() {
            let reason = NotFound::Identity(identity);
            warn!("lookup failed: {}", reason);
            return Ok(Lookup::Missing(reason));
        }
        Ok(Lookup::Found(records))
    }
}

fn validate_text(field: &'static str, value: &str) -> CatalogResult<()> {
    if value.contains(FORBIDDEN_SEQUENCE) {
        return Err(CatalogError::validation(
            field,
            format!("must not contain {}", FORBIDDEN_SEQUENCE),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> VersionManager {
        VersionManager::open(temp_dir.path().join("catalog.db"), Duration::from_secs(10)).unwrap()
    }

    fn save(m: &VersionManager, payload: &[u8], topic: &str, name: &str) -> SaveOutcome {
        let request = SaveRequest::new(topic, name).comment("c");
        m.save(payload, CodecKind::Cbor, "bytes", &request).unwrap()
    }

    fn load_bytes(m: &VersionManager, identity: ArtifactId, selector: Selector) -> Vec<u8> {
        m.load(identity, selector).unwrap().found().unwrap().bytes
    }

    fn version_numbers(m: &VersionManager, identity: ArtifactId) -> Vec<i64> {
        m.versions(identity)
            .unwrap()
            .found()
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect()
    }

    fn assert_in_sync(m: &VersionManager) {
        let (records, blobs) = m
            .session()
            .unwrap()
            .read(|tx| catalog::row_counts(tx))
            .unwrap();
        assert_eq!(records, blobs);
    }

    #[test]
    fn test_open_requires_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = VersionManager::open(
            temp_dir.path().join("nope").join("catalog.db"),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(CatalogError::StorageLocation { .. })));
    }

    #[test]
    fn test_first_save_allocates_identity() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        let outcome = save(&m, b"[1,2,3]", "t", "a");
        assert_eq!(outcome.record.identity, 1);
        assert_eq!(outcome.record.version, 1);
        assert!(outcome.created);
        assert_eq!(outcome.replaced, None);
    }

    #[test]
    fn test_replace_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        let first = save(&m, b"[1,2,3]", "t", "a");
        assert_eq!((first.record.identity, first.record.version), (1, 1));

        let second = save(&m, b"99", "t", "a");
        assert_eq!((second.record.identity, second.record.version), (1, 2));
        assert!(!second.created);

        let replaced = m
            .save(
                b"7",
                CodecKind::Cbor,
                "int",
                &SaveRequest::new("t", "a").replace(Selector::Latest),
            )
            .unwrap();
        assert_eq!(replaced.replaced, Some(2));
        assert_eq!(replaced.record.version, 2);
        assert_eq!(replaced.record.identity, 1);

        assert_eq!(load_bytes(&m, 1, Selector::First), b"[1,2,3]");
        assert_eq!(load_bytes(&m, 1, Selector::Latest), b"7");
        assert_eq!(version_numbers(&m, 1), vec![1, 2]);
        assert_in_sync(&m);
    }

    #[test]
    fn test_replace_single_version_restarts_at_one() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"old", "t", "a");

        // Selector names a version that doesn't exist; the lone version is still the target
        let outcome = m
            .save(
                b"new",
                CodecKind::Cbor,
                "bytes",
                &SaveRequest::new("t", "a").replace(Selector::Version(5)),
            )
            .unwrap();
        assert_eq!(outcome.replaced, Some(1));
        assert_eq!(outcome.record.version, 1);
        assert_eq!(version_numbers(&m, 1), vec![1]);
        assert_eq!(load_bytes(&m, 1, Selector::Latest), b"new");
    }

    #[test]
    fn test_replace_first_keeps_versions_dense() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        for payload in [b"1", b"2", b"3"] {
            save(&m, payload, "t", "a");
        }

        let outcome = m
            .save(
                b"4",
                CodecKind::Cbor,
                "bytes",
                &SaveRequest::new("t", "a").replace(Selector::First),
            )
            .unwrap();
        assert_eq!(outcome.replaced, Some(1));
        assert_eq!(outcome.record.version, 4);
        assert_eq!(version_numbers(&m, 1), vec![2, 3, 4]);
        assert_eq!(load_bytes(&m, 1, Selector::First), b"2");
    }

    #[test]
    fn test_replace_missing_version_appends() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");
        save(&m, b"2", "t", "a");

        let outcome = m
            .save(
                b"3",
                CodecKind::Cbor,
                "bytes",
                &SaveRequest::new("t", "a").replace(Selector::Version(9)),
            )
            .unwrap();
        assert_eq!(outcome.replaced, None);
        assert_eq!(
            outcome.replace_missed,
            Some(NotFound::Version {
                identity: 1,
                version: 9
            })
        );
        assert_eq!(version_numbers(&m, 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_versions_strictly_increasing_with_replacements() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        let mut last = 0;
        for i in 0..12u8 {
            let mut request = SaveRequest::new("t", "a");
            if i % 3 == 2 {
                request = request.replace(Selector::Latest);
            }
            let outcome = m.save(&[i], CodecKind::Cbor, "bytes", &request).unwrap();
            if outcome.replaced.is_none() {
                assert_eq!(outcome.record.version, last + 1);
            }
            last = outcome.record.version;
        }
        let numbers = version_numbers(&m, 1);
        assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(*numbers.first().unwrap(), 1);
        assert_in_sync(&m);
    }

    #[test]
    fn test_new_pairs_get_increasing_identities() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        let a = save(&m, b"x", "t", "a").record.identity;
        let b = save(&m, b"x", "t", "b").record.identity;
        let c = save(&m, b"x", "u", "a").record.identity;
        assert!(a < b && b < c);
        assert_eq!(save(&m, b"y", "t", "b").record.identity, b);
    }

    #[test]
    fn test_validation() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        for request in [
            SaveRequest::new("t", "a''b").comment("c"),
            SaveRequest::new("t''", "a").comment("c"),
            SaveRequest::new("t", "a").comment("it''s"),
            SaveRequest::new("t", ""),
        ] {
            let err = m.save(b"x", CodecKind::Cbor, "bytes", &request).unwrap_err();
            assert!(matches!(err, CatalogError::Validation { .. }));
        }

        // Single quotes on their own are fine
        let ok = m
            .save(
                b"x",
                CodecKind::Cbor,
                "bytes",
                &SaveRequest::new("t", "hongshan's dict"),
            )
            .unwrap();
        assert_eq!(ok.record.name, "hongshan's dict");
        assert!(m.list().unwrap().len() == 1);
    }

    #[test]
    fn test_empty_name_generates_new_identity_each_time() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        let request = SaveRequest::new("t", "").comment("a number without a name");
        let first = m.save(b"1", CodecKind::Cbor, "int", &request).unwrap();
        let second = m.save(b"2", CodecKind::Cbor, "int", &request).unwrap();

        assert_eq!(first.record.name.len(), 32);
        assert_ne!(first.record.name, second.record.name);
        assert_ne!(first.record.identity, second.record.identity);
    }

    #[test]
    fn test_load_misses_are_reported() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"x", "t", "a");

        let unknown = m.load(8, Selector::Latest).unwrap();
        assert_eq!(unknown.missing(), Some(&NotFound::Identity(8)));

        let bad_version = m.load(1, Selector::Version(3)).unwrap();
        assert_eq!(
            bad_version.missing(),
            Some(&NotFound::Version {
                identity: 1,
                version: 3
            })
        );

        let hit = m.load(1, Selector::Version(1)).unwrap().found().unwrap();
        assert_eq!(hit.record.name, "a");
        assert_eq!(hit.record.type_tag, "bytes");
    }

    #[test]
    fn test_delete_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");
        save(&m, b"2", "t", "a");
        save(&m, b"3", "t", "a");

        let deleted = m.delete_by_id(1, Selector::Version(2)).unwrap();
        assert_eq!(deleted.found().unwrap().version, 2);
        assert_eq!(version_numbers(&m, 1), vec![1, 3]);

        let deleted = m.delete_by_id(1, Selector::default()).unwrap();
        assert_eq!(deleted.found().unwrap().version, 3);
        assert_eq!(load_bytes(&m, 1, Selector::Latest), b"1");
        assert_in_sync(&m);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");

        let miss = m.delete_by_id(5, Selector::Latest).unwrap();
        assert_eq!(miss.missing(), Some(&NotFound::Identity(5)));
        let miss = m.delete_by_id(1, Selector::Version(4)).unwrap();
        assert!(!miss.is_found());

        assert_eq!(version_numbers(&m, 1), vec![1]);
    }

    #[test]
    fn test_resave_after_deleting_last_version_gets_fresh_identity() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");
        m.delete_by_id(1, Selector::Latest).unwrap();

        assert!(m.versions(1).unwrap().missing().is_some());
        assert!(m.load(1, Selector::Latest).unwrap().missing().is_some());

        let again = save(&m, b"2", "t", "a");
        assert_eq!(again.record.identity, 2);
        assert_eq!(again.record.version, 1);
        assert!(again.created);
        assert_eq!(load_bytes(&m, 2, Selector::Latest), b"2");
    }

    #[test]
    fn test_update_meta_applies_to_all_versions_of_identity() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");
        save(&m, b"2", "t", "a");
        save(&m, b"3", "t", "other");

        let changed = m.update_meta(1, Some("b"), Some("topic 5")).unwrap();
        assert_eq!(changed.found(), Some(2));

        for record in m.versions(1).unwrap().found().unwrap() {
            assert_eq!(record.name, "b");
            assert_eq!(record.topic, "topic 5");
        }
        let untouched = m.versions(2).unwrap().found().unwrap();
        assert_eq!(untouched[0].name, "other");
        assert_eq!(untouched[0].topic, "t");

        // The renamed pair now resolves to the same identity
        assert_eq!(save(&m, b"4", "topic 5", "b").record.identity, 1);
    }

    #[test]
    fn test_update_meta_partial_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");

        m.update_meta(1, None, Some("u")).unwrap();
        let record = &m.versions(1).unwrap().found().unwrap()[0];
        assert_eq!((record.topic.as_str(), record.name.as_str()), ("u", "a"));

        let miss = m.update_meta(3, Some("x"), None).unwrap();
        assert_eq!(miss.missing(), Some(&NotFound::Identity(3)));
    }

    #[test]
    fn test_update_meta_rejects_taken_pair() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");
        save(&m, b"2", "t", "b");

        let err = m.update_meta(2, Some("a"), None).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
        assert!(m.update_meta(2, Some("b''"), None).is_err());
    }

    #[test]
    fn test_update_meta_rejects_empty_name() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");

        let err = m.update_meta(1, Some(""), None).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { field: "name", .. }));
        assert_eq!(m.versions(1).unwrap().found().unwrap()[0].name, "a");

        // An empty topic is still a valid topic
        assert_eq!(m.update_meta(1, None, Some("")).unwrap().found(), Some(1));
    }

    #[test]
    fn test_failed_save_leaves_catalog_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);

        // Occupy the blob slot the first record key will claim
        m.session()
            .unwrap()
            .write(|tx| {
                tx.execute("INSERT INTO blobs (record_key, payload) VALUES (1, x'00')", [])?;
                Ok(())
            })
            .unwrap();

        let err = m
            .save(b"x", CodecKind::Cbor, "bytes", &SaveRequest::new("t", "a"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Database(_)));

        let counts = m
            .session()
            .unwrap()
            .read(|tx| catalog::row_counts(tx))
            .unwrap();
        assert_eq!(counts, (0, 1));
        assert!(m.list().unwrap().is_empty());
        assert!(m.find_by_name("a").unwrap().missing().is_some());

        m.session()
            .unwrap()
            .write(|tx| {
                tx.execute("DELETE FROM blobs", [])?;
                Ok(())
            })
            .unwrap();

        // Identity allocation rolled back with the insert
        let outcome = save(&m, b"y", "t", "a");
        assert_eq!((outcome.record.identity, outcome.record.version), (1, 1));
        assert_in_sync(&m);
    }

    #[test]
    fn test_find_and_load_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "data1");
        save(&m, b"2", "u", "data1");
        save(&m, b"3", "t", "data2");

        assert_eq!(m.find_by_name("data1").unwrap().found(), Some(1));
        assert_eq!(m.find_by_name("data2").unwrap().found(), Some(3));
        assert_eq!(
            m.find_by_name("nope").unwrap().missing(),
            Some(&NotFound::Name("nope".to_string()))
        );

        let loaded = m.load_by_name("data2", Selector::Latest).unwrap();
        assert_eq!(loaded.found().unwrap().bytes, b"3");
    }

    #[test]
    fn test_list_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        save(&m, b"1", "t", "a");
        save(&m, b"2", "t", "a");
        save(&m, b"3", "t", "b");

        let listed = m.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].version_count, 2);

        assert_eq!(m.clear().unwrap(), 3);
        assert!(m.list().unwrap().is_empty());
        assert_in_sync(&m);

        // Identities stay above the cleared ones
        assert_eq!(save(&m, b"4", "t", "a").record.identity, 3);
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        save(&manager(&temp_dir), b"1", "t", "a");

        let reopened = manager(&temp_dir);
        let outcome = save(&reopened, b"2", "t", "a");
        assert_eq!((outcome.record.identity, outcome.record.version), (1, 2));
    }

    #[test]
    fn test_concurrent_saves_same_new_pair() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        let writers = 8;
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let m = m.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let request = SaveRequest::new("t", "shared");
                    m.save(&[i as u8], CodecKind::Cbor, "bytes", &request).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<SaveOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let identities: HashSet<_> = outcomes.iter().map(|o| o.record.identity).collect();
        assert_eq!(identities.len(), 1);
        assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);

        let identity = *identities.iter().next().unwrap();
        let expected: Vec<i64> = (1..=writers as i64).collect();
        assert_eq!(version_numbers(&m, identity), expected);
        assert_in_sync(&m);
    }

    #[test]
    fn test_concurrent_saves_distinct_pairs() {
        let temp_dir = TempDir::new().unwrap();
        let m = manager(&temp_dir);
        let writers = 6;
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let m = m.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let name = format!("artifact-{}", i);
                    let request = SaveRequest::new("t", name.as_str());
                    for _ in 0..3 {
                        m.save(b"x", CodecKind::Cbor, "bytes", &request).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let listed = m.list().unwrap();
        assert_eq!(listed.len(), writers);
        let identities: Vec<_> = listed.iter().map(|s| s.identity).collect();
        assert_eq!(identities, (1..=writers as i64).collect::<Vec<_>>());
        assert!(listed.iter().all(|s| s.version_count == 3 && s.latest_version == 3));
    }
}
