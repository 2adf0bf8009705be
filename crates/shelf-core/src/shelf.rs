//! Typed storage interface
//!
//! `Shelf` pairs a [`VersionManager`] with the configured codec so callers
//! work with serde values instead of bytes.
//!
//! ## Usage
//!
//! ```ignore
//! let shelf = Shelf::open()?;
//!
//! let saved = shelf.save(&vec![1, 2, 3], &SaveRequest::new("runs", "losses"))?;
//! let losses: Option<Vec<i32>> = shelf.load(saved.record.identity, Selector::Latest)?.found();
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, CodecKind};
use crate::config::Config;
use crate::error::{CatalogResult, Lookup};
use crate::manager::{StoredPayload, VersionManager};
use crate::models::{ArtifactId, ArtifactSummary, SaveOutcome, SaveRequest, VersionRecord};
use crate::selector::Selector;

/// Versioned artifact store with typed payloads
pub struct Shelf {
    manager: VersionManager,
    codec: CodecKind,
    config: Config,
}

impl Shelf {
    /// Open the shelf described by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the shelf with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        config.ensure_data_dir()?;
        let manager = VersionManager::from_config(&config)
            .with_context(|| format!("Failed to open catalog at {:?}", config.catalog_path()))?;

        Ok(Self {
            manager,
            codec: config.codec,
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the underlying version manager
    pub fn manager(&self) -> &VersionManager {
        &self.manager
    }

    // ==================== Typed payloads ====================

    /// Encode and save a value with the configured codec
    ///
    /// The type tag comes from the request when set, otherwise from the codec.
    pub fn save<T: Serialize + ?Sized>(
        &self,
        value: &T,
        request: &SaveRequest,
    ) -> CatalogResult<SaveOutcome> {
        let bytes = self.codec.encode(value)?;
        let type_tag = match &request.type_tag {
            Some(tag) => tag.clone(),
            None => self.codec.type_tag::<T>(),
        };
        self.manager.save(&bytes, self.codec, &type_tag, request)
    }

    /// Load and decode the value a selector resolves to
    pub fn load<T: DeserializeOwned>(
        &self,
        identity: ArtifactId,
        selector: Selector,
    ) -> CatalogResult<Lookup<T>> {
        match self.manager.load(identity, selector)? {
            Lookup::Found(stored) => Ok(Lookup::Found(self.decode(&stored)?)),
            Lookup::Missing(reason) => Ok(Lookup::Missing(reason)),
        }
    }

    /// Load and decode by name
    pub fn load_by_name<T: DeserializeOwned>(
        &self,
        name: &str,
        selector: Selector,
    ) -> CatalogResult<Lookup<T>> {
        match self.manager.load_by_name(name, selector)? {
            Lookup::Found(stored) => Ok(Lookup::Found(self.decode(&stored)?)),
            Lookup::Missing(reason) => Ok(Lookup::Missing(reason)),
        }
    }

    /// Decode a payload fetched through [`Shelf::manager`]
    ///
    /// Uses the codec recorded with the version, not the configured one.
    pub fn decode<T: DeserializeOwned>(&self, stored: &StoredPayload) -> CatalogResult<T> {
        stored.record.codec.decode(&stored.bytes)
    }

    // ==================== Catalog operations ====================

    pub fn delete_by_id(
        &self,
        identity: ArtifactId,
        selector: Selector,
    ) -> CatalogResult<Lookup<VersionRecord>> {
        self.manager.delete_by_id(identity, selector)
    }

    pub fn update_meta(
        &self,
        identity: ArtifactId,
        name: Option<&str>,
        topic: Option<&str>,
    ) -> CatalogResult<Lookup<usize>> {
        self.manager.update_meta(identity, name, topic)
    }

    pub fn list(&self) -> CatalogResult<Vec<ArtifactSummary>> {
        self.manager.list()
    }

    pub fn versions(&self, identity: ArtifactId) -> CatalogResult<Lookup<Vec<VersionRecord>>> {
        self.manager.versions(identity)
    }

    pub fn clear(&self) -> CatalogResult<usize> {
        self.manager.clear()
    }
}
