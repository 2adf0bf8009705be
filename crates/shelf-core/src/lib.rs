//! Shelf Core Library
//!
//! This crate provides the core functionality for shelf, a versioned
//! artifact catalog: serialized payloads saved under a (topic, name) pair,
//! kept as numbered versions, and loaded back by identity and selector.
//!
//! # Architecture
//!
//! - **SQLite**: one metadata row and one blob row per saved version,
//!   always written together inside one transaction
//! - **Version manager**: identity allocation, version numbering,
//!   selector resolution
//!
//! # Quick Start
//!
//! ```text
//! let shelf = Shelf::open()?;
//!
//! // Save two versions of the same artifact
//! shelf.save(&vec![1, 2, 3], &SaveRequest::new("t", "a"))?;
//! shelf.save(&99, &SaveRequest::new("t", "a"))?;
//!
//! // Load the first one back
//! let first: Vec<i32> = shelf.load(1, Selector::First)?.found().unwrap();
//! ```
//!
//! # Modules
//!
//! - `shelf`: Typed storage interface (main entry point)
//! - `manager`: Save/replace decisions, load, delete, metadata updates
//! - `selector`: `latest` / `first` / explicit version resolution
//! - `storage`: SQLite schema, sessions and queries
//! - `codec`: Payload serialization
//! - `config`: Application configuration

pub mod codec;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod selector;
pub mod shelf;
pub mod storage;

pub use codec::{CborCodec, Codec, CodecKind, JsonCodec};
pub use config::Config;
pub use error::{CatalogError, CatalogResult, Lookup, NotFound};
pub use manager::{StoredPayload, VersionManager, FORBIDDEN_SEQUENCE};
pub use models::{ArtifactId, ArtifactSummary, RecordKey, SaveOutcome, SaveRequest, VersionRecord};
pub use selector::{Resolved, Selector};
pub use shelf::Shelf;
