//! Storage layer
//!
//! Handles the SQLite catalog: schema, scoped sessions, and the query
//! functions the version manager composes inside its transactions.
//!
//! ## Tables
//!
//! - `artifacts` - one metadata row per saved version
//! - `blobs` - payload bytes, keyed by the same record key
//! - `catalog_state` - store-level counters (identity high-water mark)

pub mod catalog;
pub mod schema;
pub mod session;

pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use session::Session;
