//! Payload codecs
//!
//! The catalog stores opaque bytes. A codec turns a serde value into those
//! bytes and back, and supplies the type tag recorded next to each version.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Serialization strategy for payloads
pub trait Codec {
    /// Encode a value into payload bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CatalogResult<Vec<u8>>;

    /// Decode payload bytes back into a value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CatalogResult<T>;

    /// Type descriptor stored with a version, for display only
    fn type_tag<T: ?Sized>(&self) -> String {
        short_type_name(std::any::type_name::<T>())
    }
}

/// CBOR payloads (compact, the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CatalogResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes)
            .map_err(|e| CatalogError::Codec(format!("CBOR encode failed: {}", e)))?;
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CatalogResult<T> {
        ciborium::from_reader(bytes)
            .map_err(|e| CatalogError::Codec(format!("CBOR decode failed: {}", e)))
    }
}

/// JSON payloads (readable with the sqlite3 shell)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CatalogResult<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| CatalogError::Codec(format!("JSON encode failed: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CatalogResult<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| CatalogError::Codec(format!("JSON decode failed: {}", e)))
    }
}

/// Codec selected by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Cbor,
    Json,
}

impl Codec for CodecKind {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CatalogResult<Vec<u8>> {
        match self {
            CodecKind::Cbor => CborCodec.encode(value),
            CodecKind::Json => JsonCodec.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CatalogResult<T> {
        match self {
            CodecKind::Cbor => CborCodec.decode(bytes),
            CodecKind::Json => JsonCodec.decode(bytes),
        }
    }
}

impl CodecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Cbor => "cbor",
            CodecKind::Json => "json",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// Stored per version so payloads decode with the codec that wrote them
impl ToSql for CodecKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CodecKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: CatalogError| FromSqlError::Other(Box::new(e)))
    }
}

impl FromStr for CodecKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cbor" => Ok(CodecKind::Cbor),
            "json" => Ok(CodecKind::Json),
            other => Err(CatalogError::validation(
                "codec",
                format!("unknown codec '{}' (expected cbor or json)", other),
            )),
        }
    }
}

/// Strip module paths and generic arguments: `alloc::vec::Vec<i32>` -> `Vec`
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        label: String,
        values: Vec<i64>,
        weights: BTreeMap<String, f64>,
    }

    fn sample() -> Sample {
        let mut weights = BTreeMap::new();
        weights.insert("a".to_string(), 0.5);
        Sample {
            label: "run 1".to_string(),
            values: vec![1, 2, 3],
            weights,
        }
    }

    #[test]
    fn test_cbor_preserves_value() {
        let bytes = CborCodec.encode(&sample()).unwrap();
        let decoded: Sample = CborCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_json_preserves_value() {
        let bytes = JsonCodec.encode(&sample()).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("\"label\""));
        let decoded: Sample = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_decode_failure_is_codec_error() {
        let err = JsonCodec.decode::<Sample>(b"not json").unwrap_err();
        assert!(matches!(err, CatalogError::Codec(_)));

        let bytes = CborCodec.encode(&"text").unwrap();
        let err = CborCodec.decode::<Vec<i64>>(&bytes).unwrap_err();
        assert!(matches!(err, CatalogError::Codec(_)));
    }

    #[test]
    fn test_kind_dispatch() {
        let bytes = CodecKind::Json.encode(&vec![1, 2]).unwrap();
        assert_eq!(bytes, b"[1,2]");
        let decoded: Vec<i32> = CodecKind::Json.decode(&bytes).unwrap();
        assert_eq!(decoded, vec![1, 2]);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("CBOR".parse::<CodecKind>().unwrap(), CodecKind::Cbor);
        assert_eq!(" json ".parse::<CodecKind>().unwrap(), CodecKind::Json);
        assert!("pickle".parse::<CodecKind>().is_err());
        assert_eq!(CodecKind::Json.to_string(), "json");
    }

    #[test]
    fn test_kind_sql_column() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let stored: CodecKind = conn
            .query_row("SELECT ?1", [CodecKind::Json], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, CodecKind::Json);

        let bad: rusqlite::Result<CodecKind> =
            conn.query_row("SELECT 'pickle'", [], |row| row.get(0));
        assert!(bad.is_err());
    }

    #[test]
    fn test_type_tag() {
        assert_eq!(CborCodec.type_tag::<Vec<i32>>(), "Vec");
        assert_eq!(CborCodec.type_tag::<i64>(), "i64");
        assert_eq!(CborCodec.type_tag::<Sample>(), "Sample");
        assert_eq!(short_type_name("std::collections::HashMap<K, V>"), "HashMap");
    }
}
