//! Native transaction metadata for the public ledger
//!
//! Metadata values are maps, lists, text, bytes and integers. Sizes are
//! accounted in the ledger's CBOR encoding; the JSON form produced here is the
//! gateway's "detailed schema":
//!
//! ```json
//! {"map": [{"k": {"string": "protocol"}, "v": {"string": "twin-anchor/scan-v1"}}]}
//! ```
//!
//! Nothing is ever truncated: unsupported values, over-long strings and
//! oversize documents are rejected.

use serde_json::{json, Value};

use crate::error::MetadataError;

/// Maximum length of a single text or bytes value
pub const MAX_TEXT_BYTES: usize = 64;

/// Default per-transaction metadata limit (bytes, encoded)
pub const DEFAULT_MAX_METADATA_BYTES: usize = 16_384;

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadatum {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Metadatum>),
    Map(Vec<(Metadatum, Metadatum)>),
}

impl Metadatum {
    /// Convert a JSON document. Object keys become text keys in document order.
    pub fn from_json(value: &Value) -> Result<Self, MetadataError> {
        match value {
            Value::Null => Err(MetadataError::UnsupportedValue("null")),
            Value::Bool(_) => Err(MetadataError::UnsupportedValue("bool")),
            Value::Number(n) => n
                .as_i64()
                .map(Metadatum::Int)
                .ok_or(MetadataError::UnsupportedValue("non-integer number")),
            Value::String(s) => Self::text(s.clone()),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Metadatum::List),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((Self::text(k.clone())?, Self::from_json(v)?)))
                .collect::<Result<Vec<_>, _>>()
                .map(Metadatum::Map),
        }
    }

    /// Text value, checked against the string limit
    pub fn text(s: impl Into<String>) -> Result<Self, MetadataError> {
        let s = s.into();
        if s.len() > MAX_TEXT_BYTES {
            return Err(MetadataError::TextTooLong {
                len: s.len(),
                limit: MAX_TEXT_BYTES,
            });
        }
        Ok(Metadatum::Text(s))
    }

    /// Bytes value, checked against the string limit
    pub fn bytes(b: Vec<u8>) -> Result<Self, MetadataError> {
        if b.len() > MAX_TEXT_BYTES {
            return Err(MetadataError::TextTooLong {
                len: b.len(),
                limit: MAX_TEXT_BYTES,
            });
        }
        Ok(Metadatum::Bytes(b))
    }

    /// Length of this value in the ledger's CBOR encoding
    pub fn encoded_len(&self) -> usize {
        match self {
            Metadatum::Int(n) => {
                let magnitude = if *n < 0 { (-1 - *n) as u64 } else { *n as u64 };
                header_len(magnitude)
            }
            Metadatum::Bytes(b) => header_len(b.len() as u64) + b.len(),
            Metadatum::Text(s) => header_len(s.len() as u64) + s.len(),
            Metadatum::List(items) => {
                header_len(items.len() as u64) + items.iter().map(|i| i.encoded_len()).sum::<usize>()
            }
            Metadatum::Map(pairs) => {
                header_len(pairs.len() as u64)
                    + pairs
                        .iter()
                        .map(|(k, v)| k.encoded_len() + v.encoded_len())
                        .sum::<usize>()
            }
        }
    }

    /// Detailed-schema JSON form
    pub fn to_detailed_json(&self) -> Value {
        match self {
            Metadatum::Int(n) => json!({ "int": n }),
            Metadatum::Bytes(b) => json!({ "bytes": hex::encode(b) }),
            Metadatum::Text(s) => json!({ "string": s }),
            Metadatum::List(items) => {
                json!({ "list": items.iter().map(|i| i.to_detailed_json()).collect::<Vec<_>>() })
            }
            Metadatum::Map(pairs) => json!({
                "map": pairs
                    .iter()
                    .map(|(k, v)| json!({ "k": k.to_detailed_json(), "v": v.to_detailed_json() }))
                    .collect::<Vec<_>>()
            }),
        }
    }

    /// Plain JSON form (as ledger explorers render it)
    pub fn to_plain_json(&self) -> Value {
        match self {
            Metadatum::Int(n) => json!(n),
            Metadatum::Bytes(b) => json!(format!("0x{}", hex::encode(b))),
            Metadatum::Text(s) => json!(s),
            Metadatum::List(items) => Value::Array(items.iter().map(|i| i.to_plain_json()).collect()),
            Metadatum::Map(pairs) => {
                let mut out = serde_json::Map::new();
                for (k, v) in pairs {
                    let key = match k {
                        Metadatum::Text(s) => s.clone(),
                        other => other.to_plain_json().to_string(),
                    };
                    out.insert(key, v.to_plain_json());
                }
                Value::Object(out)
            }
        }
    }
}

/// CBOR major-type header length for an argument
fn header_len(arg: u64) -> usize {
    match arg {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Metadata attached to one transaction under a numeric label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMetadata {
    pub label: u64,
    pub value: Metadatum,
}

impl TxMetadata {
    pub fn new(label: u64, value: Metadatum) -> Self {
        Self { label, value }
    }

    /// Encoded size of the full `{label: value}` metadata map
    pub fn encoded_len(&self) -> usize {
        header_len(1) + header_len(self.label) + self.value.encoded_len()
    }

    /// Reject metadata above `limit` bytes
    pub fn ensure_within(&self, limit: usize) -> Result<(), MetadataError> {
        let size = self.encoded_len();
        if size > limit {
            return Err(MetadataError::TooLarge { size, limit });
        }
        Ok(())
    }

    /// Detailed-schema JSON keyed by label, as attached to the transaction body
    pub fn to_detailed_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(self.label.to_string(), self.value.to_detailed_json());
        Value::Object(map)
    }
}
