//! SHA-256 digests and canonical content hashing

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 hash (32 bytes)
///
/// Serializes as a 64-character lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Create a hash from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hash the RFC 8785 canonical JSON form of a value.
    ///
    /// Key order and whitespace in the source document do not affect the result.
    pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_jcs::to_vec(value)?;
        Ok(Self::digest(&bytes))
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        if !is_hex_digest(s) {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }

    /// Get hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// True if `s` has the shape of a lowercase SHA-256 hex digest.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256Hash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Sha256Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Sha256Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom("expected 64 lowercase hex chars"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // sha256("abc")
        assert_eq!(
            Sha256Hash::digest(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_canonical_json_ignores_key_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"b":1,"a":[true,"x"]}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{ "a": [true, "x"], "b": 1 }"#).unwrap();
        assert_eq!(
            Sha256Hash::canonical_json(&a).unwrap(),
            Sha256Hash::canonical_json(&b).unwrap()
        );
    }

    #[test]
    fn test_hex_roundtrip_and_shape() {
        let h = Sha256Hash::digest(b"twin");
        assert_eq!(Sha256Hash::from_hex(&h.to_hex()), Some(h));
        assert!(Sha256Hash::from_hex(&h.to_hex().to_uppercase()).is_none());
        assert!(Sha256Hash::from_hex("abc").is_none());
        assert!(!is_hex_digest(&"g".repeat(64)));
    }
}
