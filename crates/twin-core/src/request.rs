//! Anchor requests, transaction ids and anchoring results

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::digest::is_hex_digest;
use crate::facet::Facet;
use crate::validation::{ValidationError, Validator};

/// Upper bound on facets per request
pub const MAX_FACETS: usize = 64;

/// Upper bound on policy version length (bytes)
pub const MAX_POLICY_VERSION_LEN: usize = 128;

/// Disclosure scope resolved by the upstream policy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Public,
    FriendsOnly,
    Private,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Public => "public",
            Scope::FriendsOnly => "friends_only",
            Scope::Private => "private",
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Scope::Public),
            "friends_only" => Ok(Scope::FriendsOnly),
            "private" => Ok(Scope::Private),
            other => Err(format!(
                "unknown scope '{}', expected public, friends_only or private",
                other
            )),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger transaction identifier: 64 lowercase hex characters.
///
/// Real and simulated submissions produce ids of identical shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TxId(String);

/// A string that is not a well-formed transaction id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transaction id (expected 64 lowercase hex chars, got {len} chars)")]
pub struct InvalidTxId {
    pub len: usize,
}

impl TxId {
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidTxId> {
        let s = s.into();
        if is_hex_digest(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidTxId { len: s.len() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TxId::parse(s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TxId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One anchoring attempt for a scan event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRequest {
    pub scan_id: Uuid,
    pub garment_id: Uuid,
    pub scope: Scope,
    pub facets: Vec<Facet>,
    pub policy_version: String,
}

impl AnchorRequest {
    /// Build a request from already-typed parts, validating the remainder.
    pub fn new(
        scan_id: Uuid,
        garment_id: Uuid,
        scope: Scope,
        facets: Vec<Facet>,
        policy_version: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            scan_id,
            garment_id,
            scope,
            facets,
            policy_version: policy_version.into(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Build a request from wire strings, reporting every bad field at once.
    pub fn from_wire(
        scan_id: &str,
        garment_id: &str,
        scope: &str,
        facets: Vec<Facet>,
        policy_version: &str,
    ) -> Result<Self, ValidationError> {
        let mut v = Validator::new();

        let scan = Uuid::parse_str(scan_id).ok();
        v.check(scan.is_some(), "scan_id", "must be a UUID");
        let garment = Uuid::parse_str(garment_id).ok();
        v.check(garment.is_some(), "garment_id", "must be a UUID");
        let parsed_scope = match scope.parse::<Scope>() {
            Ok(s) => Some(s),
            Err(msg) => {
                v.push("resolved_scope", msg);
                None
            }
        };
        check_body(&mut v, &facets, policy_version);
        v.finish()?;

        // All three are Some once the validator passed.
        match (scan, garment, parsed_scope) {
            (Some(scan_id), Some(garment_id), Some(scope)) => Ok(Self {
                scan_id,
                garment_id,
                scope,
                facets,
                policy_version: policy_version.to_string(),
            }),
            _ => Err(ValidationError::single("request", "incomplete")),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.check(!self.scan_id.is_nil(), "scan_id", "must not be the nil UUID");
        v.check(
            !self.garment_id.is_nil(),
            "garment_id",
            "must not be the nil UUID",
        );
        check_body(&mut v, &self.facets, &self.policy_version);
        v.finish()
    }
}

fn check_body(v: &mut Validator, facets: &[Facet], policy_version: &str) {
    let policy = policy_version.trim();
    v.check(!policy.is_empty(), "policy_version", "must not be empty");
    v.check(
        policy_version.len() <= MAX_POLICY_VERSION_LEN,
        "policy_version",
        format!("must be at most {} bytes", MAX_POLICY_VERSION_LEN),
    );
    v.check(
        facets.len() <= MAX_FACETS,
        "allowed_facets",
        format!("at most {} facets per request", MAX_FACETS),
    );
    for (i, facet) in facets.iter().enumerate() {
        v.check(
            !facet.facet_type.trim().is_empty(),
            format!("allowed_facets[{}].facet_type", i),
            "must not be empty",
        );
        v.check(
            facet.payload_preview.is_object(),
            format!("allowed_facets[{}].payload_preview", i),
            "must be an object",
        );
    }
}

/// The binding artifact handed back to the caller and to the audit writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorResult {
    pub public_tx_id: TxId,
    pub private_tx_id: TxId,
    pub cross_ledger_root: String,
}
