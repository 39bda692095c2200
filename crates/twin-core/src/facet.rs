//! Disclosure facets and ledger routing
//!
//! A facet is one typed unit of disclosed information about a scanned object.
//! Its type decides which ledger may carry it. The taxonomy is closed:
//! facets of any other type are dropped from both ledgers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger a facet is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    /// Publicly readable anchor ledger
    Public,
    /// Shielded ledger, payload revealed only under quorum
    Private,
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ledger::Public => f.write_str("public"),
            Ledger::Private => f.write_str("private"),
        }
    }
}

/// Recognized facet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Authenticity,
    Esg,
    CreatorAttribution,
    Ownership,
    Pricing,
}

impl FacetKind {
    /// Facet kinds carried on the public ledger, in payload order
    pub const PUBLIC: [FacetKind; 3] = [
        FacetKind::CreatorAttribution,
        FacetKind::Authenticity,
        FacetKind::Esg,
    ];

    /// Facet kinds carried on the private ledger, in payload order
    pub const PRIVATE: [FacetKind; 2] = [FacetKind::Ownership, FacetKind::Pricing];

    /// Parse the wire name of a facet type. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "authenticity" => Some(Self::Authenticity),
            "esg" => Some(Self::Esg),
            "creator_attribution" => Some(Self::CreatorAttribution),
            "ownership" => Some(Self::Ownership),
            "pricing" => Some(Self::Pricing),
            _ => None,
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticity => "authenticity",
            Self::Esg => "esg",
            Self::CreatorAttribution => "creator_attribution",
            Self::Ownership => "ownership",
            Self::Pricing => "pricing",
        }
    }

    /// The ledger this kind is routed to
    pub fn ledger(&self) -> Ledger {
        match self {
            Self::Authenticity | Self::Esg | Self::CreatorAttribution => Ledger::Public,
            Self::Ownership | Self::Pricing => Ledger::Private,
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed unit of disclosed information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub facet_type: String,
    #[serde(default = "empty_preview")]
    pub payload_preview: serde_json::Value,
}

fn empty_preview() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Facet {
    pub fn new(facet_type: impl Into<String>, payload_preview: serde_json::Value) -> Self {
        Self {
            facet_type: facet_type.into(),
            payload_preview,
        }
    }

    /// Recognized kind, if any
    pub fn kind(&self) -> Option<FacetKind> {
        FacetKind::parse(&self.facet_type)
    }
}

/// Facets split by destination ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedFacets {
    pub public: Vec<Facet>,
    pub private: Vec<Facet>,
    /// Number of facets of unrecognized type that went to neither ledger
    pub dropped: usize,
}

/// Partition facets into public and private lists.
///
/// Relative input order is preserved within each list.
pub fn classify(facets: &[Facet]) -> ClassifiedFacets {
    let mut out = ClassifiedFacets::default();
    for facet in facets {
        match facet.kind().map(|k| k.ledger()) {
            Some(Ledger::Public) => out.public.push(facet.clone()),
            Some(Ledger::Private) => out.private.push(facet.clone()),
            None => out.dropped += 1,
        }
    }
    out
}

/// First facet of the given kind. Later duplicates are ignored, not merged.
pub fn first_of(facets: &[Facet], kind: FacetKind) -> Option<&Facet> {
    facets.iter().find(|f| f.kind() == Some(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn one_of_each() -> Vec<Facet> {
        vec![
            Facet::new("ownership", json!({"owner": "alice"})),
            Facet::new("authenticity", json!({"verified": true})),
            Facet::new("pricing", json!({"amount": 120})),
            Facet::new("esg", json!({"score": 7})),
            Facet::new("creator_attribution", json!({"designer": "studio"})),
        ]
    }

    #[test]
    fn test_routing_is_disjoint_and_covering() {
        let split = classify(&one_of_each());

        let public: HashSet<_> = split.public.iter().map(|f| f.facet_type.clone()).collect();
        let private: HashSet<_> = split.private.iter().map(|f| f.facet_type.clone()).collect();

        assert!(public.is_disjoint(&private));

        let all: HashSet<_> = public.union(&private).cloned().collect();
        let expected: HashSet<_> = FacetKind::PUBLIC
            .iter()
            .chain(FacetKind::PRIVATE.iter())
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(all, expected);
        assert_eq!(split.dropped, 0);
    }

    #[test]
    fn test_unknown_types_are_dropped() {
        let facets = vec![
            Facet::new("authenticity", json!({})),
            Facet::new("medical_history", json!({"secret": 1})),
            Facet::new("Ownership", json!({})),
        ];
        let split = classify(&facets);
        assert_eq!(split.public.len(), 1);
        assert!(split.private.is_empty());
        assert_eq!(split.dropped, 2);
    }

    #[test]
    fn test_order_preserved() {
        let facets = vec![
            Facet::new("esg", json!({"n": 1})),
            Facet::new("ownership", json!({"n": 2})),
            Facet::new("authenticity", json!({"n": 3})),
            Facet::new("esg", json!({"n": 4})),
        ];
        let split = classify(&facets);
        let ns: Vec<_> = split
            .public
            .iter()
            .map(|f| f.payload_preview["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![1, 3, 4]);
    }

    #[test]
    fn test_first_match_wins() {
        let facets = vec![
            Facet::new("esg", json!({"n": 1})),
            Facet::new("esg", json!({"n": 2})),
        ];
        let first = first_of(&facets, FacetKind::Esg).unwrap();
        assert_eq!(first.payload_preview["n"], 1);
        assert!(first_of(&facets, FacetKind::Pricing).is_none());
    }
}
