//! # Twin Core
//!
//! Core types for dual-ledger scan anchoring:
//! - [`Facet`] and [`classify`] - typed disclosure units and their ledger routing
//! - [`AnchorRequest`] / [`AnchorResult`] - one anchoring attempt and its outcome
//! - [`link`] - the cross-ledger root binding two anchors to a scan
//! - [`Sha256Hash`] - digests and canonical JSON content hashing
//! - [`RevealTicket`] - quorum-issued authorization to decrypt a private anchor

pub mod digest;
pub mod facet;
pub mod link;
pub mod request;
pub mod reveal;
pub mod validation;

pub use digest::{is_hex_digest, Sha256Hash};
pub use facet::{classify, first_of, ClassifiedFacets, Facet, FacetKind, Ledger};
pub use link::{link, link_hex};
pub use request::{AnchorRequest, AnchorResult, InvalidTxId, Scope, TxId};
pub use reveal::{RevealState, RevealTicket, REVEAL_QUORUM};
pub use validation::{FieldError, ValidationError, Validator};
