//! # Twin Anchor
//!
//! Dual-ledger anchoring for scan events.
//!
//! A scan's public facets are committed by hash to a public ledger as
//! transaction metadata; its private facets are sealed and submitted to a
//! shielded ledger. The two transaction ids are bound to the scan by a
//! cross-ledger root.
//!
//! ## Backends
//!
//! - **HttpChainClient**: public ledger via a Blockfrost-shaped REST gateway
//! - **RealShieldedBackend**: shielded ledger via node JSON-RPC
//! - **SimulatedBackend**: deterministic stand-in ids that never verify
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use twin_anchor::{AnchorConfig, LedgerHandles};
//! use twin_core::{AnchorRequest, Facet, Scope};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handles = LedgerHandles::from_config(&AnchorConfig::from_env()?)?;
//!
//!     let request = AnchorRequest::new(
//!         Uuid::new_v4(),
//!         Uuid::new_v4(),
//!         Scope::Public,
//!         vec![Facet::new("authenticity", serde_json::json!({"verified": 1}))],
//!         "policy-v1",
//!     )?;
//!     let result = handles.service().anchor(&request).await?;
//!     println!("root: {}", result.cross_ledger_root);
//!
//!     Ok(())
//! }
//! ```

mod backend;
mod chain;
mod clock;
mod config;
mod error;
mod handles;
mod index;
pub mod metadata;
mod private;
mod public;
mod sealing;
mod service;
mod shielded;
mod simulator;
mod strategy;
mod verifier;
mod wallet;

pub use backend::{LedgerQuery, CARDANO, MIDNIGHT};
pub use chain::{
    ChainClient, HttpChainClient, MetadataEntry, ProtocolParams, SignedTransaction, TxBody,
    TxInput, TxOutput, Utxo, VkeyWitness,
};
pub use clock::{Clock, FixedClock, MonotonicClock};
pub use config::{AnchorConfig, PrivateLedgerConfig, PublicLedgerConfig};
pub use error::{
    AnchorError, BuildError, ConfigError, IndexError, LedgerError, MetadataError, SealingError,
};
pub use handles::LedgerHandles;
pub use index::{AnchorRecord, MemoryRootIndex, RootIndex, DEFAULT_INDEX_CAPACITY};
pub use private::{ConsentSnapshot, PrivateAnchorBuilder, PrivateAnchorPayload, PRIVATE_PROTOCOL};
pub use public::{
    assemble_transaction, FacetDigest, PublicAnchorBuilder, PublicAnchorPayload, PublicSubmitter,
    DEFAULT_MIN_UTXO, METADATA_LABEL, PUBLIC_PROTOCOL,
};
pub use sealing::{PayloadSealer, SealedFacet};
pub use service::AnchorService;
pub use shielded::{RealShieldedBackend, ShieldedBackend};
pub use simulator::{FallbackSimulator, SimulatedBackend};
pub use strategy::{choose_strategy, LedgerMode, LedgerSettings, Strategy};
pub use verifier::{AnchorVerifier, BackendHealth, LedgerHealth};
pub use wallet::{SecretProvider, SecretSource, Wallet};
