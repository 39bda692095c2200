//! Public ledger transaction builder
//!
//! Public facets are reduced to content hashes, wrapped in a
//! [`PublicAnchorPayload`] and attached as native metadata under
//! [`METADATA_LABEL`] to a self-paying transaction signed by the wallet.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use twin_core::{first_of, Facet, FacetKind, Scope, Sha256Hash, TxId};
use uuid::Uuid;

use crate::backend::CARDANO;
use crate::chain::{
    ChainClient, ProtocolParams, SignedTransaction, TxBody, TxInput, TxOutput, Utxo, VkeyWitness,
};
use crate::clock::{Clock, MonotonicClock};
use crate::error::{BuildError, LedgerError};
use crate::metadata::{Metadatum, TxMetadata, DEFAULT_MAX_METADATA_BYTES};
use crate::simulator::FallbackSimulator;
use crate::wallet::Wallet;

/// Metadata label reserved for scan anchors
pub const METADATA_LABEL: u64 = 7728;

/// Protocol tag carried by every public anchor
pub const PUBLIC_PROTOCOL: &str = "twin-anchor/scan-v1";

pub const PAYLOAD_VERSION: u32 = 1;

/// Minimum lovelace for the change output
pub const DEFAULT_MIN_UTXO: u64 = 1_000_000;

/// Facets extracted for the public anchor, in payload order
const PUBLIC_ORDER: [FacetKind; 3] = [
    FacetKind::CreatorAttribution,
    FacetKind::Authenticity,
    FacetKind::Esg,
];

/// Hash commitment to one public facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDigest {
    pub facet_type: String,
    /// SHA-256 of the canonical JSON of the facet's preview
    pub content_hash: String,
}

/// Document anchored on the public ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAnchorPayload {
    pub protocol: String,
    pub version: u32,
    pub scan_id: String,
    pub garment_id: String,
    pub scope: Scope,
    pub facets: Vec<FacetDigest>,
    pub policy_hash: String,
    /// Unix seconds
    pub submitted_at: i64,
}

impl PublicAnchorPayload {
    /// Build the payload from public facets, first match per kind
    pub fn new(
        scan_id: &Uuid,
        garment_id: &Uuid,
        scope: Scope,
        facets: &[Facet],
        policy_version: &str,
        submitted_at: i64,
    ) -> Result<Self, serde_json::Error> {
        let digests = PUBLIC_ORDER
            .iter()
            .filter_map(|kind| first_of(facets, *kind))
            .map(|facet| {
                Ok(FacetDigest {
                    facet_type: facet.facet_type.clone(),
                    content_hash: Sha256Hash::canonical_json(&facet.payload_preview)?.to_hex(),
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        Ok(Self {
            protocol: PUBLIC_PROTOCOL.to_string(),
            version: PAYLOAD_VERSION,
            scan_id: scan_id.to_string(),
            garment_id: garment_id.to_string(),
            scope,
            facets: digests,
            policy_hash: Sha256Hash::digest(policy_version.as_bytes()).to_hex(),
            submitted_at,
        })
    }

    /// Encode as label-keyed metadata, rejecting anything above `limit`
    pub fn to_metadata(&self, limit: usize) -> Result<TxMetadata, LedgerError> {
        let value = serde_json::to_value(self)?;
        let metadata = TxMetadata::new(METADATA_LABEL, Metadatum::from_json(&value)?);
        metadata.ensure_within(limit)?;
        Ok(metadata)
    }
}

/// Placeholder text used when sizing a transaction before it is signed
fn placeholder_witness() -> VkeyWitness {
    VkeyWitness {
        vkey: "0".repeat(64),
        signature: "0".repeat(128),
    }
}

/// Serialized size of a signed transaction with `inputs` and worst-case amounts
fn estimate_size(
    inputs: &[TxInput],
    address: &str,
    metadata: &serde_json::Value,
) -> Result<u64, LedgerError> {
    let draft = SignedTransaction {
        body: TxBody {
            inputs: inputs.to_vec(),
            outputs: vec![TxOutput {
                address: address.to_string(),
                lovelace: u64::MAX,
            }],
            fee: u64::MAX,
            metadata: metadata.clone(),
        },
        body_hash: "0".repeat(64),
        witnesses: vec![placeholder_witness()],
    };
    Ok(serde_jcs::to_vec(&draft)?.len() as u64)
}

/// Select inputs, compute the fee and sign.
///
/// Inputs are taken largest first until they cover `fee + min_utxo`; the
/// remainder returns to the wallet as a single change output.
pub fn assemble_transaction(
    utxos: &[Utxo],
    params: &ProtocolParams,
    wallet: &Wallet,
    metadata: &TxMetadata,
    min_utxo: u64,
) -> Result<SignedTransaction, LedgerError> {
    let mut candidates = utxos.to_vec();
    candidates.sort_by(|a, b| {
        b.lovelace
            .cmp(&a.lovelace)
            .then_with(|| a.tx_hash.cmp(&b.tx_hash))
            .then_with(|| a.output_index.cmp(&b.output_index))
    });

    let metadata_json = metadata.to_detailed_json();
    let address = wallet.address();
    let fee_for = |size: u64| {
        params
            .min_fee_a
            .saturating_mul(size)
            .saturating_add(params.min_fee_b)
    };

    let mut inputs: Vec<TxInput> = Vec::new();
    let mut total: u64 = 0;
    let mut size = estimate_size(&inputs, address, &metadata_json)?;

    for utxo in &candidates {
        if total >= fee_for(size).saturating_add(min_utxo) && !inputs.is_empty() {
            break;
        }
        inputs.push(TxInput {
            tx_hash: utxo.tx_hash.clone(),
            index: utxo.output_index,
        });
        total = total.saturating_add(utxo.lovelace);
        size = estimate_size(&inputs, address, &metadata_json)?;
    }

    if size > params.max_tx_size {
        return Err(LedgerError::TransactionTooLarge {
            size,
            limit: params.max_tx_size,
        });
    }

    let fee = fee_for(size);
    let required = fee.saturating_add(min_utxo);
    if inputs.is_empty() || total < required {
        return Err(LedgerError::InsufficientFunds {
            required,
            available: total,
        });
    }

    let body = TxBody {
        inputs,
        outputs: vec![TxOutput {
            address: address.to_string(),
            lovelace: total - fee,
        }],
        fee,
        metadata: metadata_json,
    };
    let body_hash = Sha256Hash::canonical_json(&body)?;
    let witness = wallet.sign(&body_hash.0);

    Ok(SignedTransaction {
        body,
        body_hash: body_hash.to_hex(),
        witnesses: vec![witness],
    })
}

/// How public anchors reach the ledger
#[derive(Clone)]
pub enum PublicSubmitter {
    Chain {
        client: Arc<dyn ChainClient>,
        wallet: Arc<Wallet>,
    },
    Simulated,
}

impl std::fmt::Debug for PublicSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublicSubmitter::Chain { client, wallet } => f
                .debug_struct("Chain")
                .field("ledger", &client.name())
                .field("wallet", wallet)
                .finish(),
            PublicSubmitter::Simulated => f.write_str("Simulated"),
        }
    }
}

/// Builds and submits public anchors
#[derive(Debug, Clone)]
pub struct PublicAnchorBuilder {
    submitter: PublicSubmitter,
    simulator: FallbackSimulator,
    clock: Arc<dyn Clock>,
    fallback: bool,
    max_metadata_bytes: usize,
    min_utxo: u64,
    call_timeout: Duration,
}

impl PublicAnchorBuilder {
    pub fn new(submitter: PublicSubmitter, simulator: FallbackSimulator) -> Self {
        Self {
            submitter,
            simulator,
            clock: Arc::new(MonotonicClock::new()),
            fallback: false,
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
            min_utxo: DEFAULT_MIN_UTXO,
            call_timeout: Duration::from_secs(20),
        }
    }

    /// Builder that never contacts a ledger
    pub fn simulated(simulator: FallbackSimulator) -> Self {
        Self::new(PublicSubmitter::Simulated, simulator)
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_max_metadata_bytes(mut self, limit: usize) -> Self {
        self.max_metadata_bytes = limit;
        self
    }

    pub fn with_min_utxo(mut self, min_utxo: u64) -> Self {
        self.min_utxo = min_utxo;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Anchor the public facets of a scan.
    ///
    /// Encoding failures are returned in every mode. Submission failures are
    /// replaced by a simulated id only when fallback is enabled.
    pub async fn build_public_anchor(
        &self,
        scan_id: &Uuid,
        garment_id: &Uuid,
        scope: Scope,
        facets: &[Facet],
        policy_version: &str,
    ) -> Result<TxId, BuildError> {
        let payload = PublicAnchorPayload::new(
            scan_id,
            garment_id,
            scope,
            facets,
            policy_version,
            self.clock.now().timestamp(),
        )
        .map_err(BuildError::public)?;
        let metadata = payload
            .to_metadata(self.max_metadata_bytes)
            .map_err(BuildError::public)?;

        let (client, wallet) = match self.submitter {
            PublicSubmitter::Simulated => {
                return self
                    .simulator
                    .simulate(CARDANO, &payload)
                    .map_err(BuildError::public);
            }
            PublicSubmitter::Chain {
                ref client,
                ref wallet,
            } => (client, wallet),
        };

        let attempt = tokio::time::timeout(
            self.call_timeout,
            self.submit(client.as_ref(), wallet, &metadata),
        )
        .await
        .unwrap_or(Err(LedgerError::Timeout(self.call_timeout)));

        match attempt {
            Ok(tx_id) => {
                tracing::info!(
                    scan_id = %scan_id,
                    tx_id = %tx_id,
                    facets = payload.facets.len(),
                    "Public anchor submitted"
                );
                Ok(tx_id)
            }
            Err(e) if self.fallback => {
                tracing::warn!(
                    scan_id = %scan_id,
                    error = %e,
                    fallback = true,
                    "Public anchor submission failed, substituting simulated id"
                );
                self.simulator
                    .simulate(CARDANO, &payload)
                    .map_err(BuildError::public)
            }
            Err(e) => {
                tracing::error!(scan_id = %scan_id, error = %e, "Public anchor submission failed");
                Err(BuildError::public(e))
            }
        }
    }

    async fn submit(
        &self,
        client: &dyn ChainClient,
        wallet: &Wallet,
        metadata: &TxMetadata,
    ) -> Result<TxId, LedgerError> {
        let utxos = client.utxos(wallet.address()).await?;
        let params = client.protocol_params().await?;
        let tx = assemble_transaction(&utxos, &params, wallet, metadata, self.min_utxo)?;
        tracing::debug!(
            body_hash = %tx.body_hash,
            fee = tx.body.fee,
            inputs = tx.body.inputs.len(),
            "Submitting public anchor transaction"
        );
        client.submit(&tx).await
    }
}
