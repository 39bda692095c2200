//! Public ledger chain client
//!
//! [`ChainClient`] is the boundary to the chain query/submission service:
//! UTXO lookup, protocol parameters, submission and transaction lookup.
//! [`HttpChainClient`] speaks the Blockfrost-shaped REST gateway API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use twin_core::TxId;

use crate::backend::{LedgerQuery, CARDANO};
use crate::error::LedgerError;

/// A spendable output held by the wallet address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_hash: String,
    pub output_index: u32,
    pub lovelace: u64,
}

/// Fee-relevant protocol parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Fee per byte
    pub min_fee_a: u64,
    /// Constant fee
    pub min_fee_b: u64,
    pub max_tx_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_hash: String,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub lovelace: u64,
}

/// Unsigned transaction body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    /// Detailed-schema metadata keyed by label
    pub metadata: serde_json::Value,
}

/// Ed25519 witness over the body hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkeyWitness {
    pub vkey: String,
    pub signature: String,
}

/// Transaction ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub body: TxBody,
    pub body_hash: String,
    pub witnesses: Vec<VkeyWitness>,
}

/// One labelled metadata entry as returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: String,
    pub json_metadata: serde_json::Value,
}

/// Query and submission boundary for the public ledger
#[async_trait]
pub trait ChainClient: LedgerQuery {
    /// Spendable outputs at `address` (empty when the address is unused)
    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, LedgerError>;

    /// Current fee parameters
    async fn protocol_params(&self) -> Result<ProtocolParams, LedgerError>;

    /// Submit a signed transaction. Exactly one network submission.
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, LedgerError>;

    /// Metadata attached to a settled transaction
    async fn tx_metadata(&self, tx_id: &TxId) -> Result<Vec<MetadataEntry>, LedgerError>;
}

#[derive(Deserialize)]
struct GatewayAmount {
    unit: String,
    quantity: String,
}

#[derive(Deserialize)]
struct GatewayUtxo {
    tx_hash: String,
    output_index: u32,
    amount: Vec<GatewayAmount>,
}

#[derive(Deserialize)]
struct GatewayParams {
    min_fee_a: u64,
    min_fee_b: u64,
    max_tx_size: u64,
}

#[derive(Deserialize)]
struct GatewayTx {
    block_height: Option<u64>,
}

#[derive(Deserialize)]
struct GatewayBlock {
    height: Option<u64>,
}

#[derive(Deserialize)]
struct GatewayHealth {
    is_healthy: bool,
}

/// HTTP client for a Blockfrost-shaped chain gateway
///
/// Authenticates with a `project_id` header when one is configured.
#[derive(Debug, Clone)]
pub struct HttpChainClient {
    base_url: String,
    project_id: Option<String>,
    client: reqwest::Client,
}

impl HttpChainClient {
    /// Create a new gateway client with a per-call timeout
    pub fn new(
        base_url: impl Into<String>,
        project_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("twin-anchor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match self.project_id {
            Some(ref id) => req.header("project_id", id),
            None => req,
        }
    }

    /// GET a JSON document; `Ok(None)` on 404
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, LedgerError> {
        let resp = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| network(path, e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| LedgerError::InvalidResponse {
                endpoint: path.to_string(),
                message: e.to_string(),
            })
    }

    async fn latest_height(&self) -> Result<u64, LedgerError> {
        let path = "/blocks/latest";
        let missing = || LedgerError::InvalidResponse {
            endpoint: path.to_string(),
            message: "missing block height".to_string(),
        };
        let block: GatewayBlock = self.get_json(path).await?.ok_or_else(missing)?;
        block.height.ok_or_else(missing)
    }
}

fn network(endpoint: &str, e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        return LedgerError::Network {
            endpoint: endpoint.to_string(),
            message: "request timed out".to_string(),
        };
    }
    LedgerError::Network {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl LedgerQuery for HttpChainClient {
    fn name(&self) -> &str {
        CARDANO
    }

    async fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, LedgerError> {
        let path = format!("/txs/{}", tx_id);
        let Some(tx) = self.get_json::<GatewayTx>(&path).await? else {
            return Ok(None);
        };
        let Some(height) = tx.block_height else {
            // Known to the mempool, not yet in a block
            return Ok(Some(0));
        };
        let tip = self.latest_height().await?;
        Ok(Some(tip.saturating_sub(height) + 1))
    }

    async fn is_healthy(&self) -> bool {
        matches!(
            self.get_json::<GatewayHealth>("/health").await,
            Ok(Some(GatewayHealth { is_healthy: true }))
        )
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, LedgerError> {
        let path = format!("/addresses/{}/utxos", address);
        let raw: Vec<GatewayUtxo> = self.get_json(&path).await?.unwrap_or_default();

        raw.into_iter()
            .map(|u| {
                let lovelace = u
                    .amount
                    .iter()
                    .find(|a| a.unit == "lovelace")
                    .map(|a| a.quantity.parse::<u64>())
                    .transpose()
                    .map_err(|e| LedgerError::InvalidResponse {
                        endpoint: path.clone(),
                        message: format!("bad lovelace quantity: {}", e),
                    })?
                    .unwrap_or(0);
                Ok(Utxo {
                    tx_hash: u.tx_hash,
                    output_index: u.output_index,
                    lovelace,
                })
            })
            .collect()
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, LedgerError> {
        let path = "/epochs/latest/parameters";
        let p: GatewayParams = self.get_json(path).await?.ok_or_else(|| {
            LedgerError::InvalidResponse {
                endpoint: path.to_string(),
                message: "parameters not found".to_string(),
            }
        })?;
        Ok(ProtocolParams {
            min_fee_a: p.min_fee_a,
            min_fee_b: p.min_fee_b,
            max_tx_size: p.max_tx_size,
        })
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxId, LedgerError> {
        let path = "/tx/submit";
        let resp = self
            .request(reqwest::Method::POST, path)
            .json(tx)
            .send()
            .await
            .map_err(|e| network(path, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let hash: String = resp.json().await.map_err(|e| LedgerError::InvalidResponse {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(TxId::parse(hash)?)
    }

    async fn tx_metadata(&self, tx_id: &TxId) -> Result<Vec<MetadataEntry>, LedgerError> {
        let path = format!("/txs/{}/metadata", tx_id);
        self.get_json::<Vec<MetadataEntry>>(&path)
            .await?
            .ok_or_else(|| LedgerError::BackendUnavailable(format!("transaction {} not found", tx_id)))
    }
}
