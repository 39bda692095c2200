//! Shielded ledger backends
//!
//! [`ShieldedBackend`] is the submission capability of the privacy ledger.
//! [`RealShieldedBackend`] talks JSON-RPC to a node; the simulated variant
//! lives in [`crate::simulator`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use twin_core::TxId;
use zeroize::Zeroizing;

use crate::backend::{LedgerQuery, MIDNIGHT};
use crate::error::LedgerError;
use crate::private::PrivateAnchorPayload;

/// Submission side of the shielded ledger
#[async_trait]
pub trait ShieldedBackend: LedgerQuery {
    /// Submit one sealed payload, returning its transaction id
    async fn submit_shielded(&self, payload: &PrivateAnchorPayload) -> Result<TxId, LedgerError>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'a str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ShieldedTxStatus {
    confirmations: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeHealth {
    is_syncing: bool,
    #[serde(default)]
    peers: u64,
}

/// JSON-RPC client for a shielded ledger node
///
/// Methods used: `shielded_submitTransaction`, `shielded_getTransaction`,
/// `system_health`.
pub struct RealShieldedBackend {
    node_url: String,
    auth_token: Option<Zeroizing<String>>,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RealShieldedBackend {
    pub fn new(
        node_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("twin-anchor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            node_url: node_url.into(),
            auth_token: auth_token.map(Zeroizing::new),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<P: Serialize + Send + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<T>, LedgerError> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let mut http = self.client.post(&self.node_url).json(&req);
        if let Some(ref token) = self.auth_token {
            http = http.bearer_auth(token.as_str());
        }

        let network = |e: reqwest::Error| LedgerError::Network {
            endpoint: method.to_string(),
            message: e.to_string(),
        };
        let resp = http.send().await.map_err(network)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Api {
                endpoint: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(network)?;
        let resp: JsonRpcResponse<T> =
            serde_json::from_slice(&bytes).map_err(|e| LedgerError::InvalidResponse {
                endpoint: method.to_string(),
                message: e.to_string(),
            })?;

        if let Some(err) = resp.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(resp.result)
    }
}

impl fmt::Debug for RealShieldedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealShieldedBackend")
            .field("node_url", &self.node_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl LedgerQuery for RealShieldedBackend {
    fn name(&self) -> &str {
        MIDNIGHT
    }

    async fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, LedgerError> {
        let status: Option<ShieldedTxStatus> = self
            .call("shielded_getTransaction", [tx_id.as_str()])
            .await?;
        Ok(status.map(|s| s.confirmations))
    }

    async fn is_healthy(&self) -> bool {
        match self
            .call::<_, NodeHealth>("system_health", serde_json::json!([]))
            .await
        {
            Ok(Some(health)) => {
                tracing::trace!(peers = health.peers, syncing = health.is_syncing, "Node health");
                !health.is_syncing
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ShieldedBackend for RealShieldedBackend {
    async fn submit_shielded(&self, payload: &PrivateAnchorPayload) -> Result<TxId, LedgerError> {
        let method = "shielded_submitTransaction";
        let tx_id: String = self
            .call(method, [payload])
            .await?
            .ok_or_else(|| LedgerError::InvalidResponse {
                endpoint: method.to_string(),
                message: "missing transaction id".to_string(),
            })?;
        Ok(TxId::parse(tx_id)?)
    }
}
