//! Error types for anchoring operations

use std::time::Duration;
use thiserror::Error;
use twin_core::{InvalidTxId, ValidationError};

/// Errors raised by a ledger client or backend
///
/// Messages carry endpoints, statuses and transaction ids only. Key material
/// and facet cleartext never reach this type.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Backend is not available or misconfigured
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Transport failure talking to the ledger
    #[error("Network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// Ledger answered with a non-success status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// JSON-RPC level error
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Ledger response could not be understood
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Wallet cannot cover fee plus minimum change
    #[error("Insufficient funds: need {required} lovelace, wallet holds {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Assembled transaction exceeds the protocol size limit
    #[error("Transaction too large: {size} bytes exceeds limit of {limit}")]
    TransactionTooLarge { size: u64, limit: u64 },

    /// Payload cannot be expressed as ledger metadata
    #[error("Metadata rejected: {0}")]
    Metadata(#[from] MetadataError),

    /// Facet sealing failed
    #[error("Sealing failed: {0}")]
    Sealing(#[from] SealingError),

    /// External call exceeded the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Ledger returned a malformed transaction id
    #[error(transparent)]
    InvalidTxId(#[from] InvalidTxId),
}

/// Reasons a payload is refused by the metadata encoder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// JSON value with no metadata representation (null, bool, float)
    #[error("unsupported value type: {0}")]
    UnsupportedValue(&'static str),

    /// Text longer than the per-string limit
    #[error("text of {len} bytes exceeds the {limit}-byte string limit")]
    TextTooLong { len: usize, limit: usize },

    /// Encoded metadata above the per-transaction limit
    #[error("encoded metadata is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Facet sealing and ticket-gated unsealing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealingError {
    #[error("encryption failed")]
    Encrypt,

    /// Ticket missing, rejected, or bound to another transaction
    #[error("reveal ticket does not authorize this transaction")]
    NotAuthorized,

    /// Ciphertext, nonce or associated data do not match
    #[error("sealed facet is corrupt or was sealed for another scan")]
    Corrupt,
}

/// Builder failures surfaced to the caller
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Public anchor failed: {source}")]
    PublicAnchorFailed {
        #[source]
        source: LedgerError,
    },

    #[error("Private anchor failed: {source}")]
    PrivateAnchorFailed {
        #[source]
        source: LedgerError,
    },
}

impl BuildError {
    pub fn public(source: impl Into<LedgerError>) -> Self {
        BuildError::PublicAnchorFailed {
            source: source.into(),
        }
    }

    pub fn private(source: impl Into<LedgerError>) -> Self {
        BuildError::PrivateAnchorFailed {
            source: source.into(),
        }
    }
}

/// Errors from the anchoring service as a whole
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value required by the selected strategy is absent
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    /// Secret could not be loaded or decoded (the secret itself is never included)
    #[error("Secret unavailable from {source_name}: {reason}")]
    Secret { source_name: String, reason: String },

    #[error("Client construction failed: {0}")]
    Client(String),
}

/// Root index write failures
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index unavailable: {0}")]
    Unavailable(String),
}
