//! Core query trait shared by every ledger backend

use async_trait::async_trait;
use twin_core::TxId;

use crate::error::LedgerError;

/// Name of the public ledger
pub const CARDANO: &str = "cardano";

/// Name of the shielded ledger
pub const MIDNIGHT: &str = "midnight";

/// Read side of a ledger backend
///
/// Implementations should be:
/// - Side-effect free (queries never submit)
/// - Bounded by the client's configured timeout
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    /// Human-readable ledger name, also used as the simulator domain
    fn name(&self) -> &str;

    /// Confirmation depth of a transaction.
    ///
    /// `Ok(None)` when the ledger does not know the transaction.
    async fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, LedgerError>;

    /// Check if the backend is reachable and healthy
    async fn is_healthy(&self) -> bool;
}
