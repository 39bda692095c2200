//! Fallback simulator
//!
//! Deterministic substitute for a ledger submission, used only when a backend
//! is disabled or fails with fallback enabled. Produces ids shaped like real
//! transaction ids that no ledger will ever confirm:
//!
//! ```text
//! tx_id = hex(SHA-256("{ledger}:{json(payload)}:{submission_time}"))
//! ```
//!
//! `submission_time` is the clock's instant in RFC 3339 with milliseconds.

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Serialize;
use std::sync::Arc;
use twin_core::{Sha256Hash, TxId};

use crate::backend::LedgerQuery;
use crate::clock::{Clock, MonotonicClock};
use crate::error::LedgerError;
use crate::private::PrivateAnchorPayload;
use crate::shielded::ShieldedBackend;

/// Produces simulated transaction ids from a payload and the current time
#[derive(Debug, Clone)]
pub struct FallbackSimulator {
    clock: Arc<dyn Clock>,
}

impl FallbackSimulator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Simulator driven by a process-wide monotonic clock
    pub fn system() -> Self {
        Self::new(Arc::new(MonotonicClock::new()))
    }

    /// Derive a simulated id for `payload` on `ledger`
    pub fn simulate<T: Serialize + ?Sized>(
        &self,
        ledger: &str,
        payload: &T,
    ) -> Result<TxId, LedgerError> {
        let json = serde_json::to_string(payload)?;
        let at = self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let digest = Sha256Hash::digest(format!("{}:{}:{}", ledger, json, at).as_bytes());
        let tx_id = TxId::parse(digest.to_hex())?;

        tracing::warn!(
            ledger = %ledger,
            tx_id = %tx_id,
            fallback = true,
            "Issued simulated transaction id; nothing was settled"
        );
        Ok(tx_id)
    }
}

/// Simulated ledger backend
///
/// Accepts submissions through the [`FallbackSimulator`] and reports every
/// transaction as unknown, so simulated anchors never verify.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    ledger: String,
    simulator: FallbackSimulator,
}

impl SimulatedBackend {
    pub fn new(ledger: impl Into<String>, simulator: FallbackSimulator) -> Self {
        Self {
            ledger: ledger.into(),
            simulator,
        }
    }

    pub fn simulator(&self) -> &FallbackSimulator {
        &self.simulator
    }
}

#[async_trait]
impl LedgerQuery for SimulatedBackend {
    fn name(&self) -> &str {
        &self.ledger
    }

    async fn confirmations(&self, _tx_id: &TxId) -> Result<Option<u64>, LedgerError> {
        Ok(None)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[async_trait]
impl ShieldedBackend for SimulatedBackend {
    async fn submit_shielded(&self, payload: &PrivateAnchorPayload) -> Result<TxId, LedgerError> {
        self.simulator.simulate(&self.ledger, payload)
    }
}
