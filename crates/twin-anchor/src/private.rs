//! Private ledger shielded transaction builder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use twin_core::{first_of, Facet, FacetKind, Scope, TxId};
use uuid::Uuid;

use crate::backend::MIDNIGHT;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{BuildError, LedgerError};
use crate::sealing::{PayloadSealer, SealedFacet};
use crate::shielded::ShieldedBackend;
use crate::simulator::FallbackSimulator;

/// Protocol tag carried by every shielded anchor
pub const PRIVATE_PROTOCOL: &str = "twin-anchor/shielded-v1";

pub const PAYLOAD_VERSION: u32 = 1;

/// Disclosure context recorded in the clear next to the sealed facets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSnapshot {
    /// Distinct private facet types considered, in input order
    pub facet_types_shown: Vec<String>,
    pub policy_version: String,
    pub timestamp: DateTime<Utc>,
}

impl ConsentSnapshot {
    pub fn new(facets: &[Facet], policy_version: &str, timestamp: DateTime<Utc>) -> Self {
        let mut shown: Vec<String> = Vec::new();
        for facet in facets {
            if !shown.contains(&facet.facet_type) {
                shown.push(facet.facet_type.clone());
            }
        }
        Self {
            facet_types_shown: shown,
            policy_version: policy_version.to_string(),
            timestamp,
        }
    }
}

/// Document submitted to the shielded ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateAnchorPayload {
    pub protocol: String,
    pub version: u32,
    pub scan_id: String,
    pub garment_id: String,
    pub scope: Scope,
    pub ownership: Option<SealedFacet>,
    pub pricing: Option<SealedFacet>,
    pub consent: ConsentSnapshot,
}

/// Builds and submits shielded anchors
#[derive(Clone)]
pub struct PrivateAnchorBuilder {
    backend: Arc<dyn ShieldedBackend>,
    sealer: PayloadSealer,
    simulator: FallbackSimulator,
    clock: Arc<dyn Clock>,
    fallback: bool,
    call_timeout: Duration,
}

impl std::fmt::Debug for PrivateAnchorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateAnchorBuilder")
            .field("backend", &self.backend.name())
            .field("fallback", &self.fallback)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl PrivateAnchorBuilder {
    pub fn new(
        backend: Arc<dyn ShieldedBackend>,
        sealer: PayloadSealer,
        simulator: FallbackSimulator,
    ) -> Self {
        Self {
            backend,
            sealer,
            simulator,
            clock: Arc::new(MonotonicClock::new()),
            fallback: false,
            call_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
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

    pub fn sealer(&self) -> &PayloadSealer {
        &self.sealer
    }

    /// Seal the first ownership and pricing facets and attach consent
    pub fn payload(
        &self,
        scan_id: &Uuid,
        garment_id: &Uuid,
        scope: Scope,
        facets: &[Facet],
        policy_version: &str,
    ) -> Result<PrivateAnchorPayload, LedgerError> {
        let seal = |kind| {
            first_of(facets, kind)
                .map(|f| self.sealer.seal(scan_id, f))
                .transpose()
        };

        Ok(PrivateAnchorPayload {
            protocol: PRIVATE_PROTOCOL.to_string(),
            version: PAYLOAD_VERSION,
            scan_id: scan_id.to_string(),
            garment_id: garment_id.to_string(),
            scope,
            ownership: seal(FacetKind::Ownership)?,
            pricing: seal(FacetKind::Pricing)?,
            consent: ConsentSnapshot::new(facets, policy_version, self.clock.now()),
        })
    }

    /// Anchor the private facets of a scan
    pub async fn build_private_anchor(
        &self,
        scan_id: &Uuid,
        garment_id: &Uuid,
        scope: Scope,
        facets: &[Facet],
        policy_version: &str,
    ) -> Result<TxId, BuildError> {
        let payload = self
            .payload(scan_id, garment_id, scope, facets, policy_version)
            .map_err(BuildError::private)?;

        let attempt = tokio::time::timeout(self.call_timeout, self.backend.submit_shielded(&payload))
            .await
            .unwrap_or(Err(LedgerError::Timeout(self.call_timeout)));

        match attempt {
            Ok(tx_id) => {
                tracing::info!(
                    scan_id = %scan_id,
                    tx_id = %tx_id,
                    backend = %self.backend.name(),
                    sealed = payload.ownership.is_some() as u8 + payload.pricing.is_some() as u8,
                    "Private anchor submitted"
                );
                Ok(tx_id)
            }
            Err(e) if self.fallback => {
                tracing::warn!(
                    scan_id = %scan_id,
                    error = %e,
                    fallback = true,
                    "Private anchor submission failed, substituting simulated id"
                );
                self.simulator
                    .simulate(MIDNIGHT, &payload)
                    .map_err(BuildError::private)
            }
            Err(e) => {
                tracing::error!(scan_id = %scan_id, error = %e, "Private anchor submission failed");
                Err(BuildError::private(e))
            }
        }
    }
}
