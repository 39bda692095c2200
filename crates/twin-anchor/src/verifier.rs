//! Anchor verification
//!
//! Every check answers `bool`. Unknown, malformed, unconfirmed and
//! unreachable all read as "not verified"; the reason is logged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use twin_core::{is_hex_digest, link_hex, TxId};
use uuid::Uuid;

use crate::backend::LedgerQuery;
use crate::error::IndexError;
use crate::index::{AnchorRecord, RootIndex};

/// Reachability of one ledger backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub ledger: String,
    pub healthy: bool,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHealth {
    pub public: BackendHealth,
    pub private: BackendHealth,
}

impl LedgerHealth {
    pub fn all_healthy(&self) -> bool {
        self.public.healthy && self.private.healthy
    }
}

/// Confirms anchors on both ledgers
#[derive(Clone)]
pub struct AnchorVerifier {
    public: Arc<dyn LedgerQuery>,
    private: Arc<dyn LedgerQuery>,
    index: Arc<dyn RootIndex>,
    min_confirmations: u64,
    call_timeout: Duration,
}

impl AnchorVerifier {
    pub fn new(
        public: Arc<dyn LedgerQuery>,
        private: Arc<dyn LedgerQuery>,
        index: Arc<dyn RootIndex>,
    ) -> Self {
        Self {
            public,
            private,
            index,
            min_confirmations: 1,
            call_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_min_confirmations(mut self, depth: u64) -> Self {
        self.min_confirmations = depth;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn min_confirmations(&self) -> u64 {
        self.min_confirmations
    }

    /// Public anchor is at least `min_confirmations` deep
    pub async fn verify_public(&self, tx_id: &str) -> bool {
        self.confirmed(self.public.as_ref(), tx_id).await
    }

    /// Private anchor is at least `min_confirmations` deep
    pub async fn verify_private(&self, tx_id: &str) -> bool {
        self.confirmed(self.private.as_ref(), tx_id).await
    }

    async fn confirmed(&self, backend: &dyn LedgerQuery, tx_id: &str) -> bool {
        let Ok(tx) = TxId::parse(tx_id) else {
            tracing::debug!(ledger = backend.name(), "Malformed transaction id");
            return false;
        };

        match tokio::time::timeout(self.call_timeout, backend.confirmations(&tx)).await {
            Ok(Ok(Some(depth))) => {
                tracing::debug!(ledger = backend.name(), tx_id = %tx, depth, "Confirmation depth");
                depth >= self.min_confirmations
            }
            Ok(Ok(None)) => false,
            Ok(Err(e)) => {
                tracing::warn!(ledger = backend.name(), tx_id = %tx, error = %e, "Confirmation query failed");
                false
            }
            Err(_) => {
                tracing::warn!(ledger = backend.name(), tx_id = %tx, "Confirmation query timed out");
                false
            }
        }
    }

    /// Consistency of a cross-ledger root.
    ///
    /// Both ledgers must be healthy. If the root was recorded by this
    /// deployment it must also re-derive from its recorded triple.
    pub async fn verify_cross_ledger(&self, root: &str) -> bool {
        if !is_hex_digest(root) {
            return false;
        }

        let health = self.health().await;
        if !health.all_healthy() {
            tracing::warn!(
                public = health.public.healthy,
                private = health.private.healthy,
                "Cross-ledger check failed: backend unhealthy"
            );
            return false;
        }

        match self.index.lookup(root).await {
            Ok(Some(record)) => {
                let derived = link_hex(&record.public_tx_id, &record.private_tx_id, &record.scan_id);
                if derived != root {
                    tracing::warn!(root = %root, derived = %derived, "Recorded anchor does not match root");
                }
                derived == root
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "Root index unavailable, health check only");
                true
            }
        }
    }

    /// Anchors recorded for one scan, oldest first
    pub async fn anchors_for_scan(&self, scan_id: &Uuid) -> Result<Vec<AnchorRecord>, IndexError> {
        self.index.for_scan(scan_id).await
    }

    /// Check both backends concurrently
    pub async fn health(&self) -> LedgerHealth {
        let (public, private) = tokio::join!(
            self.check_backend(self.public.as_ref()),
            self.check_backend(self.private.as_ref())
        );
        LedgerHealth { public, private }
    }

    async fn check_backend(&self, backend: &dyn LedgerQuery) -> BackendHealth {
        let start = Instant::now();
        let healthy = tokio::time::timeout(self.call_timeout, backend.is_healthy())
            .await
            .unwrap_or(false);
        BackendHealth {
            ledger: backend.name().to_string(),
            healthy,
            latency_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for AnchorVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorVerifier")
            .field("public", &self.public.name())
            .field("private", &self.private.name())
            .field("index", &self.index.name())
            .field("min_confirmations", &self.min_confirmations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::index::MemoryRootIndex;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    struct StaticLedger {
        name: &'static str,
        healthy: bool,
        depths: HashMap<String, u64>,
        broken: bool,
    }

    impl StaticLedger {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                healthy: true,
                depths: HashMap::new(),
                broken: false,
            }
        }

        fn with_tx(mut self, tx: &str, depth: u64) -> Self {
            self.depths.insert(tx.to_string(), depth);
            self
        }
    }

    #[async_trait]
    impl LedgerQuery for StaticLedger {
        fn name(&self) -> &str {
            self.name
        }

        async fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, LedgerError> {
            if self.broken {
                return Err(LedgerError::BackendUnavailable("down".into()));
            }
            Ok(self.depths.get(tx_id.as_str()).copied())
        }

        async fn is_healthy(&self) -> bool {
            self.healthy
        }
    }

    fn verifier(public: StaticLedger, private: StaticLedger) -> (AnchorVerifier, Arc<MemoryRootIndex>) {
        let index = Arc::new(MemoryRootIndex::new());
        let v = AnchorVerifier::new(Arc::new(public), Arc::new(private), index.clone());
        (v, index)
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_false() {
        let (v, _) = verifier(StaticLedger::new("cardano"), StaticLedger::new("midnight"));
        assert!(!v.verify_public(&"a".repeat(64)).await);
        assert!(!v.verify_private(&"a".repeat(64)).await);
        assert!(!v.verify_public("not-a-tx").await);
        assert!(!v.verify_public(&"A".repeat(64)).await);
    }

    #[tokio::test]
    async fn test_confirmation_threshold() {
        let tx = "a".repeat(64);
        let (v, _) = verifier(
            StaticLedger::new("cardano").with_tx(&tx, 2),
            StaticLedger::new("midnight").with_tx(&tx, 0),
        );
        assert!(v.verify_public(&tx).await);
        assert!(!v.verify_private(&tx).await);

        let strict = v.with_min_confirmations(3);
        assert!(!strict.verify_public(&tx).await);
    }

    #[tokio::test]
    async fn test_query_failure_is_false() {
        let tx = "a".repeat(64);
        let mut broken = StaticLedger::new("cardano").with_tx(&tx, 9);
        broken.broken = true;
        let (v, _) = verifier(broken, StaticLedger::new("midnight"));
        assert!(!v.verify_public(&tx).await);
    }

    #[tokio::test]
    async fn test_cross_ledger_unknown_root_uses_health() {
        let root = "c".repeat(64);
        let (v, _) = verifier(StaticLedger::new("cardano"), StaticLedger::new("midnight"));
        assert!(v.verify_cross_ledger(&root).await);

        let mut down = StaticLedger::new("midnight");
        down.healthy = false;
        let (v, _) = verifier(StaticLedger::new("cardano"), down);
        assert!(!v.verify_cross_ledger(&root).await);
        assert!(!v.verify_cross_ledger("short").await);
    }

    #[tokio::test]
    async fn test_cross_ledger_recorded_root_must_rederive() {
        let (v, index) = verifier(StaticLedger::new("cardano"), StaticLedger::new("midnight"));
        let scan = Uuid::new_v4();
        let (p, q) = ("a".repeat(64), "b".repeat(64));
        let root = link_hex(&p, &q, &scan);
        index
            .record(AnchorRecord {
                scan_id: scan,
                public_tx_id: p.clone(),
                private_tx_id: q.clone(),
                cross_ledger_root: root.clone(),
                anchored_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(v.verify_cross_ledger(&root).await);

        // A record filed under a root its triple does not produce
        let forged = "d".repeat(64);
        index
            .record(AnchorRecord {
                scan_id: scan,
                public_tx_id: p,
                private_tx_id: q,
                cross_ledger_root: forged.clone(),
                anchored_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(!v.verify_cross_ledger(&forged).await);

        let history = v.anchors_for_scan(&scan).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(v.anchors_for_scan(&Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_each_ledger() {
        let mut down = StaticLedger::new("midnight");
        down.healthy = false;
        let (v, _) = verifier(StaticLedger::new("cardano"), down);
        let h = v.health().await;
        assert_eq!(h.public.ledger, "cardano");
        assert!(h.public.healthy);
        assert!(!h.private.healthy);
        assert!(!h.all_healthy());
    }
}
