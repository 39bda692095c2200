//! Dual-ledger anchoring orchestration

use chrono::Utc;
use std::sync::Arc;
use twin_core::{classify, link_hex, AnchorRequest, AnchorResult};

use crate::error::AnchorError;
use crate::index::{AnchorRecord, RootIndex};
use crate::private::PrivateAnchorBuilder;
use crate::public::PublicAnchorBuilder;

/// Classify, anchor on both ledgers concurrently, link, record
#[derive(Clone)]
pub struct AnchorService {
    public: PublicAnchorBuilder,
    private: PrivateAnchorBuilder,
    index: Arc<dyn RootIndex>,
}

impl AnchorService {
    pub fn new(
        public: PublicAnchorBuilder,
        private: PrivateAnchorBuilder,
        index: Arc<dyn RootIndex>,
    ) -> Self {
        Self {
            public,
            private,
            index,
        }
    }

    pub fn private_builder(&self) -> &PrivateAnchorBuilder {
        &self.private
    }

    /// Anchor one scan.
    ///
    /// Not retried and not deduplicated. When one ledger fails after the
    /// other accepted its transaction, the accepted id is logged and the
    /// failure returned; nothing is rolled back.
    pub async fn anchor(&self, request: &AnchorRequest) -> Result<AnchorResult, AnchorError> {
        request.validate()?;

        let classified = classify(&request.facets);
        if classified.dropped > 0 {
            tracing::debug!(
                scan_id = %request.scan_id,
                dropped = classified.dropped,
                "Ignoring facets of unknown type"
            );
        }

        let (public, private) = tokio::join!(
            self.public.build_public_anchor(
                &request.scan_id,
                &request.garment_id,
                request.scope,
                &classified.public,
                &request.policy_version,
            ),
            self.private.build_private_anchor(
                &request.scan_id,
                &request.garment_id,
                request.scope,
                &classified.private,
                &request.policy_version,
            )
        );

        let (public_tx_id, private_tx_id) = match (public, private) {
            (Ok(p), Ok(q)) => (p, q),
            (Ok(p), Err(e)) => {
                tracing::warn!(scan_id = %request.scan_id, orphaned_tx_id = %p, "Public anchor left without a private counterpart");
                return Err(e.into());
            }
            (Err(e), Ok(q)) => {
                tracing::warn!(scan_id = %request.scan_id, orphaned_tx_id = %q, "Private anchor left without a public counterpart");
                return Err(e.into());
            }
            (Err(e), Err(other)) => {
                tracing::error!(scan_id = %request.scan_id, error = %other, "Private anchor also failed");
                return Err(AnchorError::Build(e));
            }
        };

        let root = link_hex(public_tx_id.as_str(), private_tx_id.as_str(), &request.scan_id);
        let record = AnchorRecord {
            scan_id: request.scan_id,
            public_tx_id: public_tx_id.to_string(),
            private_tx_id: private_tx_id.to_string(),
            cross_ledger_root: root.clone(),
            anchored_at: Utc::now(),
        };
        if let Err(e) = self.index.record(record).await {
            tracing::warn!(root = %root, error = %e, "Anchor not recorded in root index");
        }

        tracing::info!(
            scan_id = %request.scan_id,
            public_tx_id = %public_tx_id,
            private_tx_id = %private_tx_id,
            root = %root,
            "Scan anchored"
        );

        Ok(AnchorResult {
            public_tx_id,
            private_tx_id,
            cross_ledger_root: root,
        })
    }
}
