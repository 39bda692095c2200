//! Application State
//!
//! Centralizes access to the anchoring service, verifier, reveal workflow
//! and authentication.

use std::sync::Arc;
use twin_anchor::{AnchorService, AnchorVerifier, LedgerHandles, PayloadSealer};
use twin_reveal::RevealCoordinator;

use crate::auth::JwtAuth;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    service: AnchorService,
    verifier: AnchorVerifier,
    reveals: Arc<RevealCoordinator>,
    sealer: PayloadSealer,
    jwt_auth: JwtAuth,
}

impl AppState {
    pub fn new(
        service: AnchorService,
        verifier: AnchorVerifier,
        reveals: Arc<RevealCoordinator>,
        sealer: PayloadSealer,
        jwt_auth: JwtAuth,
    ) -> Self {
        Self {
            service,
            verifier,
            reveals,
            sealer,
            jwt_auth,
        }
    }

    /// Wire handlers to ledger handles resolved at startup
    pub fn from_handles(handles: &LedgerHandles, jwt_auth: JwtAuth, max_reveals: usize) -> Self {
        Self::new(
            handles.service(),
            handles.verifier(),
            Arc::new(RevealCoordinator::with_capacity(max_reveals)),
            handles.private_builder.sealer().clone(),
            jwt_auth,
        )
    }

    pub fn service(&self) -> &AnchorService {
        &self.service
    }

    pub fn verifier(&self) -> &AnchorVerifier {
        &self.verifier
    }

    /// Reveal coordinator (cloned Arc for sharing)
    pub fn reveals(&self) -> Arc<RevealCoordinator> {
        self.reveals.clone()
    }

    /// Sealer holding the key private facets were sealed with
    pub fn sealer(&self) -> &PayloadSealer {
        &self.sealer
    }

    pub fn jwt_auth(&self) -> &JwtAuth {
        &self.jwt_auth
    }
}
