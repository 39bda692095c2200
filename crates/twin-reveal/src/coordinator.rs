//! Controlled reveal coordinator
//!
//! State per request:
//!
//! ```text
//! submit(≥ quorum distinct approvers) ──► authorized ──reject──► rejected
//! submit(< quorum)                    ──► QuorumNotMet, nothing stored
//! ```
//!
//! Issued tickets are never mutated. [`RevealCoordinator::ticket`] reports a
//! ticket with its request's current status, so a later rejection revokes it.
//! The registry is bounded; once full, the oldest request and its ticket are
//! evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tokio::sync::RwLock;
use twin_core::{is_hex_digest, RevealState, RevealTicket, REVEAL_QUORUM};
use uuid::Uuid;

use crate::error::RevealError;

/// Maximum length of an approver, requester or reason string
pub const MAX_FIELD_LEN: usize = 256;

/// Maximum number of approvals one request may carry
pub const MAX_APPROVALS: usize = 16;

/// Default bound on stored requests
pub const DEFAULT_REVEAL_CAPACITY: usize = 10_000;

/// Request to decrypt one private anchor's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub private_tx_id: String,
    pub requester_id: String,
    /// Approver ids; duplicates count once
    pub approvals: Vec<String>,
    pub reason: String,
}

/// Stored state of a reveal request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRecord {
    pub request_id: Uuid,
    pub private_tx_id: String,
    pub requester_id: String,
    pub reason: String,
    pub approvals: BTreeSet<String>,
    pub status: RevealState,
    pub ticket: RevealTicket,
    pub created_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default)]
struct Registry {
    records: HashMap<Uuid, RevealRecord>,
    /// ticket id -> request id
    tickets: HashMap<Uuid, Uuid>,
    /// Request ids, oldest at the front
    order: VecDeque<Uuid>,
}

impl Registry {
    fn insert(&mut self, record: RevealRecord, capacity: usize) {
        let request_id = record.request_id;
        self.tickets.insert(record.ticket.ticket_id, request_id);
        self.records.insert(request_id, record);
        self.order.push_back(request_id);

        while self.records.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.records.remove(&oldest) {
                self.tickets.remove(&evicted.ticket.ticket_id);
                tracing::debug!(request_id = %oldest, "Evicted oldest reveal request");
            }
        }
    }
}

/// Quorum-gated reveal workflow
#[derive(Debug)]
pub struct RevealCoordinator {
    registry: RwLock<Registry>,
    capacity: usize,
}

impl Default for RevealCoordinator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REVEAL_CAPACITY)
    }
}

fn check_field(name: &str, value: &str) -> Result<(), RevealError> {
    if value.trim().is_empty() {
        return Err(RevealError::InvalidRequest(format!("{} must not be empty", name)));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(RevealError::InvalidRequest(format!(
            "{} must be at most {} bytes",
            name, MAX_FIELD_LEN
        )));
    }
    Ok(())
}

impl RevealCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinator holding at least one and at most `capacity` requests
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Open a reveal request.
    ///
    /// Authorized immediately when it carries at least [`REVEAL_QUORUM`]
    /// distinct approvers; rejected with `QuorumNotMet` otherwise. The
    /// requester never counts as their own approver.
    pub async fn submit(&self, request: RevealRequest) -> Result<RevealRecord, RevealError> {
        if !is_hex_digest(&request.private_tx_id) {
            return Err(RevealError::InvalidRequest(
                "private_tx_id must be 64 lowercase hex characters".to_string(),
            ));
        }
        check_field("requester_id", &request.requester_id)?;
        check_field("reason", &request.reason)?;
        if request.approvals.len() > MAX_APPROVALS {
            return Err(RevealError::InvalidRequest(format!(
                "at most {} approvals are accepted",
                MAX_APPROVALS
            )));
        }
        for approver in &request.approvals {
            check_field("approver_id", approver)?;
        }

        let requester = request.requester_id.trim();
        let approvals: BTreeSet<String> = request
            .approvals
            .iter()
            .map(|a| a.trim().to_string())
            .collect();
        if approvals.contains(requester) {
            tracing::warn!(tx_id = %request.private_tx_id, "Reveal request refused: self-approval");
            return Err(RevealError::SelfApproval);
        }
        if approvals.len() < REVEAL_QUORUM {
            tracing::warn!(
                tx_id = %request.private_tx_id,
                distinct = approvals.len(),
                "Reveal request refused: quorum not met"
            );
            return Err(RevealError::QuorumNotMet {
                distinct: approvals.len(),
            });
        }

        let now = Utc::now();
        let request_id = Uuid::new_v4();
        let ticket = RevealTicket {
            ticket_id: Uuid::new_v4(),
            request_id,
            private_tx_id: request.private_tx_id.clone(),
            requester_id: requester.to_string(),
            status: RevealState::Authorized,
            issued_at: now,
        };
        let record = RevealRecord {
            request_id,
            private_tx_id: request.private_tx_id,
            requester_id: requester.to_string(),
            reason: request.reason,
            approvals,
            status: RevealState::Authorized,
            ticket,
            created_at: now,
            rejection_reason: None,
        };

        self.registry
            .write()
            .await
            .insert(record.clone(), self.capacity);

        tracing::info!(
            request_id = %request_id,
            ticket_id = %record.ticket.ticket_id,
            tx_id = %record.private_tx_id,
            approvals = record.approvals.len(),
            "Reveal authorized"
        );
        Ok(record)
    }

    /// Governance rejection; revokes any issued ticket
    pub async fn reject(&self, request_id: &Uuid, reason: &str) -> Result<RevealRecord, RevealError> {
        check_field("reason", reason)?;

        let mut registry = self.registry.write().await;
        let record = registry
            .records
            .get_mut(request_id)
            .ok_or(RevealError::NotFound(*request_id))?;

        if record.status == RevealState::Rejected {
            return Err(RevealError::AlreadyFinal(*request_id));
        }
        record.status = RevealState::Rejected;
        record.rejection_reason = Some(reason.to_string());

        tracing::warn!(
            request_id = %request_id,
            tx_id = %record.private_tx_id,
            "Reveal request rejected"
        );
        Ok(record.clone())
    }

    pub async fn get(&self, request_id: &Uuid) -> Result<RevealRecord, RevealError> {
        self.registry
            .read()
            .await
            .records
            .get(request_id)
            .cloned()
            .ok_or(RevealError::NotFound(*request_id))
    }

    /// Ticket with its request's current status
    pub async fn ticket(&self, ticket_id: &Uuid) -> Option<RevealTicket> {
        let registry = self.registry.read().await;
        let request_id = registry.tickets.get(ticket_id)?;
        let record = registry.records.get(request_id)?;
        let mut ticket = record.ticket.clone();
        ticket.status = record.status;
        Some(ticket)
    }

    /// All stored requests for one private transaction, oldest first
    pub async fn for_transaction(&self, private_tx_id: &str) -> Vec<RevealRecord> {
        let registry = self.registry.read().await;
        let mut found: Vec<RevealRecord> = registry
            .records
            .values()
            .filter(|r| r.private_tx_id == private_tx_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        found
    }
}
