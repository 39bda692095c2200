//! Reveal ticket types shared by the coordinator and payload unsealing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum number of distinct approvers before a reveal is authorized.
///
/// Fixed; not configurable per call.
pub const REVEAL_QUORUM: usize = 2;

/// Lifecycle state of a stored reveal request.
///
/// Under-quorum requests are refused before they are stored, so a stored
/// request starts out authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealState {
    /// Quorum reached, ticket issued
    Authorized,
    /// Rejected by governance; accepts nothing further
    Rejected,
}

/// Opaque authorization to decrypt one private anchor's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealTicket {
    pub ticket_id: Uuid,
    pub request_id: Uuid,
    pub private_tx_id: String,
    pub requester_id: String,
    pub status: RevealState,
    pub issued_at: DateTime<Utc>,
}

impl RevealTicket {
    /// True if this ticket currently permits decrypting `private_tx_id`
    pub fn authorizes(&self, private_tx_id: &str) -> bool {
        self.status == RevealState::Authorized && self.private_tx_id == private_tx_id
    }
}
