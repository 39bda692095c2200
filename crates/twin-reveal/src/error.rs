//! Reveal workflow errors

use thiserror::Error;
use twin_core::REVEAL_QUORUM;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealError {
    /// Fewer distinct approvers than the quorum; nothing was stored
    #[error("Quorum not met: {distinct} distinct approver(s), {} required", REVEAL_QUORUM)]
    QuorumNotMet { distinct: usize },

    #[error("Reveal request {0} not found")]
    NotFound(Uuid),

    /// Requester listed among the approvers
    #[error("A requester cannot approve their own reveal")]
    SelfApproval,

    #[error("Reveal request {0} is already final")]
    AlreadyFinal(Uuid),

    #[error("Invalid reveal request: {0}")]
    InvalidRequest(String),
}
