//! # Twin Reveal
//!
//! Dual-approval workflow gating decryption of shielded anchor payloads.
//!
//! A [`RevealRequest`] names one private transaction and carries its
//! approvers. At least [`twin_core::REVEAL_QUORUM`] distinct approvers
//! authorize it and issue a [`twin_core::RevealTicket`]; anything less is
//! refused outright. Governance may later reject a request, which revokes
//! its ticket.

mod coordinator;
mod error;

pub use coordinator::{
    RevealCoordinator, RevealRecord, RevealRequest, DEFAULT_REVEAL_CAPACITY, MAX_APPROVALS,
    MAX_FIELD_LEN,
};
pub use error::RevealError;
