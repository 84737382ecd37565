//! Withdrawal records and their two independent status machines.
//!
//! A withdrawal carries **two** statuses that advance on separate tracks:
//!
//! ```text
//!  review (administrative)          transfer (gateway-driven)
//!
//!   ┌─────────┐                       ┌────────────┐
//!   │ PENDING │                       │ PROCESSING │
//!   └──┬───┬──┘                       └──┬──────┬──┘
//!      │   │                             │      │
//!      ▼   ▼                             ▼      ▼
//! ┌────────┐ ┌──────────┐        ┌───────────┐ ┌────────┐
//! │APPROVED│ │ REJECTED │        │ COMPLETED │ │ FAILED │
//! └────────┘ └──────────┘        └───────────┘ └────────┘
//! ```
//!
//! The review track records the operator's decision; the transfer track
//! mirrors what the exchange did with the submitted transfer. Neither
//! track ever mutates the balance — the debit happened at request time,
//! with a compensating credit if the submission itself failed (in which
//! case no record exists at all).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, ExternalTxId, UserId, WithdrawalId};

/// Administrative review status, set by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    /// Awaiting operator review.
    Pending,
    /// Operator signed off. Terminal.
    Approved,
    /// Operator declined. Terminal.
    Rejected,
}

impl ReviewStatus {
    /// Can the review advance to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Transfer status, advanced by gateway history sync (or an operator
/// acting on out-of-band information).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Submitted to the exchange; outcome unknown.
    Processing,
    /// The exchange confirmed the transfer. Terminal.
    Completed,
    /// The exchange reported the transfer as failed. Terminal.
    Failed,
}

impl TransferStatus {
    /// Can the transfer advance to the given target?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Processing, Self::Completed | Self::Failed)
        )
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A persisted withdrawal.
///
/// Created only after the balance was debited **and** the exchange
/// accepted the transfer submission; a rejected submission is compensated
/// and leaves no record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    /// Record identifier.
    pub id: WithdrawalId,
    /// The account the amount was debited from.
    pub owner: UserId,
    /// Debited amount.
    pub amount: Decimal,
    /// Destination wallet address.
    pub address: Address,
    /// Network the transfer was submitted on.
    pub network: String,
    /// Transaction id returned by the exchange on submission.
    pub external_tx_id: Option<ExternalTxId>,
    /// Raw gateway status string, mirrored verbatim by history sync.
    pub external_status: Option<String>,
    /// Operator review track.
    pub review_status: ReviewStatus,
    /// Exchange transfer track.
    pub transfer_status: TransferStatus,
    /// When the user made the request.
    pub requested_at: DateTime<Utc>,
}

impl WithdrawalRecord {
    /// Create a record for a just-accepted submission: review PENDING,
    /// transfer PROCESSING.
    #[must_use]
    pub fn new(
        owner: UserId,
        amount: Decimal,
        address: impl Into<Address>,
        network: impl Into<String>,
        external_tx_id: ExternalTxId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WithdrawalId::new(),
            owner,
            amount,
            address: address.into(),
            network: network.into(),
            external_tx_id: Some(external_tx_id),
            external_status: None,
            review_status: ReviewStatus::Pending,
            transfer_status: TransferStatus::Processing,
            requested_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> WithdrawalRecord {
        WithdrawalRecord::new(
            UserId::new(),
            Decimal::new(50, 0),
            "TAbc123",
            "TRX",
            ExternalTxId::from("W1"),
            Utc::now(),
        )
    }

    #[test]
    fn new_record_initial_statuses() {
        let r = record();
        assert_eq!(r.review_status, ReviewStatus::Pending);
        assert_eq!(r.transfer_status, TransferStatus::Processing);
        assert_eq!(r.external_tx_id, Some(ExternalTxId::from("W1")));
        assert!(r.external_status.is_none());
    }

    #[test]
    fn review_transitions() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Rejected.can_transition_to(ReviewStatus::Pending));
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Pending));
    }

    #[test]
    fn transfer_transitions() {
        assert!(TransferStatus::Processing.can_transition_to(TransferStatus::Completed));
        assert!(TransferStatus::Processing.can_transition_to(TransferStatus::Failed));
        assert!(!TransferStatus::Completed.can_transition_to(TransferStatus::Failed));
        assert!(!TransferStatus::Failed.can_transition_to(TransferStatus::Processing));
    }

    #[test]
    fn status_display() {
        assert_eq!(ReviewStatus::Pending.to_string(), "PENDING");
        assert_eq!(TransferStatus::Processing.to_string(), "PROCESSING");
        assert_eq!(TransferStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn serde_roundtrip() {
        let r = record();
        let json = serde_json::to_string(&r).unwrap();
        let back: WithdrawalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(r.id, back.id);
        assert_eq!(r.amount, back.amount);
        assert_eq!(r.review_status, back.review_status);
        assert_eq!(r.transfer_status, back.transfer_status);
    }
}
