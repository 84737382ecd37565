//! # DepositIntent — the deposit correlation primitive
//!
//! A `DepositIntent` is a server-issued promise of a **unique expected
//! amount**. The exchange account receiving deposits is shared, so the
//! amount itself is the correlation key: the user is instructed to send
//! exactly `expected_amount`, and the settlement engine matches incoming
//! events on `(network, amount)`.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  settlement match  ┌───────────┐
//!   │ WAITING ├───────────────────▶│ COMPLETED │
//!   └────┬────┘                    └───────────┘
//!        │ expiry sweep
//!        ▼
//!   ┌─────────┐
//!   │ EXPIRED │
//!   └─────────┘
//! ```
//!
//! Terminal states are immutable: an expired intent never completes, even
//! if a matching deposit event arrives later, and a completed intent is
//! never re-settled.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Category, ExternalTxId, IntentId, PaydriftError, Result, UserId};

/// The lifecycle state of a deposit intent.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Waiting → Completed` (a confirmed deposit event matched the amount)
/// - `Waiting → Expired` (the expiry sweep passed `expires_at`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
    /// Issued and awaiting the matching deposit. The only settleable state.
    Waiting,
    /// A confirmed external deposit matched this intent. **Irreversible.**
    Completed,
    /// The intent outlived its window without a match. Its amount may be
    /// recycled by new intents.
    Expired,
}

impl IntentStatus {
    /// Can this intent transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Completed | Self::Expired)
        )
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A deposit intent: the promise that a specific user will send a specific
/// unique amount within the intent's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositIntent {
    /// Globally unique intent identifier.
    pub id: IntentId,
    /// The user this intent belongs to.
    pub owner: UserId,
    /// The exact amount the user must send. Unique among WAITING intents —
    /// this is the entire correlation key.
    pub expected_amount: Decimal,
    /// The package price the reward is computed from. Falls back to
    /// `expected_amount` when no package is attached.
    pub base_amount: Decimal,
    /// Membership category this deposit purchases, if any.
    pub category: Option<Category>,
    /// Coin symbol (e.g., "USDT").
    pub coin: String,
    /// Network the deposit is expected on (e.g., "TRX").
    pub network: String,
    /// Current lifecycle state.
    pub status: IntentStatus,
    /// The exchange transaction that settled this intent, once completed.
    pub external_tx_id: Option<ExternalTxId>,
    /// When the intent was issued.
    pub created_at: DateTime<Utc>,
    /// When the intent stops being matchable.
    pub expires_at: DateTime<Utc>,
    /// When the settlement match happened, once completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl DepositIntent {
    /// Create a new WAITING intent expiring `ttl` after `now`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: UserId,
        expected_amount: Decimal,
        base_amount: Decimal,
        category: Option<Category>,
        coin: impl Into<String>,
        network: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: IntentId::new(),
            owner,
            expected_amount,
            base_amount,
            category,
            coin: coin.into(),
            network: network.into(),
            status: IntentStatus::Waiting,
            external_tx_id: None,
            created_at: now,
            expires_at: now + ttl,
            completed_at: None,
        }
    }

    /// Whether this intent can still be matched at `now`: WAITING with a
    /// future expiry.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == IntentStatus::Waiting && self.expires_at > now
    }

    /// Transition `Waiting → Completed`, recording the settling transaction.
    ///
    /// # Errors
    /// Returns [`PaydriftError::InvalidIntentTransition`] if the intent is
    /// not in WAITING state.
    pub fn mark_completed(&mut self, tx_id: ExternalTxId, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(IntentStatus::Completed) {
            return Err(PaydriftError::InvalidIntentTransition {
                from: self.status,
                to: IntentStatus::Completed,
            });
        }
        self.status = IntentStatus::Completed;
        self.external_tx_id = Some(tx_id);
        self.completed_at = Some(now);
        Ok(())
    }

    /// Transition `Waiting → Expired`.
    ///
    /// # Errors
    /// Returns [`PaydriftError::InvalidIntentTransition`] if the intent is
    /// not in WAITING state.
    pub fn mark_expired(&mut self) -> Result<()> {
        if !self.status.can_transition_to(IntentStatus::Expired) {
            return Err(PaydriftError::InvalidIntentTransition {
                from: self.status,
                to: IntentStatus::Expired,
            });
        }
        self.status = IntentStatus::Expired;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(now: DateTime<Utc>) -> DepositIntent {
        DepositIntent::new(
            UserId::new(),
            Decimal::new(347, 2), // 3.47
            Decimal::new(100, 0),
            Some(Category::Silver),
            "USDT",
            "TRX",
            now,
            Duration::minutes(30),
        )
    }

    #[test]
    fn new_intent_is_waiting_and_active() {
        let now = Utc::now();
        let i = intent(now);
        assert_eq!(i.status, IntentStatus::Waiting);
        assert!(i.is_active(now));
        assert_eq!(i.expires_at, now + Duration::minutes(30));
        assert!(i.external_tx_id.is_none());
        assert!(i.completed_at.is_none());
    }

    #[test]
    fn past_expiry_is_not_active() {
        let now = Utc::now();
        let i = intent(now);
        assert!(!i.is_active(now + Duration::minutes(31)));
    }

    #[test]
    fn complete_records_tx_and_time() {
        let now = Utc::now();
        let mut i = intent(now);
        let settled = now + Duration::minutes(5);
        i.mark_completed(ExternalTxId::from("X1"), settled).unwrap();
        assert_eq!(i.status, IntentStatus::Completed);
        assert_eq!(i.external_tx_id, Some(ExternalTxId::from("X1")));
        assert_eq!(i.completed_at, Some(settled));
    }

    #[test]
    fn completed_is_terminal() {
        let now = Utc::now();
        let mut i = intent(now);
        i.mark_completed(ExternalTxId::from("X1"), now).unwrap();

        let err = i.mark_expired().unwrap_err();
        assert!(matches!(err, PaydriftError::InvalidIntentTransition { .. }));

        let err = i
            .mark_completed(ExternalTxId::from("X2"), now)
            .unwrap_err();
        assert!(matches!(err, PaydriftError::InvalidIntentTransition { .. }));
        // Original settlement untouched
        assert_eq!(i.external_tx_id, Some(ExternalTxId::from("X1")));
    }

    #[test]
    fn expired_never_completes() {
        let now = Utc::now();
        let mut i = intent(now);
        i.mark_expired().unwrap();
        assert_eq!(i.status, IntentStatus::Expired);

        let err = i
            .mark_completed(ExternalTxId::from("X1"), now)
            .unwrap_err();
        assert!(matches!(err, PaydriftError::InvalidIntentTransition { .. }));
        assert!(i.external_tx_id.is_none());
    }

    #[test]
    fn transition_table() {
        assert!(IntentStatus::Waiting.can_transition_to(IntentStatus::Completed));
        assert!(IntentStatus::Waiting.can_transition_to(IntentStatus::Expired));
        assert!(!IntentStatus::Completed.can_transition_to(IntentStatus::Expired));
        assert!(!IntentStatus::Expired.can_transition_to(IntentStatus::Completed));
        assert!(!IntentStatus::Waiting.can_transition_to(IntentStatus::Waiting));
    }

    #[test]
    fn serde_roundtrip() {
        let i = intent(Utc::now());
        let json = serde_json::to_string(&i).unwrap();
        let back: DepositIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(i.id, back.id);
        assert_eq!(i.expected_amount, back.expected_amount);
        assert_eq!(i.status, back.status);
    }
}
