//! Deposit-intent store.
//!
//! Every operation runs inside a single write-lock critical section, which
//! is what makes the two storage-layer invariants hold under concurrency:
//!
//! - at most one `Waiting` unexpired intent per owner (checked on insert)
//! - `expected_amount` unique among `Waiting` intents (checked on insert;
//!   amounts recycle once an intent completes or expires)
//!
//! and what makes `settle_match` atomic: "find the waiting intent with
//! this exact amount" and "mark it completed" cannot interleave with a
//! concurrent settlement or insert.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use paydrift_types::{
    DepositIntent, ExternalTxId, IntentId, IntentStatus, PaydriftError, Result, UserId,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

/// In-memory deposit-intent collection.
pub struct IntentStore {
    intents: RwLock<HashMap<IntentId, DepositIntent>>,
}

impl IntentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new intent, enforcing both creation-time invariants.
    ///
    /// # Errors
    /// - [`PaydriftError::DuplicateActiveIntent`] if the owner already has
    ///   a waiting, unexpired intent at `now`
    /// - [`PaydriftError::AmountCollision`] if another waiting intent
    ///   already promises the same `expected_amount`
    pub async fn insert(&self, intent: DepositIntent, now: DateTime<Utc>) -> Result<()> {
        let mut intents = self.intents.write().await;

        if intents
            .values()
            .any(|i| i.owner == intent.owner && i.is_active(now))
        {
            return Err(PaydriftError::DuplicateActiveIntent {
                owner: intent.owner,
            });
        }

        // Amount uniqueness is checked against *all* waiting intents, not
        // just unexpired ones: an expired-but-unswept intent could still be
        // completed by a concurrent settlement observing an earlier `now`.
        if intents.values().any(|i| {
            i.status == IntentStatus::Waiting && i.expected_amount == intent.expected_amount
        }) {
            return Err(PaydriftError::AmountCollision {
                amount: intent.expected_amount,
            });
        }

        intents.insert(intent.id, intent);
        Ok(())
    }

    /// Whether any intent has recorded this external transaction id.
    ///
    /// This is the authoritative de-duplication check — unlike the engine's
    /// in-memory cache it survives restarts (in a deployed store, a unique
    /// index on the tx id column).
    pub async fn contains_tx(&self, tx_id: &ExternalTxId) -> bool {
        let intents = self.intents.read().await;
        intents
            .values()
            .any(|i| i.external_tx_id.as_ref() == Some(tx_id))
    }

    /// Atomically find the waiting, unexpired intent matching
    /// `(network, amount)` and mark it completed with `tx_id`.
    ///
    /// Returns the completed intent, or `None` when no intent matches
    /// (an orphaned deposit — logged by the caller, reconciled manually).
    ///
    /// # Errors
    /// Returns [`PaydriftError::DuplicateExternalTx`] if `tx_id` already
    /// settled some intent — the caller treats this as an idempotent no-op.
    pub async fn settle_match(
        &self,
        network: &str,
        amount: Decimal,
        tx_id: &ExternalTxId,
        now: DateTime<Utc>,
    ) -> Result<Option<DepositIntent>> {
        let mut intents = self.intents.write().await;

        if intents
            .values()
            .any(|i| i.external_tx_id.as_ref() == Some(tx_id))
        {
            return Err(PaydriftError::DuplicateExternalTx(tx_id.clone()));
        }

        let candidate = intents.values_mut().find(|i| {
            i.is_active(now) && i.network == network && i.expected_amount == amount
        });

        match candidate {
            Some(intent) => {
                intent.mark_completed(tx_id.clone(), now)?;
                Ok(Some(intent.clone()))
            }
            None => Ok(None),
        }
    }

    /// Batch-expire every waiting intent whose window has passed.
    /// Returns how many were expired.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut intents = self.intents.write().await;
        let mut swept = 0;
        for intent in intents.values_mut() {
            if intent.status == IntentStatus::Waiting && intent.expires_at < now {
                // Waiting -> Expired can't fail; the status was just checked.
                if intent.mark_expired().is_ok() {
                    swept += 1;
                }
            }
        }
        swept
    }

    /// Look up an intent by id.
    pub async fn get(&self, id: IntentId) -> Option<DepositIntent> {
        let intents = self.intents.read().await;
        intents.get(&id).cloned()
    }

    /// The owner's currently-active intent, if any.
    pub async fn active_for_owner(
        &self,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Option<DepositIntent> {
        let intents = self.intents.read().await;
        intents
            .values()
            .find(|i| i.owner == owner && i.is_active(now))
            .cloned()
    }

    /// All intents for an owner, newest first.
    pub async fn for_owner(&self, owner: UserId) -> Vec<DepositIntent> {
        let intents = self.intents.read().await;
        let mut result: Vec<_> = intents
            .values()
            .filter(|i| i.owner == owner)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    /// Number of intents tracked.
    pub async fn len(&self) -> usize {
        self.intents.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.intents.read().await.is_empty()
    }
}

impl Default for IntentStore {
    fn default() -> Self {
        Self::new()
    }
}
