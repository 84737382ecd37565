//! Withdrawal-record store.
//!
//! Status updates are conditional writes: the transition is validated
//! against the record's current state inside the write lock, so terminal
//! records can never be overwritten.

use std::collections::HashMap;

use paydrift_types::{
    PaydriftError, Result, ReviewStatus, TransferStatus, UserId, WithdrawalId, WithdrawalRecord,
};
use tokio::sync::RwLock;

/// In-memory withdrawal-record collection.
pub struct WithdrawalStore {
    records: RwLock<HashMap<WithdrawalId, WithdrawalRecord>>,
}

impl WithdrawalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Persist a record.
    pub async fn insert(&self, record: WithdrawalRecord) {
        let mut records = self.records.write().await;
        records.insert(record.id, record);
    }

    /// Look up a record by id.
    pub async fn get(&self, id: WithdrawalId) -> Result<WithdrawalRecord> {
        let records = self.records.read().await;
        records
            .get(&id)
            .cloned()
            .ok_or(PaydriftError::WithdrawalNotFound(id))
    }

    /// Number of persisted withdrawals for an owner. A failed submission
    /// leaves no record, so this counts only accepted requests — the input
    /// to the first-withdrawal rule.
    pub async fn count_for_owner(&self, owner: UserId) -> usize {
        let records = self.records.read().await;
        records.values().filter(|r| r.owner == owner).count()
    }

    /// All records for an owner, newest first.
    pub async fn for_owner(&self, owner: UserId) -> Vec<WithdrawalRecord> {
        let records = self.records.read().await;
        let mut result: Vec<_> = records
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        result
    }

    /// Records whose transfer track is still PROCESSING (the set history
    /// sync needs to reconcile).
    pub async fn processing(&self) -> Vec<WithdrawalRecord> {
        let records = self.records.read().await;
        records
            .values()
            .filter(|r| r.transfer_status == TransferStatus::Processing)
            .cloned()
            .collect()
    }

    /// Advance the administrative review track.
    ///
    /// # Errors
    /// - [`PaydriftError::WithdrawalNotFound`] for an unknown id
    /// - [`PaydriftError::InvalidReviewTransition`] if the record's review
    ///   state is terminal or the transition is otherwise illegal
    pub async fn update_review_status(
        &self,
        id: WithdrawalId,
        status: ReviewStatus,
    ) -> Result<WithdrawalRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or(PaydriftError::WithdrawalNotFound(id))?;

        if !record.review_status.can_transition_to(status) {
            return Err(PaydriftError::InvalidReviewTransition {
                from: record.review_status,
                to: status,
            });
        }

        record.review_status = status;
        Ok(record.clone())
    }

    /// Advance the gateway-driven transfer track, mirroring the raw
    /// exchange status string.
    ///
    /// # Errors
    /// - [`PaydriftError::WithdrawalNotFound`] for an unknown id
    /// - [`PaydriftError::InvalidTransferTransition`] if the record's
    ///   transfer state is terminal
    pub async fn update_transfer_status(
        &self,
        id: WithdrawalId,
        status: TransferStatus,
        external_status: Option<String>,
    ) -> Result<WithdrawalRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or(PaydriftError::WithdrawalNotFound(id))?;

        if !record.transfer_status.can_transition_to(status) {
            return Err(PaydriftError::InvalidTransferTransition {
                from: record.transfer_status,
                to: status,
            });
        }

        record.transfer_status = status;
        if external_status.is_some() {
            record.external_status = external_status;
        }
        Ok(record.clone())
    }

    /// Number of records tracked.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for WithdrawalStore {
    fn default() -> Self {
        Self::new()
    }
}
