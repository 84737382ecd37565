//! Withdrawal processing: tiered validation, debit-then-submit with a
//! compensating credit, and the two status tracks.
//!
//! The debit happens before the gateway call, so funds are reserved while
//! the submission is in flight; a gateway failure re-credits the exact
//! amount and leaves no record. This is not a distributed transaction: a
//! crash between debit and compensation understates the balance, and a
//! timed-out submission that the exchange actually executed double-spends
//! externally. Both gaps call for a durable outbox with per-request
//! idempotency keys; until then they are operational risks to monitor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use paydrift_gateway::{ExchangeGateway, NotificationSink};
use paydrift_store::{AccountStore, WithdrawalStore};
use paydrift_types::{
    EngineConfig, PaydriftError, Result, ReviewStatus, TransferStatus, UserId, WithdrawalId,
    WithdrawalPolicy, WithdrawalRecord,
};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::messages;

/// Validates and executes withdrawal requests.
pub struct WithdrawalProcessor {
    accounts: Arc<AccountStore>,
    withdrawals: Arc<WithdrawalStore>,
    gateway: Arc<dyn ExchangeGateway>,
    sink: Arc<dyn NotificationSink>,
    config: EngineConfig,
    policy: WithdrawalPolicy,
    clock: Arc<dyn Clock>,
}

impl WithdrawalProcessor {
    /// Wire up the processor.
    #[must_use]
    pub fn new(
        accounts: Arc<AccountStore>,
        withdrawals: Arc<WithdrawalStore>,
        gateway: Arc<dyn ExchangeGateway>,
        sink: Arc<dyn NotificationSink>,
        config: EngineConfig,
        policy: WithdrawalPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            withdrawals,
            gateway,
            sink,
            config,
            policy,
            clock,
        }
    }

    /// Process a withdrawal request.
    ///
    /// Validation runs in order and mutates nothing until every check has
    /// passed; each failure is a distinct error so the caller can tell the
    /// user exactly why. The balance check is fused with the debit
    /// (`try_debit`) so no concurrent request can spend the same funds.
    ///
    /// # Errors
    /// Validation errors (`NonPositiveAmount`, `MissingAddress`,
    /// `UnsupportedNetwork`, the tier errors, `InsufficientBalance`) leave
    /// all state untouched. Gateway errors surface after the compensating
    /// credit has restored the balance.
    pub async fn request(
        &self,
        owner: UserId,
        amount: Decimal,
        address: &str,
        network: &str,
    ) -> Result<WithdrawalRecord> {
        if amount <= Decimal::ZERO {
            return Err(PaydriftError::NonPositiveAmount { amount });
        }
        if address.trim().is_empty() {
            return Err(PaydriftError::MissingAddress);
        }
        if network != self.config.network {
            return Err(PaydriftError::UnsupportedNetwork(network.to_string()));
        }

        let account = self.accounts.get(owner).await?;
        self.check_tier(&account, amount).await?;

        // Reserve the funds. From here on, every exit path must either
        // keep the debit (success) or compensate it (failure).
        self.accounts.try_debit(owner, amount).await?;

        match self.gateway.create_withdrawal(address, amount, network).await {
            Ok(receipt) => {
                let record = WithdrawalRecord::new(
                    owner,
                    amount,
                    address,
                    network,
                    receipt.external_id.clone(),
                    self.clock.now(),
                );
                self.withdrawals.insert(record.clone()).await;
                tracing::info!(
                    withdrawal = %record.id,
                    %owner,
                    %amount,
                    external_id = %receipt.external_id,
                    "withdrawal submitted"
                );

                let (subject, body) =
                    messages::withdrawal_submitted(&account.name, amount, &self.config.coin);
                self.notify(&account.email, &subject, &body).await;
                if let Some(operator) = &self.config.operator_email {
                    let (subject, body) = messages::withdrawal_submitted_operator(
                        &account.name,
                        &account.email,
                        amount,
                        &self.config.coin,
                    );
                    self.notify(operator, &subject, &body).await;
                }

                Ok(record)
            }
            Err(error) => {
                // Compensating credit. A timeout lands here too even though
                // the exchange may have executed the transfer — see the
                // module docs.
                if let Err(comp) = self.accounts.credit(owner, amount).await {
                    tracing::error!(
                        %owner,
                        %amount,
                        error = %comp,
                        "compensating credit failed, balance understated"
                    );
                }
                tracing::warn!(%owner, %amount, %error, "withdrawal submission failed");
                Err(error)
            }
        }
    }

    /// Advance the administrative review track and notify the owner.
    ///
    /// Never touches the balance — that was settled at request time.
    pub async fn update_review_status(
        &self,
        id: WithdrawalId,
        status: ReviewStatus,
    ) -> Result<WithdrawalRecord> {
        let record = self.withdrawals.update_review_status(id, status).await?;
        tracing::info!(withdrawal = %id, status = %status, "withdrawal review updated");

        let account = self.accounts.get(record.owner).await?;
        let (subject, body) =
            messages::review_status_update(&account.name, record.amount, &self.config.coin, status);
        self.notify(&account.email, &subject, &body).await;

        Ok(record)
    }

    /// Reconcile PROCESSING records against the exchange's withdrawal
    /// history, mirroring the raw status string and advancing the transfer
    /// track for terminal outcomes. Returns how many records advanced.
    pub async fn sync_transfer_statuses(&self, since: DateTime<Utc>) -> Result<usize> {
        let processing = self.withdrawals.processing().await;
        if processing.is_empty() {
            return Ok(0);
        }

        let rows = self
            .gateway
            .withdrawal_history(&self.config.coin, &self.config.network, since)
            .await?;

        let mut advanced = 0;
        for record in processing {
            let Some(external_id) = &record.external_tx_id else {
                continue;
            };
            // The history may carry several rows for one id; the newest wins.
            let Some(row) = rows
                .iter()
                .filter(|r| &r.external_id == external_id)
                .max_by_key(|r| r.updated_at)
            else {
                continue;
            };
            let Some(target) = transfer_status_for(&row.status) else {
                // Still in flight on the exchange side.
                continue;
            };

            self.withdrawals
                .update_transfer_status(record.id, target, Some(row.status.clone()))
                .await?;
            tracing::info!(
                withdrawal = %record.id,
                status = %target,
                external_status = %row.status,
                "withdrawal transfer status advanced"
            );
            advanced += 1;
        }
        Ok(advanced)
    }

    /// Tier rules: introductory exact amount for the first withdrawal,
    /// referral + bracket limits afterwards.
    async fn check_tier(&self, account: &paydrift_types::Account, amount: Decimal) -> Result<()> {
        let prior = self.withdrawals.count_for_owner(account.id).await;

        if prior == 0 {
            if amount != self.policy.first_amount {
                return Err(PaydriftError::FirstWithdrawalAmountMismatch {
                    required: self.policy.first_amount,
                });
            }
            return Ok(());
        }

        if account.referral_rewards.is_empty() {
            return Err(PaydriftError::ReferralRequired);
        }
        if amount < self.policy.min_amount {
            return Err(PaydriftError::BelowMinimum {
                min: self.policy.min_amount,
            });
        }
        let Some(category) = account.category else {
            return Err(PaydriftError::NoWithdrawalBracket {
                category: None,
                level: account.level,
            });
        };
        let Some(cap) = self.policy.cap(category, account.level) else {
            return Err(PaydriftError::NoWithdrawalBracket {
                category: Some(category),
                level: account.level,
            });
        };
        if amount > cap {
            return Err(PaydriftError::AboveBracketCap {
                cap,
                category,
                level: account.level,
            });
        }
        Ok(())
    }

    /// Best-effort send: failures are logged, never propagated.
    async fn notify(&self, recipient: &str, subject: &str, body: &str) {
        if let Err(error) = self.sink.send(recipient, subject, body).await {
            tracing::warn!(recipient, subject, %error, "notification send failed");
        }
    }
}

/// Map the exchange's withdrawal status strings onto the transfer track.
fn transfer_status_for(external: &str) -> Option<TransferStatus> {
    match external.to_ascii_lowercase().as_str() {
        "completed" | "success" => Some(TransferStatus::Completed),
        "failed" | "rejected" | "cancelled" => Some(TransferStatus::Failed),
        _ => None,
    }
}
