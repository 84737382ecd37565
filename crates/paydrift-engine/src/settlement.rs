//! The settlement engine — polling reconciliation of external deposits
//! against waiting intents.
//!
//! `poll()` is the whole public contract: safe to fire on a timer, safe to
//! fire concurrently (a single-flight gate skips overlapping cycles), and
//! it never lets an error escape — a failed cycle is logged and the next
//! tick re-covers the same events because the lookback window (10 minutes)
//! is wider than the poll cadence (2 minutes).
//!
//! Idempotency is layered:
//! 1. the in-memory [`SeenTxCache`] short-circuits replays cheaply,
//! 2. the intent store's transaction-id check is authoritative (it is the
//!    layer that survives restarts),
//! 3. `settle_match` finds and completes an intent in one critical
//!    section, so two events carrying the same amount can never both
//!    complete it.

use std::sync::{Arc, Mutex};

use paydrift_gateway::{ExchangeGateway, NotificationSink};
use paydrift_store::{AccountStore, IntentStore};
use paydrift_types::{
    round2, DepositEvent, DepositIntent, EngineConfig, PaydriftError, Result, RewardSchedule,
};
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::dedup::SeenTxCache;
use crate::messages;

/// Polls the exchange and settles matched deposits.
pub struct SettlementEngine {
    gateway: Arc<dyn ExchangeGateway>,
    sink: Arc<dyn NotificationSink>,
    intents: Arc<IntentStore>,
    accounts: Arc<AccountStore>,
    config: EngineConfig,
    rewards: RewardSchedule,
    clock: Arc<dyn Clock>,
    /// Fast-path replay filter. Advisory only — see module docs.
    seen: Mutex<SeenTxCache>,
    /// Single-flight gate: held for the duration of one poll cycle.
    poll_gate: tokio::sync::Mutex<()>,
}

impl SettlementEngine {
    /// Wire up an engine. All collaborators are injected; the engine owns
    /// only its caches.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        sink: Arc<dyn NotificationSink>,
        intents: Arc<IntentStore>,
        accounts: Arc<AccountStore>,
        config: EngineConfig,
        rewards: RewardSchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let seen = Mutex::new(SeenTxCache::new(config.seen_tx_cache_size));
        Self {
            gateway,
            sink,
            intents,
            accounts,
            config,
            rewards,
            clock,
            seen,
            poll_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// Fetches deposit events from the lookback window, processes each,
    /// then sweeps expired intents. Every failure is caught and logged so
    /// the schedule continues; if a prior cycle is still running this one
    /// is skipped entirely.
    pub async fn poll(&self) {
        let Ok(_guard) = self.poll_gate.try_lock() else {
            tracing::debug!("settlement poll already in flight, skipping cycle");
            return;
        };

        let now = self.clock.now();
        let start = now - self.config.lookback();

        match self
            .gateway
            .deposit_history(&self.config.coin, &self.config.network, start, None)
            .await
        {
            Ok(events) => {
                if !events.is_empty() {
                    tracing::debug!(count = events.len(), "fetched recent deposit events");
                }
                for event in events {
                    if let Err(error) = self.process_deposit(&event).await {
                        tracing::warn!(
                            tx_id = %event.tx_id,
                            amount = %event.amount,
                            %error,
                            "failed to process deposit event"
                        );
                    }
                }
            }
            // The next cycle re-covers this window; nothing is lost.
            Err(error) => tracing::warn!(%error, "deposit history fetch failed"),
        }

        let swept = self.intents.sweep_expired(self.clock.now()).await;
        if swept > 0 {
            tracing::info!(count = swept, "marked deposit intents as expired");
        }
    }

    /// Handle one external deposit event.
    async fn process_deposit(&self, event: &DepositEvent) -> Result<()> {
        if !event.status.is_confirmed() {
            return Ok(());
        }

        // Fast path: already handled within this process's lifetime.
        if self.seen.lock().expect("seen cache lock poisoned").contains(&event.tx_id) {
            return Ok(());
        }

        // Authoritative: some intent already recorded this transaction.
        if self.intents.contains_tx(&event.tx_id).await {
            self.remember(&event.tx_id);
            return Ok(());
        }

        let now = self.clock.now();
        let settled = match self
            .intents
            .settle_match(&event.network, event.amount, &event.tx_id, now)
            .await
        {
            Ok(Some(intent)) => intent,
            Ok(None) => {
                // Orphaned deposit: no waiting intent promises this amount.
                // Left for manual reconciliation; auto-refund is out of scope.
                tracing::info!(
                    tx_id = %event.tx_id,
                    amount = %event.amount,
                    network = %event.network,
                    "no matching deposit intent for event"
                );
                return Ok(());
            }
            Err(PaydriftError::DuplicateExternalTx(_)) => {
                // Raced another settlement of the same event.
                self.remember(&event.tx_id);
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        self.remember(&event.tx_id);
        tracing::info!(
            intent = %settled.id,
            owner = %settled.owner,
            amount = %settled.expected_amount,
            tx_id = %event.tx_id,
            "deposit matched"
        );

        self.apply_reward(&settled, event).await
    }

    /// Grant the first-deposit reward and referral match, then notify.
    async fn apply_reward(&self, intent: &DepositIntent, event: &DepositEvent) -> Result<()> {
        let account = self.accounts.get(intent.owner).await?;
        if account.eligible {
            // Reward is granted exactly once, at the first qualifying
            // deposit. Later deposits just complete their intents.
            tracing::debug!(owner = %intent.owner, "owner already eligible, no reward issued");
            return Ok(());
        }

        let category = intent.category.or(account.category);
        let reward = round2(intent.base_amount * self.rewards.rate(category));

        let Some(grant) = self
            .accounts
            .grant_eligibility(intent.owner, category, reward)
            .await?
        else {
            // Lost the eligibility race to a concurrent settlement.
            return Ok(());
        };

        tracing::info!(
            owner = %intent.owner,
            reward = %grant.reward,
            category = ?category,
            "owner marked eligible"
        );

        if grant.reward > Decimal::ZERO {
            if let Some(referrer) = grant.referrer {
                self.accounts
                    .add_referral_reward(referrer, intent.owner, grant.reward, self.clock.now())
                    .await?;
                tracing::info!(
                    %referrer,
                    referred = %intent.owner,
                    amount = %grant.reward,
                    "referral reward credited"
                );
            }
        }

        let (subject, body) =
            messages::deposit_confirmed(&account.name, event.amount, &intent.coin, &event.tx_id);
        self.notify(&account.email, &subject, &body).await;

        if let Some(operator) = &self.config.operator_email {
            let (subject, body) = messages::deposit_confirmed_operator(
                &account.name,
                &account.email,
                event.amount,
                &intent.coin,
                &event.tx_id,
            );
            self.notify(operator, &subject, &body).await;
        }

        Ok(())
    }

    fn remember(&self, tx_id: &paydrift_types::ExternalTxId) {
        self.seen
            .lock()
            .expect("seen cache lock poisoned")
            .insert(tx_id.clone());
    }

    /// Best-effort send: failures are logged, never propagated.
    async fn notify(&self, recipient: &str, subject: &str, body: &str) {
        if let Err(error) = self.sink.send(recipient, subject, body).await {
            tracing::warn!(recipient, subject, %error, "notification send failed");
        }
    }
}
