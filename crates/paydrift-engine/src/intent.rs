//! Deposit-intent issuance.
//!
//! The generated amount doubles as the payment reference: the exchange
//! account is shared and exposes no memo field, so a small pseudo-random
//! fractional amount, unique among waiting intents, is the only way to
//! correlate an anonymous deposit back to a user. The band is narrow on
//! purpose — the 30-minute TTL keeps it from saturating.

use std::sync::Arc;

use paydrift_gateway::{ExchangeGateway, NotificationSink};
use paydrift_store::{AccountStore, IntentStore};
use paydrift_types::{
    Address, Category, DepositIntent, EngineConfig, PaydriftError, Result, UserId,
};
use rand::Rng;
use rust_decimal::Decimal;

use crate::clock::Clock;
use crate::messages;

/// What the caller hands back to the user: the intent plus where to send
/// the funds.
#[derive(Debug, Clone)]
pub struct IntentTicket {
    /// The persisted intent.
    pub intent: DepositIntent,
    /// The deposit address the user must send to.
    pub address: Address,
    /// Whether the address came from static config because the gateway
    /// lookup failed. Flagged so callers can surface the degraded mode.
    pub used_fallback: bool,
}

/// Issues deposit intents.
pub struct IntentService {
    intents: Arc<IntentStore>,
    accounts: Arc<AccountStore>,
    gateway: Arc<dyn ExchangeGateway>,
    sink: Arc<dyn NotificationSink>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl IntentService {
    /// Wire up the service.
    #[must_use]
    pub fn new(
        intents: Arc<IntentStore>,
        accounts: Arc<AccountStore>,
        gateway: Arc<dyn ExchangeGateway>,
        sink: Arc<dyn NotificationSink>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intents,
            accounts,
            gateway,
            sink,
            config,
            clock,
        }
    }

    /// Create a deposit intent for `owner`.
    ///
    /// Samples amounts from the configured band until the store accepts
    /// one — the store's insert is the arbiter of both uniqueness
    /// constraints, so a concurrent settlement or creation can never end
    /// up sharing an amount. The deposit address is fetched fresh from the
    /// gateway, with the statically configured fallback (distinctly
    /// flagged) covering lookup failures.
    ///
    /// # Errors
    /// - [`PaydriftError::AccountNotFound`] for an unknown owner
    /// - [`PaydriftError::DuplicateActiveIntent`] if the owner already has
    ///   an active intent (retryable after it completes or expires)
    /// - [`PaydriftError::AmountGenerationExhausted`] when the band is
    ///   saturated
    /// - gateway errors when the address lookup fails and no fallback is
    ///   configured
    pub async fn create_intent(
        &self,
        owner: UserId,
        category: Option<Category>,
        base_amount: Option<Decimal>,
    ) -> Result<IntentTicket> {
        let account = self.accounts.get(owner).await?;
        let now = self.clock.now();

        let band = &self.config.amount_band;
        let mut attempts = 0;
        let intent = loop {
            if attempts >= band.max_attempts {
                tracing::warn!(
                    %owner,
                    attempts,
                    capacity = band.capacity(),
                    "deposit amount band saturated"
                );
                return Err(PaydriftError::AmountGenerationExhausted { attempts });
            }
            attempts += 1;

            let cents = rand::thread_rng().gen_range(band.min_cents..=band.max_cents);
            let amount = band.amount_for(cents);
            let candidate = DepositIntent::new(
                owner,
                amount,
                base_amount.unwrap_or(amount),
                category,
                &self.config.coin,
                &self.config.network,
                now,
                self.config.intent_ttl(),
            );
            match self.intents.insert(candidate.clone(), now).await {
                Ok(()) => break candidate,
                // Another waiting intent holds this amount; resample.
                Err(PaydriftError::AmountCollision { .. }) => {}
                Err(error) => return Err(error),
            }
        };

        tracing::info!(
            intent = %intent.id,
            %owner,
            amount = %intent.expected_amount,
            expires_at = %intent.expires_at,
            "deposit intent created"
        );

        let (address, used_fallback) = self.resolve_address().await?;

        let (subject, body) = messages::deposit_instructions(
            &account.name,
            &self.config.coin,
            &self.config.network,
            &address,
            intent.expected_amount,
            self.config.intent_ttl_mins,
        );
        if let Err(error) = self.sink.send(&account.email, &subject, &body).await {
            tracing::warn!(%owner, %error, "failed to send deposit instructions");
        }

        Ok(IntentTicket {
            intent,
            address,
            used_fallback,
        })
    }

    /// The owner's currently-active intent, if any.
    pub async fn active_intent(&self, owner: UserId) -> Option<DepositIntent> {
        self.intents.active_for_owner(owner, self.clock.now()).await
    }

    /// Fetch the deposit address, degrading to the static fallback.
    async fn resolve_address(&self) -> Result<(Address, bool)> {
        match self
            .gateway
            .deposit_address(&self.config.coin, &self.config.network)
            .await
        {
            Ok(address) => Ok((address, false)),
            Err(error) => match &self.config.fallback_deposit_address {
                Some(fallback) => {
                    tracing::warn!(
                        %error,
                        "deposit address lookup failed, using static fallback"
                    );
                    if let Some(operator) = &self.config.operator_email {
                        let (subject, body) =
                            messages::address_fallback_operator(&self.config.network, fallback);
                        if let Err(error) = self.sink.send(operator, &subject, &body).await {
                            tracing::warn!(%error, "failed to send fallback alert");
                        }
                    }
                    Ok((fallback.clone(), true))
                }
                None => Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use paydrift_gateway::testkit::{FakeExchange, RecordingSink};
    use paydrift_types::{Account, AmountBand, IntentStatus};
    use rust_decimal::Decimal;

    use crate::clock::ManualClock;

    struct Harness {
        service: IntentService,
        exchange: Arc<FakeExchange>,
        sink: Arc<RecordingSink>,
        intents: Arc<IntentStore>,
        accounts: Arc<AccountStore>,
        clock: Arc<ManualClock>,
    }

    fn harness(config: EngineConfig) -> Harness {
        let exchange = Arc::new(FakeExchange::new("TFresh"));
        let sink = Arc::new(RecordingSink::new());
        let intents = Arc::new(IntentStore::new());
        let accounts = Arc::new(AccountStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = IntentService::new(
            intents.clone(),
            accounts.clone(),
            exchange.clone(),
            sink.clone(),
            config,
            clock.clone(),
        );
        Harness {
            service,
            exchange,
            sink,
            intents,
            accounts,
            clock,
        }
    }

    async fn user(h: &Harness) -> UserId {
        let account = Account::new("Alice", "alice@example.com");
        let id = account.id;
        h.accounts.insert(account).await;
        id
    }

    #[tokio::test]
    async fn creates_intent_with_banded_amount() {
        let h = harness(EngineConfig::default());
        let owner = user(&h).await;

        let ticket = h
            .service
            .create_intent(owner, Some(Category::Gold), Some(Decimal::new(200, 0)))
            .await
            .unwrap();

        assert_eq!(ticket.address, "TFresh");
        assert!(!ticket.used_fallback);
        assert_eq!(ticket.intent.status, IntentStatus::Waiting);
        assert!(ticket.intent.expected_amount >= Decimal::new(301, 2));
        assert!(ticket.intent.expected_amount <= Decimal::new(399, 2));
        assert_eq!(ticket.intent.base_amount, Decimal::new(200, 0));
        assert_eq!(ticket.intent.category, Some(Category::Gold));
        assert_eq!(
            ticket.intent.expires_at,
            h.clock.now() + chrono::Duration::minutes(30)
        );

        // Instructions delivered with the exact amount.
        let sent = h.sink.sent_to("alice@example.com");
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .body
            .contains(&format!("EXACTLY {} USDT", ticket.intent.expected_amount)));
    }

    #[tokio::test]
    async fn base_amount_defaults_to_expected() {
        let h = harness(EngineConfig::default());
        let owner = user(&h).await;
        let ticket = h.service.create_intent(owner, None, None).await.unwrap();
        assert_eq!(ticket.intent.base_amount, ticket.intent.expected_amount);
    }

    #[tokio::test]
    async fn second_active_intent_rejected() {
        let h = harness(EngineConfig::default());
        let owner = user(&h).await;
        h.service.create_intent(owner, None, None).await.unwrap();

        let err = h.service.create_intent(owner, None, None).await.unwrap_err();
        assert!(matches!(err, PaydriftError::DuplicateActiveIntent { .. }));
        assert_eq!(h.intents.len().await, 1);
    }

    #[tokio::test]
    async fn expired_intent_frees_the_owner() {
        let h = harness(EngineConfig::default());
        let owner = user(&h).await;
        h.service.create_intent(owner, None, None).await.unwrap();

        h.clock.advance(chrono::Duration::minutes(31));
        h.service.create_intent(owner, None, None).await.unwrap();
        assert_eq!(h.intents.len().await, 2);
    }

    #[tokio::test]
    async fn amounts_are_distinct_across_waiting_intents() {
        let h = harness(EngineConfig::default());
        let mut amounts = std::collections::HashSet::new();
        for i in 0..20 {
            let account = Account::new(format!("U{i}"), format!("u{i}@example.com"));
            let id = account.id;
            h.accounts.insert(account).await;
            let ticket = h.service.create_intent(id, None, None).await.unwrap();
            assert!(
                amounts.insert(ticket.intent.expected_amount),
                "amount {} issued twice",
                ticket.intent.expected_amount
            );
        }
    }

    #[tokio::test]
    async fn saturated_band_exhausts_generation() {
        // A band with a single representable amount.
        let config = EngineConfig {
            amount_band: AmountBand {
                base: Decimal::new(3, 0),
                min_cents: 1,
                max_cents: 1,
                max_attempts: 5,
            },
            ..EngineConfig::default()
        };
        let h = harness(config);

        let first = user(&h).await;
        h.service.create_intent(first, None, None).await.unwrap();

        let account = Account::new("Bob", "bob@example.com");
        let second = account.id;
        h.accounts.insert(account).await;
        let err = h
            .service
            .create_intent(second, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaydriftError::AmountGenerationExhausted { attempts: 5 }
        ));
    }

    #[tokio::test]
    async fn address_fallback_is_flagged_and_alerts_operator() {
        let config = EngineConfig {
            fallback_deposit_address: Some("TStatic".to_string()),
            operator_email: Some("ops@example.com".to_string()),
            ..EngineConfig::default()
        };
        let h = harness(config);
        let owner = user(&h).await;
        h.exchange.break_address_lookup();

        let ticket = h.service.create_intent(owner, None, None).await.unwrap();
        assert_eq!(ticket.address, "TStatic");
        assert!(ticket.used_fallback);

        let ops = h.sink.sent_to("ops@example.com");
        assert_eq!(ops.len(), 1);
        assert!(ops[0].subject.contains("Fallback"));
        // Instructions still reached the user, with the fallback address.
        let sent = h.sink.sent_to("alice@example.com");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("TStatic"));
    }

    #[tokio::test]
    async fn no_fallback_propagates_gateway_error() {
        let h = harness(EngineConfig::default());
        let owner = user(&h).await;
        h.exchange.break_address_lookup();

        let err = h.service.create_intent(owner, None, None).await.unwrap_err();
        assert!(matches!(err, PaydriftError::GatewayRequest { .. }));
    }

    #[tokio::test]
    async fn unknown_owner_rejected_before_any_state_change() {
        let h = harness(EngineConfig::default());
        let err = h
            .service
            .create_intent(UserId::new(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaydriftError::AccountNotFound(_)));
        assert!(h.intents.is_empty().await);
    }

    #[tokio::test]
    async fn active_intent_lookup() {
        let h = harness(EngineConfig::default());
        let owner = user(&h).await;
        assert!(h.service.active_intent(owner).await.is_none());

        let ticket = h.service.create_intent(owner, None, None).await.unwrap();
        assert_eq!(
            h.service.active_intent(owner).await.unwrap().id,
            ticket.intent.id
        );
    }
}
