//! End-to-end integration tests across the settlement core.
//!
//! These tests exercise the full cycle with a scripted exchange and a
//! manual clock:
//! intent issuance -> external deposit -> poll -> settlement (reward +
//! referral) -> withdrawal -> review/transfer tracking -> expiry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use paydrift_engine::clock::ManualClock;
use paydrift_engine::{Clock, IntentService, SettlementEngine, WithdrawalProcessor};
use paydrift_gateway::testkit::{FakeExchange, RecordingSink};
use paydrift_store::{AccountStore, IntentStore, WithdrawalStore};
use paydrift_types::*;
use rust_decimal::Decimal;

/// Helper: the whole wired-up core over shared stores.
struct World {
    exchange: Arc<FakeExchange>,
    sink: Arc<RecordingSink>,
    intents: Arc<IntentStore>,
    accounts: Arc<AccountStore>,
    withdrawals: Arc<WithdrawalStore>,
    clock: Arc<ManualClock>,
    engine: Arc<SettlementEngine>,
    intent_service: IntentService,
    processor: WithdrawalProcessor,
}

impl World {
    fn new() -> Self {
        let exchange = Arc::new(FakeExchange::new("TShared"));
        let sink = Arc::new(RecordingSink::new());
        let intents = Arc::new(IntentStore::new());
        let accounts = Arc::new(AccountStore::new());
        let withdrawals = Arc::new(WithdrawalStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = EngineConfig {
            operator_email: Some("ops@example.com".to_string()),
            ..EngineConfig::default()
        };

        let engine = Arc::new(SettlementEngine::new(
            exchange.clone(),
            sink.clone(),
            intents.clone(),
            accounts.clone(),
            config.clone(),
            RewardSchedule::default(),
            clock.clone(),
        ));
        let intent_service = IntentService::new(
            intents.clone(),
            accounts.clone(),
            exchange.clone(),
            sink.clone(),
            config.clone(),
            clock.clone(),
        );
        let processor = WithdrawalProcessor::new(
            accounts.clone(),
            withdrawals.clone(),
            exchange.clone(),
            sink.clone(),
            config,
            WithdrawalPolicy::default(),
            clock.clone(),
        );

        Self {
            exchange,
            sink,
            intents,
            accounts,
            withdrawals,
            clock,
            engine,
            intent_service,
            processor,
        }
    }

    async fn signup(&self, name: &str) -> UserId {
        let account = Account::new(name, format!("{}@example.com", name.to_lowercase()));
        let id = account.id;
        self.accounts.insert(account).await;
        id
    }

    async fn signup_referred(&self, name: &str, referrer: UserId) -> UserId {
        let account = Account::new(name, format!("{}@example.com", name.to_lowercase()))
            .referred_by(referrer);
        let id = account.id;
        self.accounts.insert(account).await;
        id
    }

    /// Script a confirmed deposit of exactly `amount` at the current time.
    fn wire_deposit(&self, tx: &str, amount: Decimal) {
        self.exchange.push_deposit(DepositEvent {
            tx_id: ExternalTxId::from(tx),
            amount,
            status: DepositEventStatus::Confirmed,
            coin: "USDT".to_string(),
            network: "TRX".to_string(),
            observed_at: self.clock.now(),
        });
    }
}

// =============================================================================
// Test: the full deposit cycle — intent, match, reward, referral payout
// =============================================================================
#[tokio::test]
async fn e2e_deposit_cycle_with_referral() {
    let world = World::new();

    let referrer = world.signup("Rita").await;
    let alice = world.signup_referred("Alice", referrer).await;

    // Alice buys a Silver package priced 100.
    let ticket = world
        .intent_service
        .create_intent(alice, Some(Category::Silver), Some(Decimal::new(100, 0)))
        .await
        .expect("intent creation should succeed");
    assert_eq!(ticket.address, "TShared");

    // She sends exactly the promised amount.
    world.wire_deposit("X1", ticket.intent.expected_amount);
    world.engine.poll().await;

    // Intent settled.
    let intent = world.intents.get(ticket.intent.id).await.unwrap();
    assert_eq!(intent.status, IntentStatus::Completed);
    assert_eq!(intent.external_tx_id, Some(ExternalTxId::from("X1")));

    // Alice: eligible, Silver, credited round2(100 × 0.25) = 25.00.
    let account = world.accounts.get(alice).await.unwrap();
    assert!(account.eligible);
    assert_eq!(account.category, Some(Category::Silver));
    assert_eq!(account.balance, Decimal::new(2500, 2));

    // Rita: flat referral match, recorded.
    let rita = world.accounts.get(referrer).await.unwrap();
    assert_eq!(rita.balance, Decimal::new(2500, 2));
    assert_eq!(rita.referral_rewards.len(), 1);
    assert_eq!(rita.referral_rewards[0].referred_user, alice);

    // Alice got instructions + confirmation; the operator got a notice.
    assert_eq!(world.sink.sent_to("alice@example.com").len(), 2);
    assert_eq!(world.sink.sent_to("ops@example.com").len(), 1);
}

// =============================================================================
// Test: replayed deposit event settles exactly once
// =============================================================================
#[tokio::test]
async fn e2e_replayed_event_is_idempotent() {
    let world = World::new();
    let alice = world.signup("Alice").await;

    let ticket = world
        .intent_service
        .create_intent(alice, Some(Category::Silver), Some(Decimal::new(100, 0)))
        .await
        .unwrap();
    world.wire_deposit("X1", ticket.intent.expected_amount);

    // The lookback window re-delivers X1 on every following cycle.
    world.engine.poll().await;
    world.engine.poll().await;
    world.engine.poll().await;

    let account = world.accounts.get(alice).await.unwrap();
    assert_eq!(account.balance, Decimal::new(2500, 2));
    // Instructions + exactly one confirmation.
    assert_eq!(world.sink.sent_to("alice@example.com").len(), 2);
}

// =============================================================================
// Test: first withdrawal takes the introductory amount, referrals or not
// =============================================================================
#[tokio::test]
async fn e2e_first_withdrawal_exact_amount() {
    let world = World::new();
    let alice = world.signup("Alice").await;
    world
        .accounts
        .credit(alice, Decimal::new(100, 0))
        .await
        .unwrap();

    let record = world
        .processor
        .request(alice, Decimal::ONE, "TDest", "TRX")
        .await
        .expect("introductory withdrawal should pass with zero referrals");
    assert_eq!(record.amount, Decimal::ONE);
    assert_eq!(
        world.accounts.balance(alice).await.unwrap(),
        Decimal::new(99, 0)
    );
}

// =============================================================================
// Test: the second withdrawal demands a referral reward
// =============================================================================
#[tokio::test]
async fn e2e_second_withdrawal_needs_referral() {
    let world = World::new();
    let alice = world.signup("Alice").await;
    world
        .accounts
        .credit(alice, Decimal::new(100, 0))
        .await
        .unwrap();
    world
        .processor
        .request(alice, Decimal::ONE, "TDest", "TRX")
        .await
        .unwrap();

    let err = world
        .processor
        .request(alice, Decimal::new(5, 0), "TDest", "TRX")
        .await
        .unwrap_err();
    assert!(matches!(err, PaydriftError::ReferralRequired));
}

// =============================================================================
// Test: gateway rejection restores the balance and persists nothing
// =============================================================================
#[tokio::test]
async fn e2e_failed_submission_compensates() {
    let world = World::new();
    let alice = world.signup("Alice").await;
    world
        .accounts
        .credit(alice, Decimal::new(100, 0))
        .await
        .unwrap();
    world.exchange.fail_withdrawals(true);

    let err = world
        .processor
        .request(alice, Decimal::ONE, "TDest", "TRX")
        .await
        .unwrap_err();
    assert!(matches!(err, PaydriftError::GatewayRejected { .. }));

    assert_eq!(
        world.accounts.balance(alice).await.unwrap(),
        Decimal::new(100, 0)
    );
    assert_eq!(world.withdrawals.len().await, 0);

    // And a retry succeeds once the gateway recovers — it is still the
    // first withdrawal, so the introductory amount applies.
    world.exchange.fail_withdrawals(false);
    world
        .processor
        .request(alice, Decimal::ONE, "TDest", "TRX")
        .await
        .expect("retry after gateway recovery");
}

// =============================================================================
// Test: expiry — a swept intent never settles, even on a late deposit
// =============================================================================
#[tokio::test]
async fn e2e_expired_intent_never_completes() {
    let world = World::new();
    let alice = world.signup("Alice").await;
    let ticket = world
        .intent_service
        .create_intent(alice, None, None)
        .await
        .unwrap();

    // Past the TTL; the sweep runs inside poll.
    world.clock.advance(Duration::minutes(31));
    world.engine.poll().await;
    assert_eq!(
        world.intents.get(ticket.intent.id).await.unwrap().status,
        IntentStatus::Expired
    );

    // The matching deposit shows up afterwards: logged as unmatched.
    world.wire_deposit("LATE", ticket.intent.expected_amount);
    world.engine.poll().await;

    let intent = world.intents.get(ticket.intent.id).await.unwrap();
    assert_eq!(intent.status, IntentStatus::Expired);
    assert!(intent.external_tx_id.is_none());
    assert_eq!(
        world.accounts.balance(alice).await.unwrap(),
        Decimal::ZERO
    );

    // The amount is free again for a fresh intent.
    let second = world
        .intent_service
        .create_intent(alice, None, None)
        .await
        .unwrap();
    assert_eq!(second.intent.status, IntentStatus::Waiting);
}

// =============================================================================
// Test: waiting intents never share an amount, one active per owner
// =============================================================================
#[tokio::test]
async fn e2e_intent_invariants_hold() {
    let world = World::new();

    let mut amounts = std::collections::HashSet::new();
    for i in 0..15 {
        let user = world.signup(&format!("User{i}")).await;
        let ticket = world
            .intent_service
            .create_intent(user, None, None)
            .await
            .unwrap();
        assert!(
            amounts.insert(ticket.intent.expected_amount),
            "two waiting intents share amount {}",
            ticket.intent.expected_amount
        );

        // A second active intent for the same owner is a conflict.
        let err = world
            .intent_service
            .create_intent(user, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaydriftError::DuplicateActiveIntent { .. }));
    }
}

// =============================================================================
// Test: deposit -> reward -> withdrawal -> review -> transfer completion
// =============================================================================
#[tokio::test]
async fn e2e_full_lifecycle() {
    let world = World::new();

    let referrer = world.signup("Rita").await;
    let alice = world.signup_referred("Alice", referrer).await;

    // Qualifying Gold deposit, base 200: reward = 200 × 0.30 = 60.00.
    let ticket = world
        .intent_service
        .create_intent(alice, Some(Category::Gold), Some(Decimal::new(200, 0)))
        .await
        .unwrap();
    world.wire_deposit("X1", ticket.intent.expected_amount);
    world.engine.poll().await;
    assert_eq!(
        world.accounts.balance(alice).await.unwrap(),
        Decimal::new(6000, 2)
    );

    // Alice clears the introductory withdrawal, but a real one is gated on
    // referral rewards, which she has none of.
    world
        .processor
        .request(alice, Decimal::ONE, "TDest", "TRX")
        .await
        .unwrap();
    let err = world
        .processor
        .request(alice, Decimal::new(20, 0), "TDest", "TRX")
        .await
        .unwrap_err();
    assert!(matches!(err, PaydriftError::ReferralRequired));

    // Rita has the referral reward; after her introductory withdrawal she
    // still needs a category for the bracket table, gained by her own
    // qualifying deposit.
    world
        .processor
        .request(referrer, Decimal::ONE, "TDest", "TRX")
        .await
        .unwrap();
    let rita_ticket = world
        .intent_service
        .create_intent(referrer, Some(Category::Silver), Some(Decimal::new(100, 0)))
        .await
        .unwrap();
    world.wire_deposit("X2", rita_ticket.intent.expected_amount);
    world.engine.poll().await;

    // Rita balance: 60 (referral) - 1 (intro) + 25 (own reward) = 84.
    assert_eq!(
        world.accounts.balance(referrer).await.unwrap(),
        Decimal::new(8400, 2)
    );

    let record = world
        .processor
        .request(referrer, Decimal::new(50, 0), "TDest", "TRX")
        .await
        .expect("Silver level 1 allows up to 50");

    // Operator approves; the exchange later confirms the transfer.
    world
        .processor
        .update_review_status(record.id, ReviewStatus::Approved)
        .await
        .unwrap();
    world
        .exchange
        .push_withdrawal_row(WithdrawalStatusEvent {
            external_id: record.external_tx_id.clone().unwrap(),
            status: "completed".to_string(),
            updated_at: world.clock.now(),
        });
    let advanced = world
        .processor
        .sync_transfer_statuses(world.clock.now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(advanced, 1);

    let stored = world.withdrawals.get(record.id).await.unwrap();
    assert_eq!(stored.review_status, ReviewStatus::Approved);
    assert_eq!(stored.transfer_status, TransferStatus::Completed);
    assert_eq!(stored.external_status.as_deref(), Some("completed"));
}

// =============================================================================
// Test: a second qualifying deposit never re-credits the reward
// =============================================================================
#[tokio::test]
async fn e2e_reward_granted_at_most_once() {
    let world = World::new();
    let alice = world.signup("Alice").await;

    let first = world
        .intent_service
        .create_intent(alice, Some(Category::Silver), Some(Decimal::new(100, 0)))
        .await
        .unwrap();
    world.wire_deposit("X1", first.intent.expected_amount);
    world.engine.poll().await;
    assert_eq!(
        world.accounts.balance(alice).await.unwrap(),
        Decimal::new(2500, 2)
    );

    // Second intent and deposit: completes, no second reward.
    let second = world
        .intent_service
        .create_intent(alice, Some(Category::Platinum), Some(Decimal::new(500, 0)))
        .await
        .unwrap();
    world.wire_deposit("X2", second.intent.expected_amount);
    world.engine.poll().await;

    assert_eq!(
        world.intents.get(second.intent.id).await.unwrap().status,
        IntentStatus::Completed
    );
    let account = world.accounts.get(alice).await.unwrap();
    assert_eq!(account.balance, Decimal::new(2500, 2));
    // Category stays what the first deposit set.
    assert_eq!(account.category, Some(Category::Silver));
}
