//! Wires the settlement core against the scripted exchange and runs a few
//! poll cycles, logging what the engine does.
//!
//! ```sh
//! cargo run -p paydrift-engine --example poll_demo --features test-helpers
//! ```

use std::sync::Arc;

use chrono::Utc;
use paydrift_engine::clock::ManualClock;
use paydrift_engine::{Clock, IntentService, SettlementEngine, WithdrawalProcessor};
use paydrift_gateway::testkit::{FakeExchange, RecordingSink};
use paydrift_store::{AccountStore, IntentStore, WithdrawalStore};
use paydrift_types::{
    Account, Category, DepositEvent, DepositEventStatus, EngineConfig, RewardSchedule,
    WithdrawalPolicy,
};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let exchange = Arc::new(FakeExchange::new("TDemoSharedAddress"));
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
        intents,
        accounts.clone(),
        exchange.clone(),
        sink.clone(),
        config.clone(),
        clock.clone(),
    );
    let processor = WithdrawalProcessor::new(
        accounts.clone(),
        withdrawals,
        exchange.clone(),
        sink.clone(),
        config,
        WithdrawalPolicy::default(),
        clock.clone(),
    );

    // A referrer and a referred user.
    let rita = Account::new("Rita", "rita@example.com");
    let rita_id = rita.id;
    accounts.insert(rita).await;
    let alice = Account::new("Alice", "alice@example.com").referred_by(rita_id);
    let alice_id = alice.id;
    accounts.insert(alice).await;

    // Alice asks to deposit for a Silver package.
    let ticket = intent_service
        .create_intent(alice_id, Some(Category::Silver), Some(Decimal::new(100, 0)))
        .await
        .expect("intent creation");
    tracing::info!(
        amount = %ticket.intent.expected_amount,
        address = %ticket.address,
        "intent issued"
    );

    // The exact amount lands on the shared address.
    exchange.push_deposit(DepositEvent {
        tx_id: "demo-tx-1".into(),
        amount: ticket.intent.expected_amount,
        status: DepositEventStatus::Confirmed,
        coin: "USDT".to_string(),
        network: "TRX".to_string(),
        observed_at: clock.now(),
    });

    // Two cycles: the second demonstrates replay idempotence.
    engine.poll().await;
    engine.poll().await;

    let account = accounts.get(alice_id).await.expect("account");
    tracing::info!(
        balance = %account.balance,
        eligible = account.eligible,
        "alice after settlement"
    );

    // Alice runs the introductory withdrawal.
    let record = processor
        .request(alice_id, Decimal::ONE, "TAliceWallet", "TRX")
        .await
        .expect("introductory withdrawal");
    tracing::info!(
        withdrawal = %record.id,
        transfer = %record.transfer_status,
        "withdrawal submitted"
    );

    tracing::info!(
        notifications = sink.sent().len(),
        "demo finished"
    );
}
