//! The recurring poll task.
//!
//! One timer drives the settlement engine. The first tick fires
//! immediately (a freshly started service reconciles right away), missed
//! ticks are skipped rather than bursted, and the engine's own
//! single-flight gate means an overlapping tick can never stack a second
//! cycle on top of a slow one.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::settlement::SettlementEngine;

/// Spawn the poll loop. Flip the `shutdown` channel to `true` (or drop its
/// sender) to stop it.
pub fn spawn_poll_loop(
    engine: Arc<SettlementEngine>,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = interval.as_secs(), "settlement poll loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => engine.poll().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("settlement poll loop stopped");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use paydrift_gateway::testkit::{FakeExchange, RecordingSink};
    use paydrift_store::{AccountStore, IntentStore};
    use paydrift_types::{
        Account, DepositEvent, DepositEventStatus, DepositIntent, EngineConfig, ExternalTxId,
        IntentStatus, RewardSchedule,
    };
    use rust_decimal::Decimal;

    use crate::clock::SystemClock;

    #[tokio::test]
    async fn loop_polls_and_stops_on_shutdown() {
        let exchange = Arc::new(FakeExchange::new("TShared"));
        let intents = Arc::new(IntentStore::new());
        let accounts = Arc::new(AccountStore::new());

        let account = Account::new("Alice", "alice@example.com");
        let owner = account.id;
        accounts.insert(account).await;

        let now = Utc::now();
        let intent = DepositIntent::new(
            owner,
            Decimal::new(347, 2),
            Decimal::new(100, 0),
            None,
            "USDT",
            "TRX",
            now,
            Duration::minutes(30),
        );
        let intent_id = intent.id;
        intents.insert(intent, now).await.unwrap();

        exchange.push_deposit(DepositEvent {
            tx_id: ExternalTxId::from("X1"),
            amount: Decimal::new(347, 2),
            status: DepositEventStatus::Confirmed,
            coin: "USDT".to_string(),
            network: "TRX".to_string(),
            observed_at: now,
        });

        let engine = Arc::new(SettlementEngine::new(
            exchange,
            Arc::new(RecordingSink::new()),
            intents.clone(),
            accounts,
            EngineConfig::default(),
            RewardSchedule::default(),
            Arc::new(SystemClock),
        ));

        let (tx, rx) = watch::channel(false);
        let handle = spawn_poll_loop(engine, std::time::Duration::from_millis(10), rx);

        // The immediate first tick settles the scripted deposit.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(
            intents.get(intent_id).await.unwrap().status,
            IntentStatus::Completed
        );

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn loop_stops_when_sender_dropped() {
        let engine = Arc::new(SettlementEngine::new(
            Arc::new(FakeExchange::new("TShared")),
            Arc::new(RecordingSink::new()),
            Arc::new(IntentStore::new()),
            Arc::new(AccountStore::new()),
            EngineConfig::default(),
            RewardSchedule::default(),
            Arc::new(SystemClock),
        ));

        let (tx, rx) = watch::channel(false);
        let handle = spawn_poll_loop(engine, std::time::Duration::from_millis(10), rx);
        drop(tx);
        handle.await.unwrap();
    }
}
