//! In-memory fakes for driving the engine without a network.
//!
//! Enabled with the `test-helpers` feature. [`FakeExchange`] is scripted:
//! tests push deposit events and flip failure switches; the engine sees a
//! perfectly ordinary gateway.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paydrift_types::{
    Address, DepositEvent, ExternalTxId, PaydriftError, Result, WithdrawalStatusEvent,
};
use rust_decimal::Decimal;

use crate::exchange::{ExchangeGateway, WithdrawalReceipt};
use crate::notify::NotificationSink;

/// A withdrawal the fake accepted.
#[derive(Debug, Clone)]
pub struct SubmittedWithdrawal {
    pub external_id: ExternalTxId,
    pub address: Address,
    pub amount: Decimal,
    pub network: String,
}

/// Scripted exchange gateway.
pub struct FakeExchange {
    address: Mutex<Option<Address>>,
    deposits: Mutex<Vec<DepositEvent>>,
    withdrawal_rows: Mutex<Vec<WithdrawalStatusEvent>>,
    submitted: Mutex<Vec<SubmittedWithdrawal>>,
    fail_withdrawals: AtomicBool,
    next_id: AtomicU64,
}

impl FakeExchange {
    /// A fake that resolves addresses to `address` and accepts withdrawals.
    #[must_use]
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: Mutex::new(Some(address.into())),
            deposits: Mutex::new(Vec::new()),
            withdrawal_rows: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            fail_withdrawals: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Make `deposit_address` fail until an address is set again.
    pub fn break_address_lookup(&self) {
        *self.address.lock().unwrap() = None;
    }

    /// Script a deposit event into the history.
    pub fn push_deposit(&self, event: DepositEvent) {
        self.deposits.lock().unwrap().push(event);
    }

    /// Script a withdrawal-history row.
    pub fn push_withdrawal_row(&self, event: WithdrawalStatusEvent) {
        self.withdrawal_rows.lock().unwrap().push(event);
    }

    /// Make `create_withdrawal` reject every submission.
    pub fn fail_withdrawals(&self, fail: bool) {
        self.fail_withdrawals.store(fail, Ordering::SeqCst);
    }

    /// Withdrawals the fake accepted, in submission order.
    #[must_use]
    pub fn submitted(&self) -> Vec<SubmittedWithdrawal> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeGateway for FakeExchange {
    async fn deposit_address(&self, _coin: &str, _network: &str) -> Result<Address> {
        self.address
            .lock()
            .unwrap()
            .clone()
            .ok_or(PaydriftError::GatewayRequest {
                reason: "address lookup unavailable".to_string(),
            })
    }

    async fn deposit_history(
        &self,
        coin: &str,
        network: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DepositEvent>> {
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.coin == coin
                    && e.network == network
                    && e.observed_at >= start
                    && end.is_none_or(|end| e.observed_at <= end)
            })
            .cloned()
            .collect())
    }

    async fn create_withdrawal(
        &self,
        address: &str,
        amount: Decimal,
        network: &str,
    ) -> Result<WithdrawalReceipt> {
        if self.fail_withdrawals.load(Ordering::SeqCst) {
            return Err(PaydriftError::GatewayRejected {
                reason: "withdrawal rejected by fake".to_string(),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let external_id = ExternalTxId::new(format!("FW{id}"));
        self.submitted.lock().unwrap().push(SubmittedWithdrawal {
            external_id: external_id.clone(),
            address: address.to_string(),
            amount,
            network: network.to_string(),
        });
        Ok(WithdrawalReceipt { external_id })
    }

    async fn withdrawal_history(
        &self,
        _coin: &str,
        _network: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalStatusEvent>> {
        Ok(self
            .withdrawal_rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.updated_at >= start)
            .cloned()
            .collect())
    }

    fn gateway_name(&self) -> &'static str {
        "fake"
    }
}

/// A message captured by [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Notification sink that records every message.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `send` fail (the engine must shrug it off).
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages captured so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages addressed to `recipient`.
    #[must_use]
    pub fn sent_to(&self, recipient: &str) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.recipient == recipient)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaydriftError::GatewayRequest {
                reason: "sink down".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}
