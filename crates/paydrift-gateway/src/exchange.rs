//! Exchange gateway port.
//!
//! Everything Paydrift asks of the custodial exchange goes through this
//! trait: reading the shared account's deposit history, resolving the
//! current deposit address, submitting withdrawals, and reading withdrawal
//! history for status sync. Implementations must filter history rows to
//! the requested coin and network so the engine never sees foreign events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paydrift_types::{Address, DepositEvent, ExternalTxId, Result, WithdrawalStatusEvent};
use rust_decimal::Decimal;

/// The exchange's acknowledgement of a withdrawal submission.
#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    /// Exchange-assigned id for the submitted transfer.
    pub external_id: ExternalTxId,
}

/// Outbound calls to the custodial exchange.
///
/// All methods carry the implementation's bounded timeout; a timed-out
/// call surfaces as [`paydrift_types::PaydriftError::GatewayTimeout`] and
/// must be treated as *ambiguous* by callers — the exchange may still have
/// executed it.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Resolve the current deposit address for `(coin, network)`.
    async fn deposit_address(&self, coin: &str, network: &str) -> Result<Address>;

    /// Deposit events recorded between `start` and `end` (or now, when
    /// `end` is `None`), filtered to `(coin, network)`.
    async fn deposit_history(
        &self,
        coin: &str,
        network: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DepositEvent>>;

    /// Submit a withdrawal transfer.
    async fn create_withdrawal(
        &self,
        address: &str,
        amount: Decimal,
        network: &str,
    ) -> Result<WithdrawalReceipt>;

    /// Withdrawal rows updated since `start`, filtered to `(coin, network)`.
    async fn withdrawal_history(
        &self,
        coin: &str,
        network: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<WithdrawalStatusEvent>>;

    /// Gateway name for logging/debugging.
    fn gateway_name(&self) -> &'static str;
}
