//! External events observed through the exchange gateway.
//!
//! These are Paydrift's view of the exchange's deposit and withdrawal
//! history rows, already filtered to the coin/network the engine cares
//! about and with the exchange's numeric status codes decoded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ExternalTxId;

/// Status of an external deposit event.
///
/// The exchange reports integer codes; only code `1` ("success") settles.
/// Everything else is ignored by the engine and retried on a later poll if
/// it confirms while still inside the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositEventStatus {
    /// Code 0: seen on-chain, not yet credited.
    Pending,
    /// Code 1: credited and final.
    Confirmed,
    /// Any other code the exchange may emit.
    Other(i64),
}

impl DepositEventStatus {
    /// Decode the exchange's integer status code.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Confirmed,
            other => Self::Other(other),
        }
    }

    /// Only confirmed events are settleable.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// A deposit observed in the exchange account's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    /// Exchange-assigned transaction id; the de-duplication key.
    pub tx_id: ExternalTxId,
    /// Amount received. Matched exactly against intent `expected_amount`.
    pub amount: Decimal,
    /// Decoded exchange status.
    pub status: DepositEventStatus,
    /// Coin symbol.
    pub coin: String,
    /// Network the deposit arrived on.
    pub network: String,
    /// When the exchange recorded the deposit.
    pub observed_at: DateTime<Utc>,
}

/// A withdrawal row from the exchange's history, used to advance
/// transfer statuses on our records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalStatusEvent {
    /// Exchange-assigned withdrawal id (matches `WithdrawalRecord::external_tx_id`).
    pub external_id: ExternalTxId,
    /// Raw status string as the exchange reports it (e.g. "completed").
    pub status: String,
    /// When the exchange last updated the row.
    pub updated_at: DateTime<Utc>,
}
