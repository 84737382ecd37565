//! Error types for the Paydrift settlement core.
//!
//! All errors use the `PD_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Intent errors
//! - 2xx: Ledger / balance errors
//! - 3xx: Withdrawal errors
//! - 4xx: Gateway errors
//! - 5xx: Settlement errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    Category, ExternalTxId, IntentStatus, ReviewStatus, TransferStatus, UserId, WithdrawalId,
};

/// Central error enum for all Paydrift operations.
#[derive(Debug, Error)]
pub enum PaydriftError {
    // =================================================================
    // Intent Errors (1xx)
    // =================================================================
    /// The requested intent was not found.
    #[error("PD_ERR_100: Intent not found: {0}")]
    IntentNotFound(crate::IntentId),

    /// The owner already has an active (waiting, unexpired) intent.
    #[error("PD_ERR_101: Owner {owner} already has an active deposit intent")]
    DuplicateActiveIntent { owner: UserId },

    /// The sampled amount is already promised to another waiting intent.
    #[error("PD_ERR_102: Amount {amount} is already reserved by a waiting intent")]
    AmountCollision { amount: Decimal },

    /// Amount generation ran out of attempts — the active band is saturated.
    #[error("PD_ERR_103: Unable to generate a unique deposit amount after {attempts} attempts")]
    AmountGenerationExhausted { attempts: usize },

    /// An intent state transition that the lifecycle forbids.
    #[error("PD_ERR_104: Invalid intent transition: {from} -> {to}")]
    InvalidIntentTransition { from: IntentStatus, to: IntentStatus },

    // =================================================================
    // Ledger / Balance Errors (2xx)
    // =================================================================
    /// No ledger entry exists for this user.
    #[error("PD_ERR_200: Account not found: {0}")]
    AccountNotFound(UserId),

    /// Not enough balance to perform the debit.
    #[error("PD_ERR_201: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// A balance operation would produce a negative value.
    #[error("PD_ERR_202: Balance underflow")]
    BalanceUnderflow,

    // =================================================================
    // Withdrawal Errors (3xx)
    // =================================================================
    /// The requested amount is not positive.
    #[error("PD_ERR_300: Withdrawal amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },

    /// No destination address supplied.
    #[error("PD_ERR_301: Withdrawal address must not be empty")]
    MissingAddress,

    /// The requested network is not supported.
    #[error("PD_ERR_302: Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// A first-ever withdrawal must be for the fixed introductory amount.
    #[error("PD_ERR_303: First withdrawal must be exactly {required}")]
    FirstWithdrawalAmountMismatch { required: Decimal },

    /// Subsequent withdrawals require at least one recorded referral reward.
    #[error("PD_ERR_304: At least one referral reward is required after the first withdrawal")]
    ReferralRequired,

    /// Below the minimum withdrawal for non-introductory requests.
    #[error("PD_ERR_305: Withdrawal amount below minimum {min}")]
    BelowMinimum { min: Decimal },

    /// Above the cap for the owner's category and level bracket.
    #[error("PD_ERR_306: Withdrawal amount exceeds cap {cap} for {category} level {level}")]
    AboveBracketCap {
        cap: Decimal,
        category: Category,
        level: u32,
    },

    /// The owner's category/level maps to no withdrawal bracket.
    #[error("PD_ERR_307: No withdrawal bracket for category {category:?}, level {level}")]
    NoWithdrawalBracket {
        category: Option<Category>,
        level: u32,
    },

    /// The requested withdrawal record was not found.
    #[error("PD_ERR_308: Withdrawal not found: {0}")]
    WithdrawalNotFound(WithdrawalId),

    /// A review state transition that the lifecycle forbids.
    #[error("PD_ERR_309: Invalid review transition: {from} -> {to}")]
    InvalidReviewTransition { from: ReviewStatus, to: ReviewStatus },

    /// A transfer state transition that the lifecycle forbids.
    #[error("PD_ERR_310: Invalid transfer transition: {from} -> {to}")]
    InvalidTransferTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    // =================================================================
    // Gateway Errors (4xx)
    // =================================================================
    /// The outbound request itself failed (connection, TLS, DNS).
    #[error("PD_ERR_400: Gateway request failed: {reason}")]
    GatewayRequest { reason: String },

    /// The exchange rejected the call.
    #[error("PD_ERR_401: Gateway rejected request: {reason}")]
    GatewayRejected { reason: String },

    /// The call exceeded its bounded timeout. Ambiguous: the exchange may
    /// still have executed it.
    #[error("PD_ERR_402: Gateway call timed out")]
    GatewayTimeout,

    /// The exchange answered with a body we could not decode.
    #[error("PD_ERR_403: Malformed gateway response: {reason}")]
    GatewayResponse { reason: String },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// The external transaction has already settled an intent.
    #[error("PD_ERR_500: External transaction already settled: {0}")]
    DuplicateExternalTx(ExternalTxId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("PD_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("PD_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("PD_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PaydriftError>;

impl PaydriftError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Conflict errors (another intent holds the resource) and transient
    /// gateway failures are retryable; validation failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateActiveIntent { .. }
                | Self::AmountCollision { .. }
                | Self::AmountGenerationExhausted { .. }
                | Self::GatewayRequest { .. }
                | Self::GatewayTimeout
        )
    }
}
