//! # paydrift-types
//!
//! Shared types, errors, and configuration for the **Paydrift** settlement
//! core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`IntentId`], [`WithdrawalId`], [`ExternalTxId`], [`Address`]
//! - **Intent model**: [`DepositIntent`], [`IntentStatus`]
//! - **Ledger model**: [`Account`], [`Category`], [`ReferralReward`]
//! - **Withdrawal model**: [`WithdrawalRecord`], [`ReviewStatus`], [`TransferStatus`]
//! - **External events**: [`DepositEvent`], [`DepositEventStatus`], [`WithdrawalStatusEvent`]
//! - **Configuration**: [`EngineConfig`], [`AmountBand`], [`RewardSchedule`], [`WithdrawalPolicy`]
//! - **Errors**: [`PaydriftError`] with `PD_ERR_` prefix codes
//! - **Constants**: system-wide timing and business defaults

pub mod account;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod intent;
pub mod money;
pub mod withdrawal;

// Re-export all primary types at crate root for ergonomic imports:
//   use paydrift_types::{DepositIntent, Account, WithdrawalRecord, ...};

pub use account::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use intent::*;
pub use money::*;
pub use withdrawal::*;

// Constants are accessed via `paydrift_types::constants::FOO`
// (not re-exported to avoid name collisions).
