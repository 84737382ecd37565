//! # paydrift-store
//!
//! Durable collections for the Paydrift settlement core:
//!
//! 1. [`IntentStore`] — deposit intents, with the amount-uniqueness and
//!    one-active-intent-per-owner constraints enforced at this layer
//! 2. [`AccountStore`] — the user ledger: balance, eligibility, referral
//!    rewards, with atomic read-modify-write mutations
//! 3. [`WithdrawalStore`] — withdrawal records and their two status tracks
//!
//! All three are in-memory maps behind `tokio::sync::RwLock` — the
//! persistence engine is a deployment concern, but the *contract* each
//! store exposes (conditional updates, uniqueness checks inside one
//! critical section) is exactly what a backing database must provide via
//! unique indexes and conditional writes.

pub mod account_store;
pub mod intent_store;
pub mod withdrawal_store;

pub use account_store::{AccountStore, EligibilityGrant};
pub use intent_store::IntentStore;
pub use withdrawal_store::WithdrawalStore;
