//! # paydrift-engine
//!
//! The settlement core of Paydrift:
//!
//! 1. [`SettlementEngine`] — the polling reconciliation loop: fetch recent
//!    deposit events, match them against waiting intents by exact amount,
//!    apply idempotent settlement (balance credit, eligibility flip,
//!    referral payout), and expire stale intents
//! 2. [`IntentService`] — deposit-intent issuance with unique-amount
//!    generation and address delivery
//! 3. [`WithdrawalProcessor`] — tiered validation, atomic debit, gateway
//!    submission with compensating credit on failure, and the two
//!    independent status tracks
//! 4. [`scheduler::spawn_poll_loop`] — the recurring timer task
//!
//! The engine owns no I/O of its own: the gateway, the notification sink,
//! the stores, and the clock are all injected, so `poll()` is exercised in
//! tests with a scripted exchange and a manual clock.

pub mod clock;
pub mod dedup;
pub mod intent;
pub mod messages;
pub mod scheduler;
pub mod settlement;
pub mod withdrawal;

pub use clock::{Clock, SystemClock};
pub use dedup::SeenTxCache;
pub use intent::{IntentService, IntentTicket};
pub use settlement::SettlementEngine;
pub use withdrawal::WithdrawalProcessor;
