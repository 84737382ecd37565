//! System-wide constants for the Paydrift settlement core.

/// Settlement poll cadence in seconds (2 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

/// Deposit-history lookback window in minutes. Deliberately larger than
/// the poll cadence so consecutive windows overlap and no event can fall
/// between polls.
pub const DEPOSIT_LOOKBACK_MINS: i64 = 10;

/// Deposit-intent lifetime in minutes.
pub const INTENT_TTL_MINS: i64 = 30;

/// Whole-unit base of the generated deposit amount (amounts are
/// `base + cents/100`).
pub const AMOUNT_BAND_BASE: i64 = 3;

/// Smallest fractional step of the amount band, in cents.
pub const AMOUNT_BAND_MIN_CENTS: i64 = 1;

/// Largest fractional step of the amount band, in cents.
pub const AMOUNT_BAND_MAX_CENTS: i64 = 99;

/// Maximum random samples before amount generation gives up. Exhaustion
/// means the active band is saturated and should be widened.
pub const AMOUNT_GENERATION_ATTEMPTS: usize = 100;

/// Seen-transaction cache size (number of external tx ids to remember).
pub const SEEN_TX_CACHE_SIZE: usize = 10_000;

/// Bounded timeout for any single exchange gateway call, in seconds.
pub const GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Default coin symbol.
pub const DEFAULT_COIN: &str = "USDT";

/// Default (and currently only supported) withdrawal/deposit network.
pub const DEFAULT_NETWORK: &str = "TRX";

/// Points required per user level.
pub const POINTS_PER_LEVEL: u64 = 5_000;

/// Level cap.
pub const MAX_LEVEL: u32 = 100;

/// Currency scale: balances and rewards are normalized to 2 decimals.
pub const CURRENCY_SCALE: u32 = 2;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Paydrift";
