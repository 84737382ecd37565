//! Configuration types for the Paydrift settlement core.
//!
//! The reward-rate and withdrawal-limit tables are static business
//! configuration: serde-able so a deployment can override them at startup,
//! but not mutated at runtime.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, Address, Category};

/// Engine-wide settings: coin/network, timing windows, and the deposit
/// amount band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Coin symbol deposits and withdrawals are denominated in.
    pub coin: String,
    /// The single supported network.
    pub network: String,
    /// Settlement poll cadence in seconds.
    pub poll_interval_secs: u64,
    /// Deposit-history lookback in minutes. Must exceed the poll cadence
    /// so windows overlap.
    pub lookback_mins: i64,
    /// Intent lifetime in minutes.
    pub intent_ttl_mins: i64,
    /// Amount band for intent generation.
    pub amount_band: AmountBand,
    /// Static deposit address used when the gateway lookup fails.
    /// Correlation still works (the amount is the key), but operators are
    /// alerted because an address rotation on the exchange side would not
    /// be reflected.
    pub fallback_deposit_address: Option<Address>,
    /// Operator notification address, if any.
    pub operator_email: Option<String>,
    /// Bound on entries in the in-memory seen-transaction cache.
    pub seen_tx_cache_size: usize,
}

impl EngineConfig {
    /// Lookback window as a `chrono::Duration`.
    #[must_use]
    pub fn lookback(&self) -> Duration {
        Duration::minutes(self.lookback_mins)
    }

    /// Intent TTL as a `chrono::Duration`.
    #[must_use]
    pub fn intent_ttl(&self) -> Duration {
        Duration::minutes(self.intent_ttl_mins)
    }

    /// Poll cadence as a `std::time::Duration` for the scheduler.
    #[must_use]
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coin: constants::DEFAULT_COIN.to_string(),
            network: constants::DEFAULT_NETWORK.to_string(),
            poll_interval_secs: constants::DEFAULT_POLL_INTERVAL_SECS,
            lookback_mins: constants::DEPOSIT_LOOKBACK_MINS,
            intent_ttl_mins: constants::INTENT_TTL_MINS,
            amount_band: AmountBand::default(),
            fallback_deposit_address: None,
            operator_email: None,
            seen_tx_cache_size: constants::SEEN_TX_CACHE_SIZE,
        }
    }
}

/// The narrow band deposit amounts are sampled from: `base + cents/100`
/// with `cents` uniform in `[min_cents, max_cents]`.
///
/// The band bounds how many intents can be simultaneously active; the
/// intent TTL bounds how long each amount stays reserved. Exhaustion of
/// generation attempts is the signal to widen the band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountBand {
    /// Whole-unit base of every generated amount.
    pub base: Decimal,
    /// Smallest fractional step, in cents (inclusive).
    pub min_cents: i64,
    /// Largest fractional step, in cents (inclusive).
    pub max_cents: i64,
    /// Sampling attempts before giving up.
    pub max_attempts: usize,
}

impl AmountBand {
    /// The amount for a given cent offset.
    #[must_use]
    pub fn amount_for(&self, cents: i64) -> Decimal {
        self.base + Decimal::new(cents, 2)
    }

    /// Number of distinct amounts the band can represent.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn capacity(&self) -> usize {
        (self.max_cents - self.min_cents + 1).max(0) as usize
    }
}

impl Default for AmountBand {
    fn default() -> Self {
        Self {
            base: Decimal::new(constants::AMOUNT_BAND_BASE, 0),
            min_cents: constants::AMOUNT_BAND_MIN_CENTS,
            max_cents: constants::AMOUNT_BAND_MAX_CENTS,
            max_attempts: constants::AMOUNT_GENERATION_ATTEMPTS,
        }
    }
}

/// Referral reward rates per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub silver: Decimal,
    pub gold: Decimal,
    pub platinum: Decimal,
}

impl RewardSchedule {
    /// Rate for a (possibly absent) category. No category earns nothing.
    #[must_use]
    pub fn rate(&self, category: Option<Category>) -> Decimal {
        match category {
            Some(Category::Silver) => self.silver,
            Some(Category::Gold) => self.gold,
            Some(Category::Platinum) => self.platinum,
            None => Decimal::ZERO,
        }
    }
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            silver: Decimal::new(25, 2),   // 0.25
            gold: Decimal::new(30, 2),     // 0.30
            platinum: Decimal::new(30, 2), // 0.30
        }
    }
}

/// A single level bracket within a category's withdrawal table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelBracket {
    /// Lowest level in the bracket (inclusive).
    pub min_level: u32,
    /// Highest level in the bracket (inclusive).
    pub max_level: u32,
    /// Maximum withdrawal amount for the bracket.
    pub cap: Decimal,
}

/// Tiered withdrawal limits.
///
/// The first-ever withdrawal must be exactly `first_amount`. After that,
/// requests must fall within `[min_amount, cap]` where the cap comes from
/// the owner's `(category, level)` bracket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalPolicy {
    /// Exact amount required for a user's first withdrawal.
    pub first_amount: Decimal,
    /// Minimum for every subsequent withdrawal.
    pub min_amount: Decimal,
    /// Three increasing brackets per category.
    pub silver: Vec<LevelBracket>,
    pub gold: Vec<LevelBracket>,
    pub platinum: Vec<LevelBracket>,
}

impl WithdrawalPolicy {
    /// Cap for the given category and level, or `None` if no bracket covers
    /// the combination.
    #[must_use]
    pub fn cap(&self, category: Category, level: u32) -> Option<Decimal> {
        let brackets = match category {
            Category::Silver => &self.silver,
            Category::Gold => &self.gold,
            Category::Platinum => &self.platinum,
        };
        brackets
            .iter()
            .find(|b| level >= b.min_level && level <= b.max_level)
            .map(|b| b.cap)
    }
}

fn brackets(caps: [i64; 3]) -> Vec<LevelBracket> {
    vec![
        LevelBracket {
            min_level: 1,
            max_level: 33,
            cap: Decimal::new(caps[0], 0),
        },
        LevelBracket {
            min_level: 34,
            max_level: 66,
            cap: Decimal::new(caps[1], 0),
        },
        LevelBracket {
            min_level: 67,
            max_level: constants::MAX_LEVEL,
            cap: Decimal::new(caps[2], 0),
        },
    ]
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            first_amount: Decimal::ONE,
            min_amount: Decimal::new(10, 0),
            silver: brackets([50, 100, 200]),
            gold: brackets([100, 200, 400]),
            platinum: brackets([200, 400, 800]),
        }
    }
}
