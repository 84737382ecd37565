//! Ledger-side view of a user: balance, eligibility, tiering, and the
//! referral graph.
//!
//! Only the fields the settlement core mutates live here — profile,
//! credentials, and session state belong to the account service that owns
//! the rest of the user document.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, UserId};

/// Membership category purchased with the qualifying deposit.
///
/// Category bounds the referral reward rate and the withdrawal caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Silver,
    Gold,
    Platinum,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Silver => write!(f, "Silver"),
            Self::Gold => write!(f, "Gold"),
            Self::Platinum => write!(f, "Platinum"),
        }
    }
}

/// A single referral payout credited to a referrer's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralReward {
    /// The referred user whose qualifying deposit triggered the payout.
    pub referred_user: UserId,
    /// The amount credited (equal to the referred user's own reward).
    pub amount: Decimal,
    /// When the payout was applied.
    pub granted_at: DateTime<Utc>,
}

/// Level as a pure function of lifetime earned points.
///
/// One level per 5,000 points, starting at 1, capped at 100.
#[must_use]
pub fn level_for_points(points: u64) -> u32 {
    let level = points / constants::POINTS_PER_LEVEL + 1;
    u32::try_from(level.min(u64::from(constants::MAX_LEVEL))).unwrap_or(constants::MAX_LEVEL)
}

/// A user's ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: UserId,
    /// Display name, used in notifications.
    pub name: String,
    /// Notification address.
    pub email: String,
    /// Withdrawable balance, currency-normalized to 2 decimals.
    /// Invariant: never negative.
    pub balance: Decimal,
    /// One-time flag set by the first qualifying settled deposit.
    pub eligible: bool,
    /// Category persisted at eligibility time.
    pub category: Option<Category>,
    /// Derived from `lifetime_points`; see [`level_for_points`].
    pub level: u32,
    /// Total points ever earned. Only increases.
    pub lifetime_points: u64,
    /// The account that referred this one, if any.
    pub referred_by: Option<UserId>,
    /// Referral payouts credited to this account, in grant order.
    pub referral_rewards: Vec<ReferralReward>,
}

impl Account {
    /// Create a fresh account with zero balance at level 1.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            balance: Decimal::ZERO,
            eligible: false,
            category: None,
            level: level_for_points(0),
            lifetime_points: 0,
            referred_by: None,
            referral_rewards: Vec::new(),
        }
    }

    /// Attach a referrer. Builder-style, used at signup time.
    #[must_use]
    pub fn referred_by(mut self, referrer: UserId) -> Self {
        self.referred_by = Some(referrer);
        self
    }

    /// Add earned points and recompute the level.
    pub fn add_points(&mut self, points: u64) {
        self.lifetime_points = self.lifetime_points.saturating_add(points);
        self.level = level_for_points(self.lifetime_points);
    }
}
