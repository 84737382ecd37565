//! The user ledger.
//!
//! Balance, eligibility, and referral-reward mutations all happen as
//! read-modify-write inside this store's write lock, so a settlement
//! credit racing a withdrawal debit on the same account can never lose an
//! update. Every mutation either fully applies or leaves the account
//! unchanged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use paydrift_types::{
    round2, Account, Category, PaydriftError, ReferralReward, Result, UserId,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

/// Outcome of an eligibility grant: what was credited, and who referred
/// the user (so the caller can pay the referral match).
#[derive(Debug, Clone)]
pub struct EligibilityGrant {
    /// Reward credited to the depositing user (may be zero).
    pub reward: Decimal,
    /// The referrer owed the flat referral match, if any.
    pub referrer: Option<UserId>,
}

/// In-memory ledger of user accounts.
pub struct AccountStore {
    accounts: RwLock<HashMap<UserId, Account>>,
}

impl AccountStore {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Register an account.
    pub async fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account);
    }

    /// Snapshot an account by id.
    pub async fn get(&self, id: UserId) -> Result<Account> {
        let accounts = self.accounts.read().await;
        accounts
            .get(&id)
            .cloned()
            .ok_or(PaydriftError::AccountNotFound(id))
    }

    /// Current balance.
    pub async fn balance(&self, id: UserId) -> Result<Decimal> {
        Ok(self.get(id).await?.balance)
    }

    /// Credit the balance. Returns the new balance.
    pub async fn credit(&self, id: UserId, amount: Decimal) -> Result<Decimal> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or(PaydriftError::AccountNotFound(id))?;
        account.balance = round2(account.balance + amount);
        Ok(account.balance)
    }

    /// Debit the balance, rejecting any debit that would go negative.
    /// Check and mutation are one critical section. Returns the new balance.
    ///
    /// # Errors
    /// Returns [`PaydriftError::InsufficientBalance`] without mutating when
    /// the balance cannot cover `amount`.
    pub async fn try_debit(&self, id: UserId, amount: Decimal) -> Result<Decimal> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or(PaydriftError::AccountNotFound(id))?;

        if account.balance < amount {
            return Err(PaydriftError::InsufficientBalance {
                needed: amount,
                available: account.balance,
            });
        }

        account.balance = round2(account.balance - amount);
        Ok(account.balance)
    }

    /// Flip the one-time eligibility flag, persist the category, and credit
    /// the reward — atomically, and only if the account is not already
    /// eligible.
    ///
    /// Returns `None` if the account was already eligible (the reward is
    /// granted exactly once, at the first qualifying deposit); the caller
    /// then completes the intent without any credit.
    pub async fn grant_eligibility(
        &self,
        id: UserId,
        category: Option<Category>,
        reward: Decimal,
    ) -> Result<Option<EligibilityGrant>> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or(PaydriftError::AccountNotFound(id))?;

        if account.eligible {
            return Ok(None);
        }

        account.eligible = true;
        if category.is_some() {
            account.category = category;
        }
        if reward > Decimal::ZERO {
            account.balance = round2(account.balance + reward);
        }

        Ok(Some(EligibilityGrant {
            reward,
            referrer: account.referred_by,
        }))
    }

    /// Credit a referrer's balance and append the referral-reward record.
    pub async fn add_referral_reward(
        &self,
        referrer: UserId,
        referred: UserId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&referrer)
            .ok_or(PaydriftError::AccountNotFound(referrer))?;
        account.balance = round2(account.balance + amount);
        account.referral_rewards.push(ReferralReward {
            referred_user: referred,
            amount,
            granted_at: now,
        });
        Ok(())
    }

    /// Add earned points; the level is recomputed by the account itself.
    pub async fn add_points(&self, id: UserId, points: u64) -> Result<u32> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or(PaydriftError::AccountNotFound(id))?;
        account.add_points(points);
        Ok(account.level)
    }

    /// Number of referral rewards recorded for an account.
    pub async fn referral_reward_count(&self, id: UserId) -> Result<usize> {
        Ok(self.get(id).await?.referral_rewards.len())
    }

    /// Number of accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Whether the ledger is empty.
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}
