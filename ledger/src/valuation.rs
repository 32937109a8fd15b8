//! # Valuation & Read Models
//!
//! Everything a dashboard shows that is not stored: credits per day, USD
//! values, milestone progress. All of it is recomputed from the current
//! account and the current price quote on every read.
//!
//! The price comes from a [`PriceFeed`] supplied by the caller. The ledger
//! neither validates nor caches it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{VaultAccount, WithdrawalStatus};
use crate::config::{TOKEN_DECIMALS, UNITS_PER_TOKEN};
use crate::ledger::Ledger;

/// A token price as quoted by an external feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Price of one token in USD.
    pub price_usd: f64,
    /// Percent change over the last 24 hours.
    pub change_24h_pct: f64,
}

impl PriceQuote {
    pub fn new(price_usd: f64, change_24h_pct: f64) -> Self {
        Self {
            price_usd,
            change_24h_pct,
        }
    }

    /// USD value of `amount` base units at this price.
    pub fn value_of(&self, amount: u64) -> f64 {
        amount as f64 / UNITS_PER_TOKEN as f64 * self.price_usd
    }

    /// 24h change formatted with an explicit sign, e.g. `"-39.04%"`.
    pub fn change_display(&self) -> String {
        let sign = if self.change_24h_pct >= 0.0 { "+" } else { "" };
        format!("{}{:.2}%", sign, self.change_24h_pct)
    }
}

/// Source of the current token price.
pub trait PriceFeed {
    fn quote(&self) -> PriceQuote;
}

/// A feed that always returns the same quote. Useful for consoles, tests,
/// and anywhere the price is pushed in from outside.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticPriceFeed {
    quote: PriceQuote,
}

impl StaticPriceFeed {
    pub fn new(price_usd: f64, change_24h_pct: f64) -> Self {
        Self {
            quote: PriceQuote::new(price_usd, change_24h_pct),
        }
    }
}

impl PriceFeed for StaticPriceFeed {
    fn quote(&self) -> PriceQuote {
        self.quote
    }
}

/// Point-in-time view of an account with all derived values filled in.
///
/// Token amounts are base units; `token_decimals` says where the point goes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VaultSummary {
    pub owner: String,
    pub token_decimals: u32,
    pub wallet_balance: u64,
    pub staked_amount: u64,
    pub credits: u64,
    pub days_staked: u32,
    pub credits_per_day: u64,
    pub wallet_value_usd: f64,
    pub vault_value_usd: f64,
    pub price: PriceQuote,
    pub milestone_target: u64,
    pub milestone_progress_pct: u8,
    pub withdrawal_status: WithdrawalStatus,
    pub requested_amount: u64,
    pub request_id: Option<Uuid>,
}

impl Ledger {
    /// Builds the read model for `account` at the feed's current price.
    pub fn summary(&self, account: &VaultAccount, feed: &dyn PriceFeed) -> VaultSummary {
        let price = feed.quote();
        VaultSummary {
            owner: account.owner.clone(),
            token_decimals: TOKEN_DECIMALS,
            wallet_balance: account.wallet_balance,
            staked_amount: account.staked_amount,
            credits: account.credits,
            days_staked: account.days_staked,
            credits_per_day: self.credits_per_day(account),
            wallet_value_usd: price.value_of(account.wallet_balance),
            vault_value_usd: price.value_of(account.staked_amount),
            price,
            milestone_target: self.config().milestone_target,
            milestone_progress_pct: self.milestone_progress_pct(account),
            withdrawal_status: account.withdrawal.status,
            requested_amount: account.withdrawal.requested_amount,
            request_id: account.withdrawal.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::tokens;

    #[test]
    fn summary_of_reference_account() {
        let ledger = Ledger::default();
        let acct = VaultAccount::with_balances("0xabc", tokens(18_200), tokens(12_500), 83_220, 30);
        let feed = StaticPriceFeed::new(3.24, -39.04);

        let s = ledger.summary(&acct, &feed);
        assert_eq!(s.credits_per_day, 2_750);
        assert_eq!(s.milestone_progress_pct, 83);
        assert_eq!(s.milestone_target, 100_000);
        assert!((s.wallet_value_usd - 58_968.0).abs() < 1e-6);
        assert!((s.vault_value_usd - 40_500.0).abs() < 1e-6);
        assert_eq!(s.withdrawal_status, WithdrawalStatus::None);
        assert_eq!(s.token_decimals, 6);
    }

    #[test]
    fn fractional_amounts_value_proportionally() {
        let q = PriceQuote::new(2.0, 0.0);
        assert!((q.value_of(1_500_000) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn change_display_has_sign() {
        assert_eq!(PriceQuote::new(1.0, -39.04).change_display(), "-39.04%");
        assert_eq!(PriceQuote::new(1.0, 2.5).change_display(), "+2.50%");
        assert_eq!(PriceQuote::new(1.0, 0.0).change_display(), "+0.00%");
    }

    #[test]
    fn zero_price_values_to_zero() {
        let q = PriceQuote::default();
        assert_eq!(q.value_of(tokens(12_500)), 0.0);
    }
}
