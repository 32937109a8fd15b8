//! # Vault Ledger
//!
//! The four state transitions of the vault:
//!
//! 1. **Deposit** — lock tokens, receive an up-front credit bonus.
//! 2. **Accrue** — one elapsed day: earn credits on the staked amount.
//! 3. **Request withdrawal** — the holder asks to leave early. Unprivileged,
//!    once per account.
//! 4. **Execute withdrawal** — an admin releases the (clamped) amount and
//!    every accrued credit is forfeited.
//!
//! Every operation follows the same shape: check preconditions, compute all
//! new field values with checked arithmetic, then write them. Any error is
//! returned before the first write, so a rejected call leaves the account
//! byte-for-byte unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::account::{VaultAccount, WithdrawalStatus};
use crate::auth::AdminToken;
use crate::config::VaultConfig;
use crate::quantity::{credits_for, progress_pct};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a vault operation is rejected. A rejection never changes state.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount was zero, negative, finer than one base unit, or not a number.
    #[error("invalid amount {input:?}: must be a positive token amount")]
    InvalidAmount {
        /// The offending input, as received.
        input: String,
    },

    /// The withdrawal request is not in the state this operation needs.
    #[error("invalid withdrawal state: request is {current}, expected {expected}")]
    InvalidWithdrawalState {
        /// Current request status.
        current: WithdrawalStatus,
        /// Status the operation requires.
        expected: WithdrawalStatus,
    },

    /// The clamped withdrawal amount came out as zero.
    #[error("nothing to withdraw: requested {requested}, staked {staked}")]
    NothingToWithdraw {
        /// Amount recorded on the request.
        requested: u64,
        /// Amount currently staked.
        staked: u64,
    },

    /// Applying the operation would overflow a counter.
    #[error("arithmetic overflow updating {field}")]
    Overflow {
        /// Name of the field that would overflow.
        field: &'static str,
    },

    /// The caller does not hold the admin role.
    #[error("caller {caller} is not authorized to execute withdrawals")]
    Unauthorized {
        /// Identity that was denied.
        caller: String,
    },

    /// No account is registered for this owner.
    #[error("no vault account for {0}")]
    AccountNotFound(String),

    /// An account is already registered for this owner.
    #[error("vault account for {0} already exists")]
    AccountExists(String),

    /// Snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshot {
        /// Version found in the snapshot.
        found: u16,
        /// Version this build reads.
        expected: u16,
    },
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Outcome of a successful deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub owner: String,
    /// Tokens locked by this deposit.
    pub amount: u64,
    /// Credits granted up front for this deposit.
    pub bonus_credits: u64,
    /// Staked amount after the deposit.
    pub staked_amount: u64,
    /// Credit balance after the deposit.
    pub credits: u64,
}

/// Outcome of one accrual period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualReceipt {
    pub owner: String,
    /// Credits earned this period.
    pub accrued_credits: u64,
    /// Credit balance after accrual.
    pub credits: u64,
    /// Days staked after accrual.
    pub days_staked: u32,
}

/// Issued when a withdrawal request is accepted for review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalTicket {
    pub owner: String,
    pub request_id: Uuid,
    /// Amount as requested; not yet checked against the staked balance.
    pub requested_amount: u64,
    pub requested_at: DateTime<Utc>,
}

/// Outcome of an executed withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub owner: String,
    pub request_id: Option<Uuid>,
    /// `min(requested, staked)` at execution time.
    pub transferred_amount: u64,
    /// Credits burned by the withdrawal.
    pub forfeited_credits: u64,
    /// Staked amount left in the vault.
    pub staked_amount: u64,
    /// Admin who executed the request.
    pub executed_by: String,
    pub executed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Applies vault operations to explicit [`VaultAccount`] records.
///
/// The ledger holds only configuration. Account state is passed in by the
/// caller, so the same `Ledger` can serve any number of accounts.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    config: VaultConfig,
}

impl Ledger {
    /// Creates a ledger with the given rates.
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    /// The rates this ledger applies.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Locks `amount` base units into the vault.
    ///
    /// Adds `amount` to the staked balance and
    /// `floor(amount * deposit_bonus_multiplier)` whole credits, where
    /// `amount` is counted in tokens.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] if `amount` is zero.
    /// Returns [`LedgerError::Overflow`] if either balance would overflow.
    pub fn deposit(
        &self,
        account: &mut VaultAccount,
        amount: u64,
    ) -> Result<DepositReceipt, LedgerError> {
        if amount == 0 {
            debug!(owner = %account.owner, "deposit rejected: zero amount");
            return Err(LedgerError::InvalidAmount {
                input: amount.to_string(),
            });
        }

        let bonus_credits = credits_for(amount, self.config.deposit_bonus_multiplier_bps);
        let staked_amount = account
            .staked_amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                field: "staked_amount",
            })?;
        let credits = account
            .credits
            .checked_add(bonus_credits)
            .ok_or(LedgerError::Overflow { field: "credits" })?;

        account.staked_amount = staked_amount;
        account.credits = credits;
        account.updated_at = Utc::now();

        debug!(
            owner = %account.owner,
            amount,
            bonus_credits,
            staked_amount,
            "deposit applied"
        );

        Ok(DepositReceipt {
            owner: account.owner.clone(),
            amount,
            bonus_credits,
            staked_amount,
            credits,
        })
    }

    /// Accrues one day of credits on the staked amount.
    ///
    /// Not idempotent. Each call is one elapsed day; the scheduler calling
    /// this is responsible for the cadence.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if credits or the day counter would
    /// overflow.
    pub fn accrue(&self, account: &mut VaultAccount) -> Result<AccrualReceipt, LedgerError> {
        let accrued_credits = self.credits_per_day(account);
        let credits = account
            .credits
            .checked_add(accrued_credits)
            .ok_or(LedgerError::Overflow { field: "credits" })?;
        let days_staked = account
            .days_staked
            .checked_add(1)
            .ok_or(LedgerError::Overflow {
                field: "days_staked",
            })?;

        account.credits = credits;
        account.days_staked = days_staked;
        account.updated_at = Utc::now();

        debug!(owner = %account.owner, accrued_credits, days_staked, "accrual applied");

        Ok(AccrualReceipt {
            owner: account.owner.clone(),
            accrued_credits,
            credits,
            days_staked,
        })
    }

    /// Submits the account's early-withdrawal request.
    ///
    /// The amount is recorded as-is. It is clamped against the staked
    /// balance only when an admin executes the request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] if `amount` is zero.
    /// Returns [`LedgerError::InvalidWithdrawalState`] unless the request is
    /// currently `None`.
    pub fn request_withdrawal(
        &self,
        account: &mut VaultAccount,
        amount: u64,
    ) -> Result<WithdrawalTicket, LedgerError> {
        // A zero request could never execute and would block the account's
        // only request slot.
        if amount == 0 {
            debug!(owner = %account.owner, "withdrawal request rejected: zero amount");
            return Err(LedgerError::InvalidAmount {
                input: amount.to_string(),
            });
        }

        let current = account.withdrawal.status;
        if !current.accepts_request() {
            debug!(owner = %account.owner, %current, "withdrawal request rejected");
            return Err(LedgerError::InvalidWithdrawalState {
                current,
                expected: WithdrawalStatus::None,
            });
        }

        let request_id = Uuid::new_v4();
        let now = Utc::now();

        let request = &mut account.withdrawal;
        request.status = WithdrawalStatus::Pending;
        request.requested_amount = amount;
        request.request_id = Some(request_id);
        request.requested_at = Some(now);
        account.updated_at = now;

        debug!(owner = %account.owner, %request_id, amount, "withdrawal requested");

        Ok(WithdrawalTicket {
            owner: account.owner.clone(),
            request_id,
            requested_amount: amount,
            requested_at: now,
        })
    }

    /// Executes a pending withdrawal. Admin only.
    ///
    /// Releases `min(requested_amount, staked_amount)`, zeroes credits and
    /// days staked, and closes the request as `Executed`. Forfeiting the
    /// credits is the price of leaving early.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidWithdrawalState`] unless the request is
    /// `Pending`.
    /// Returns [`LedgerError::NothingToWithdraw`] if the clamped amount is
    /// zero; the request stays `Pending`.
    pub fn execute_withdrawal(
        &self,
        account: &mut VaultAccount,
        admin: &AdminToken,
    ) -> Result<WithdrawalReceipt, LedgerError> {
        let current = account.withdrawal.status;
        if !current.is_executable() {
            debug!(owner = %account.owner, %current, "withdrawal execution rejected");
            return Err(LedgerError::InvalidWithdrawalState {
                current,
                expected: WithdrawalStatus::Pending,
            });
        }

        let requested = account.withdrawal.requested_amount;
        let transferred_amount = requested.min(account.staked_amount);
        if transferred_amount == 0 {
            debug!(
                owner = %account.owner,
                requested,
                "withdrawal execution rejected: nothing to withdraw"
            );
            return Err(LedgerError::NothingToWithdraw {
                requested,
                staked: account.staked_amount,
            });
        }

        let forfeited_credits = account.credits;
        let staked_amount = account.staked_amount.saturating_sub(transferred_amount);
        let now = Utc::now();

        account.staked_amount = staked_amount;
        account.credits = 0;
        account.days_staked = 0;
        let request = &mut account.withdrawal;
        request.status = WithdrawalStatus::Executed;
        request.executed_at = Some(now);
        request.transferred_amount = transferred_amount;
        request.forfeited_credits = forfeited_credits;
        account.updated_at = now;

        debug!(
            owner = %account.owner,
            admin = admin.caller(),
            transferred_amount,
            forfeited_credits,
            "withdrawal executed"
        );

        Ok(WithdrawalReceipt {
            owner: account.owner.clone(),
            request_id: account.withdrawal.request_id,
            transferred_amount,
            forfeited_credits,
            staked_amount,
            executed_by: admin.caller().to_string(),
            executed_at: now,
        })
    }

    // -----------------------------------------------------------------------
    // Derived queries
    // -----------------------------------------------------------------------

    /// `floor(staked_amount * daily_accrual_rate)`, staked amount in tokens.
    pub fn credits_per_day(&self, account: &VaultAccount) -> u64 {
        self.estimated_credits_per_day(account.staked_amount)
    }

    /// Credits per day a deposit of `amount` would earn on its own.
    pub fn estimated_credits_per_day(&self, amount: u64) -> u64 {
        credits_for(amount, self.config.daily_accrual_rate_bps)
    }

    /// Up-front credits a deposit of `amount` would receive.
    pub fn estimated_bonus_credits(&self, amount: u64) -> u64 {
        credits_for(amount, self.config.deposit_bonus_multiplier_bps)
    }

    /// Milestone progress in whole percent, capped at 100.
    pub fn milestone_progress_pct(&self, account: &VaultAccount) -> u8 {
        progress_pct(account.credits, self.config.milestone_target)
    }
}
