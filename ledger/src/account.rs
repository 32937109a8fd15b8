//! # Vault Account Records
//!
//! The state a single holder owns inside the vault: how much sits in their
//! wallet, how much is locked, how many credits they have earned, and the
//! one withdrawal request they are allowed to have.
//!
//! These are plain records. Nothing here mutates itself; the transitions
//! live in [`crate::ledger::Ledger`], which takes a `&mut VaultAccount` and
//! either applies an operation completely or leaves it untouched.
//!
//! ## Withdrawal State Machine
//!
//! ```text
//!    ┌──────┐  submit   ┌─────────┐  execute (admin)  ┌──────────┐
//!    │ None │──────────►│ Pending │──────────────────►│ Executed │
//!    └──────┘           └─────────┘                   └──────────┘
//! ```
//!
//! `Executed` is terminal. An account gets one early exit, ever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// WithdrawalStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an account's withdrawal request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// No request has been submitted.
    #[default]
    None,
    /// Submitted by the holder, waiting on an administrator.
    Pending,
    /// Approved and carried out. Terminal.
    Executed,
}

impl WithdrawalStatus {
    /// Whether the holder may submit a request from this state.
    pub fn accepts_request(&self) -> bool {
        matches!(self, WithdrawalStatus::None)
    }

    /// Whether an administrator may execute from this state.
    pub fn is_executable(&self) -> bool {
        matches!(self, WithdrawalStatus::Pending)
    }

    /// Returns `true` for `Executed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Executed)
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::None => write!(f, "None"),
            WithdrawalStatus::Pending => write!(f, "Pending"),
            WithdrawalStatus::Executed => write!(f, "Executed"),
        }
    }
}

// ---------------------------------------------------------------------------
// WithdrawalRequest
// ---------------------------------------------------------------------------

/// The single withdrawal request attached to an account.
///
/// `requested_amount` is recorded as submitted and only clamped against the
/// staked balance at execution time. `transferred_amount` and
/// `forfeited_credits` are what actually happened on execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Current lifecycle status.
    pub status: WithdrawalStatus,
    /// Amount the holder asked for, in base units. Never zero once
    /// submitted.
    pub requested_amount: u64,
    /// Assigned when the request is submitted.
    pub request_id: Option<Uuid>,
    /// When the request was submitted.
    pub requested_at: Option<DateTime<Utc>>,
    /// When the request was executed.
    pub executed_at: Option<DateTime<Utc>>,
    /// Amount released from the vault on execution.
    pub transferred_amount: u64,
    /// Credits burned on execution.
    pub forfeited_credits: u64,
}

// ---------------------------------------------------------------------------
// VaultAccount
// ---------------------------------------------------------------------------

/// One holder's position in the vault.
///
/// # Thread Safety
///
/// `VaultAccount` is plain data. Concurrent access is coordinated by
/// [`crate::registry::VaultRegistry`], which wraps each account in its own
/// `parking_lot::Mutex`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccount {
    /// Account identity (typically a wallet address).
    pub owner: String,
    /// Base units held outside the vault. Vault operations never touch this.
    pub wallet_balance: u64,
    /// Base units locked in the vault.
    pub staked_amount: u64,
    /// Accrued, non-transferable credits.
    pub credits: u64,
    /// Accrual periods elapsed since the account opened or last withdrew.
    pub days_staked: u32,
    /// The account's withdrawal request.
    pub withdrawal: WithdrawalRequest,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
    /// When the last successful operation touched the account.
    pub updated_at: DateTime<Utc>,
}

impl VaultAccount {
    /// Opens an empty account with no withdrawal request.
    pub fn new(owner: &str) -> Self {
        let now = Utc::now();
        Self {
            owner: owner.to_string(),
            wallet_balance: 0,
            staked_amount: 0,
            credits: 0,
            days_staked: 0,
            withdrawal: WithdrawalRequest::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Opens an account with pre-existing balances, e.g. when migrating a
    /// position from another system.
    pub fn with_balances(
        owner: &str,
        wallet_balance: u64,
        staked_amount: u64,
        credits: u64,
        days_staked: u32,
    ) -> Self {
        Self {
            wallet_balance,
            staked_amount,
            credits,
            days_staked,
            ..Self::new(owner)
        }
    }

    /// Shorthand for `self.withdrawal.status`.
    pub fn withdrawal_status(&self) -> WithdrawalStatus {
        self.withdrawal.status
    }
}
