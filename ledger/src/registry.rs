//! # Vault Registry
//!
//! Keyed store of vault accounts, indexed by owner identity. This is what a
//! multi-user service embeds: it routes each operation to the right account
//! and serializes operations per account.
//!
//! ## Locking
//!
//! Accounts live in a `DashMap<String, Arc<Mutex<VaultAccount>>>`. An
//! operation clones the `Arc` out of the map (releasing the shard lock) and
//! then holds that account's mutex for the whole read-modify-write. Two
//! operations on the same account never interleave; operations on different
//! accounts never wait on each other.
//!
//! ## Snapshots
//!
//! The registry does no I/O. [`VaultRegistry::snapshot`] and
//! [`VaultRegistry::restore`] hand state to and from whatever persistence
//! layer sits outside.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::VaultAccount;
use crate::auth::AuthorizationGate;
use crate::config::{VaultConfig, SNAPSHOT_FORMAT_VERSION};
use crate::ledger::{
    AccrualReceipt, DepositReceipt, Ledger, LedgerError, WithdrawalReceipt, WithdrawalTicket,
};
use crate::valuation::{PriceFeed, VaultSummary};

type AccountHandle = Arc<Mutex<VaultAccount>>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serializable copy of a registry's full state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Format version; see [`SNAPSHOT_FORMAT_VERSION`].
    pub version: u16,
    /// Rates the registry was running with.
    pub config: VaultConfig,
    pub taken_at: DateTime<Utc>,
    /// Accounts, ordered by owner.
    pub accounts: Vec<VaultAccount>,
}

impl RegistrySnapshot {
    /// An empty snapshot for a fresh registry.
    pub fn empty(config: VaultConfig) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            config,
            taken_at: Utc::now(),
            accounts: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// ---------------------------------------------------------------------------
// Accrual batch
// ---------------------------------------------------------------------------

/// Result of accruing one period across every account.
#[derive(Debug, Default)]
pub struct AccrualBatch {
    pub receipts: Vec<AccrualReceipt>,
    /// Accounts that could not accrue, with the reason.
    pub failures: Vec<(String, LedgerError)>,
}

impl AccrualBatch {
    /// Total credits granted across all accounts in this batch.
    pub fn total_accrued(&self) -> u64 {
        self.receipts
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.accrued_credits))
    }
}

// ---------------------------------------------------------------------------
// VaultRegistry
// ---------------------------------------------------------------------------

/// Thread-safe map from owner identity to vault account.
///
/// `VaultRegistry` is `Send + Sync`; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct VaultRegistry {
    ledger: Ledger,
    accounts: DashMap<String, AccountHandle>,
}

impl VaultRegistry {
    /// Creates an empty registry.
    pub fn new(config: VaultConfig) -> Self {
        Self {
            ledger: Ledger::new(config),
            accounts: DashMap::new(),
        }
    }

    /// Rebuilds a registry from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnsupportedSnapshot`] for an unknown format
    /// version and [`LedgerError::AccountExists`] if the snapshot lists an
    /// owner twice.
    pub fn restore(snapshot: RegistrySnapshot) -> Result<Self, LedgerError> {
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(LedgerError::UnsupportedSnapshot {
                found: snapshot.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let registry = Self::new(snapshot.config);
        for account in snapshot.accounts {
            registry.open_account_with(account)?;
        }
        debug!(accounts = registry.len(), "registry restored");
        Ok(registry)
    }

    /// Copies every account into a snapshot, ordered by owner.
    ///
    /// Each account is copied under its own lock. Operations that land while
    /// the snapshot is being taken may or may not be included, but no single
    /// account is ever captured half-updated.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut accounts: Vec<VaultAccount> = self
            .handles()
            .into_iter()
            .map(|(_, handle)| handle.lock().clone())
            .collect();
        accounts.sort_by(|a, b| a.owner.cmp(&b.owner));

        RegistrySnapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            config: self.ledger.config().clone(),
            taken_at: Utc::now(),
            accounts,
        }
    }

    /// The ledger applying operations for this registry.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Registered owners, sorted.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = self.accounts.iter().map(|e| e.key().clone()).collect();
        owners.sort();
        owners
    }

    /// Opens an empty account for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountExists`] if `owner` is already registered.
    pub fn open_account(&self, owner: &str) -> Result<(), LedgerError> {
        self.open_account_with(VaultAccount::new(owner))
    }

    /// Registers an existing account record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountExists`] if the owner is already registered.
    pub fn open_account_with(&self, account: VaultAccount) -> Result<(), LedgerError> {
        match self.accounts.entry(account.owner.clone()) {
            Entry::Occupied(entry) => Err(LedgerError::AccountExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                info!(
                    owner = %account.owner,
                    staked = account.staked_amount,
                    "vault account opened"
                );
                entry.insert(Arc::new(Mutex::new(account)));
                Ok(())
            }
        }
    }

    /// Returns a copy of `owner`'s account.
    pub fn account(&self, owner: &str) -> Result<VaultAccount, LedgerError> {
        Ok(self.handle(owner)?.lock().clone())
    }

    /// Builds the read model for `owner` at the feed's current price.
    pub fn summary(&self, owner: &str, feed: &dyn PriceFeed) -> Result<VaultSummary, LedgerError> {
        let handle = self.handle(owner)?;
        let account = handle.lock();
        Ok(self.ledger.summary(&account, feed))
    }

    /// See [`Ledger::deposit`].
    pub fn deposit(&self, owner: &str, amount: u64) -> Result<DepositReceipt, LedgerError> {
        let handle = self.handle(owner)?;
        let mut account = handle.lock();
        self.ledger.deposit(&mut account, amount)
    }

    /// See [`Ledger::accrue`].
    pub fn accrue(&self, owner: &str) -> Result<AccrualReceipt, LedgerError> {
        let handle = self.handle(owner)?;
        let mut account = handle.lock();
        self.ledger.accrue(&mut account)
    }

    /// Accrues one period on every registered account.
    ///
    /// Accounts are locked one at a time, never all at once.
    pub fn accrue_all(&self) -> AccrualBatch {
        let mut batch = AccrualBatch::default();
        for (owner, handle) in self.handles() {
            let mut account = handle.lock();
            match self.ledger.accrue(&mut account) {
                Ok(receipt) => batch.receipts.push(receipt),
                Err(e) => {
                    warn!(%owner, error = %e, "accrual failed");
                    batch.failures.push((owner, e));
                }
            }
        }
        batch
    }

    /// See [`Ledger::request_withdrawal`].
    pub fn request_withdrawal(
        &self,
        owner: &str,
        amount: u64,
    ) -> Result<WithdrawalTicket, LedgerError> {
        let handle = self.handle(owner)?;
        let mut account = handle.lock();
        self.ledger.request_withdrawal(&mut account, amount)
    }

    /// Executes `owner`'s pending withdrawal on behalf of `caller`.
    ///
    /// `caller` must pass `gate` before the account is even looked at.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] if the gate denies `caller`, and
    /// otherwise the errors of [`Ledger::execute_withdrawal`].
    pub fn execute_withdrawal(
        &self,
        gate: &dyn AuthorizationGate,
        caller: &str,
        owner: &str,
    ) -> Result<WithdrawalReceipt, LedgerError> {
        let token = gate.authorize(caller)?;
        let handle = self.handle(owner)?;
        let mut account = handle.lock();
        let receipt = self.ledger.execute_withdrawal(&mut account, &token)?;
        info!(
            %owner,
            admin = caller,
            transferred = receipt.transferred_amount,
            forfeited_credits = receipt.forfeited_credits,
            "early withdrawal executed"
        );
        Ok(receipt)
    }

    fn handle(&self, owner: &str) -> Result<AccountHandle, LedgerError> {
        self.accounts
            .get(owner)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::AccountNotFound(owner.to_string()))
    }

    /// Clones every handle out of the map so no shard lock is held while an
    /// account mutex is taken.
    fn handles(&self) -> Vec<(String, AccountHandle)> {
        self.accounts
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }
}
