// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Ledger — Core Library
//!
//! A custodial vault accounting engine. Holders lock tokens into a vault,
//! accrue non-transferable credits every day their principal stays locked,
//! and may ask to leave early. Early exit needs an administrator to sign off
//! and burns every credit the account has earned.
//!
//! ## Architecture
//!
//! - **account** — The explicit `VaultAccount` / `WithdrawalRequest` records.
//! - **ledger** — The four state transitions: deposit, accrue, request and
//!   execute withdrawal. Validate first, write after, never half-apply.
//! - **quantity** — Fixed-point amount parsing at the boundary, credit math.
//! - **valuation** — Derived display values (USD, credits/day, milestone).
//! - **auth** — The gate that mints admin capabilities.
//! - **registry** — Keyed store; every account is its own lock domain.
//! - **config** — Rates, thresholds, and the runtime `VaultConfig`.
//!
//! ## Design Philosophy
//!
//! 1. Integer base units for anything that is a balance. Floats only show up
//!    when we multiply by an externally quoted price for display.
//! 2. A rejected operation changes nothing. Not a timestamp, not a counter.
//! 3. The engine never does I/O. Persistence, clocks, and authentication are
//!    somebody else's job; we just expose the seams.

pub mod account;
pub mod auth;
pub mod config;
pub mod ledger;
pub mod quantity;
pub mod registry;
pub mod valuation;

pub use account::{VaultAccount, WithdrawalRequest, WithdrawalStatus};
pub use auth::{AdminToken, AuthorizationGate, StaticAdminGate};
pub use config::VaultConfig;
pub use ledger::{
    AccrualReceipt, DepositReceipt, Ledger, LedgerError, WithdrawalReceipt, WithdrawalTicket,
};
pub use registry::{RegistrySnapshot, VaultRegistry};
pub use valuation::{PriceFeed, PriceQuote, StaticPriceFeed, VaultSummary};
