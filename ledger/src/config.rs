//! # Vault Configuration & Constants
//!
//! Every rate and threshold the vault uses lives here. The constants are the
//! reference configuration; [`VaultConfig`] carries them at runtime so an
//! operator can load a different set from a file without recompiling.
//!
//! Rates are in basis points (1 bp = 0.01%). 2 200 bps is 22%, 30 000 bps
//! is 3x. Token amounts are integers in base units of
//! [`TOKEN_DECIMALS`] places; credits are whole. No floats touch a balance.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Token Units
// ---------------------------------------------------------------------------

/// Decimal places of the staked token. A raw amount of `1_500_000` is 1.5
/// tokens.
pub const TOKEN_DECIMALS: u32 = 6;

/// Base units in one whole token.
pub const UNITS_PER_TOKEN: u64 = 10u64.pow(TOKEN_DECIMALS);

// ---------------------------------------------------------------------------
// Rate Parameters
// ---------------------------------------------------------------------------

/// Basis-point denominator. 10 000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Credits granted per deposited token, applied once at deposit time.
/// Separate from the daily accrual rate: this is the sign-up bonus.
pub const DEPOSIT_BONUS_MULTIPLIER_BPS: u32 = 30_000; // 3x

/// Credits accrued per staked token per elapsed day.
pub const DAILY_ACCRUAL_RATE_BPS: u32 = 2_200; // 0.22

/// Credit balance at which the milestone progress bar reads 100%.
/// Display only; nothing unlocks when it is reached.
pub const MILESTONE_TARGET_CREDITS: u64 = 100_000;

// ---------------------------------------------------------------------------
// Snapshot Format
// ---------------------------------------------------------------------------

/// Version tag written into every registry snapshot. Bump when the account
/// record layout changes incompatibly.
///
/// v2: token amounts are stored in base units rather than whole tokens.
pub const SNAPSHOT_FORMAT_VERSION: u16 = 2;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Runtime vault parameters.
///
/// `Default` yields the reference configuration above. Missing fields in a
/// config file fall back to the same defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Deposit bonus in basis points of the deposited amount.
    pub deposit_bonus_multiplier_bps: u32,
    /// Daily accrual in basis points of the staked amount.
    pub daily_accrual_rate_bps: u32,
    /// Credit threshold shown as 100% milestone progress.
    pub milestone_target: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            deposit_bonus_multiplier_bps: DEPOSIT_BONUS_MULTIPLIER_BPS,
            daily_accrual_rate_bps: DAILY_ACCRUAL_RATE_BPS,
            milestone_target: MILESTONE_TARGET_CREDITS,
        }
    }
}

impl VaultConfig {
    /// Parses a config from JSON. Absent fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Daily accrual rate as a human-readable decimal, e.g. `"0.22"`.
    pub fn daily_rate_display(&self) -> String {
        let whole = self.daily_accrual_rate_bps as u64 / BPS_DENOMINATOR;
        let frac = self.daily_accrual_rate_bps as u64 % BPS_DENOMINATOR;
        let frac = format!("{:04}", frac);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, frac)
        }
    }
}
