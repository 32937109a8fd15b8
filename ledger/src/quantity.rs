//! # Quantities & Rate Arithmetic
//!
//! Token amounts are `u64` base units, [`TOKEN_DECIMALS`] places below one
//! whole token. Credits are whole numbers. Anything that arrives from
//! outside (a text box, a CLI argument, a signed integer from some RPC
//! layer) goes through [`parse_amount`] or [`amount_from_signed`] first, so
//! the ledger only ever sees strictly positive quantities.
//!
//! Credit rates are applied in basis points per whole token with a `u128`
//! intermediate and floor rounding, which is what `floor(amount * rate)`
//! means once `amount` is a fixed-point number.

use crate::config::{BPS_DENOMINATOR, TOKEN_DECIMALS, UNITS_PER_TOKEN};
use crate::ledger::LedgerError;

/// Parses user-supplied text into a strictly positive amount in base units.
///
/// Accepts plain decimals (`"1000"`, `"1.5"`, `".25"`) and exponent
/// notation (`"12e3"`). Empty, non-numeric, negative, and zero input are
/// rejected the same way: [`LedgerError::InvalidAmount`]. So is anything
/// finer than one base unit or too large for a `u64`.
pub fn parse_amount(raw: &str) -> Result<u64, LedgerError> {
    match parse_quantity(raw)? {
        0 => Err(LedgerError::InvalidAmount {
            input: raw.trim().to_string(),
        }),
        amount => Ok(amount),
    }
}

/// Like [`parse_amount`] but accepts zero. For seeding balances.
pub fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let trimmed = raw.trim();
    let invalid = || LedgerError::InvalidAmount {
        input: trimmed.to_string(),
    };

    let (mantissa, exponent) = match trimmed.find(['e', 'E']) {
        Some(at) => {
            let exponent: i32 = trimmed[at + 1..].parse().map_err(|_| invalid())?;
            (&trimmed[..at], exponent)
        }
        None => (trimmed, 0),
    };

    let (whole, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    // value = digits * 10^shift base units
    let digits = format!("{}{}", whole, frac);
    let mut digits = digits.trim_start_matches('0');
    let shift = exponent as i64 - frac.len() as i64 + TOKEN_DECIMALS as i64;

    if digits.is_empty() {
        return Ok(0);
    }

    let scale = if shift < 0 {
        let cut = digits.len().saturating_sub(shift.unsigned_abs() as usize);
        // Dropped digits below one base unit must all be zero.
        if digits[cut..].bytes().any(|b| b != b'0') {
            return Err(invalid());
        }
        digits = &digits[..cut];
        if digits.is_empty() {
            return Ok(0);
        }
        1
    } else {
        u32::try_from(shift)
            .ok()
            .and_then(|s| 10u128.checked_pow(s))
            .ok_or_else(invalid)?
    };

    if digits.len() > 20 {
        return Err(invalid());
    }
    let value: u128 = digits.parse().map_err(|_| invalid())?;
    value
        .checked_mul(scale)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(invalid)
}

/// Converts a signed amount in base units, rejecting zero and negatives.
pub fn amount_from_signed(value: i64) -> Result<u64, LedgerError> {
    if value <= 0 {
        return Err(LedgerError::InvalidAmount {
            input: value.to_string(),
        });
    }
    Ok(value as u64)
}

/// Base units in `whole` tokens, saturating.
pub const fn tokens(whole: u64) -> u64 {
    whole.saturating_mul(UNITS_PER_TOKEN)
}

/// `floor(amount_in_tokens * bps / 10_000)` whole credits.
///
/// `bps` is a `u32`, always below `10_000 * UNITS_PER_TOKEN`, so the result
/// is smaller than `amount` and fits a `u64`.
pub fn credits_for(amount: u64, bps: u32) -> u64 {
    let denominator = BPS_DENOMINATOR as u128 * UNITS_PER_TOKEN as u128;
    let credits = (amount as u128) * (bps as u128) / denominator;
    u64::try_from(credits).unwrap_or(u64::MAX)
}

/// Renders base units as a decimal token amount without trailing zeros,
/// e.g. `1_500_000` -> `"1.5"`, `12_500_000_000` -> `"12500"`.
pub fn format_amount(amount: u64) -> String {
    let whole = amount / UNITS_PER_TOKEN;
    let frac = amount % UNITS_PER_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = TOKEN_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// `min(100, round(value / target * 100))`, rounding half up.
///
/// A zero target counts as already reached.
pub fn progress_pct(value: u64, target: u64) -> u8 {
    if target == 0 {
        return 100;
    }
    let target = target as u128;
    let pct = ((value as u128) * 100 + target / 2) / target;
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_positive_numbers() {
        assert_eq!(parse_amount("1000").unwrap(), tokens(1_000));
        assert_eq!(parse_amount("  2500 ").unwrap(), tokens(2_500));
        assert_eq!(parse_amount("1.5").unwrap(), 1_500_000);
        assert_eq!(parse_amount(".25").unwrap(), 250_000);
        assert_eq!(parse_amount("7.").unwrap(), tokens(7));
        assert_eq!(parse_amount("0.000001").unwrap(), 1);
        assert_eq!(parse_amount("12e3").unwrap(), tokens(12_000));
        assert_eq!(parse_amount("1.25E2").unwrap(), tokens(125));
        assert_eq!(parse_amount("5e-1").unwrap(), 500_000);
        assert_eq!(parse_amount("0012.500").unwrap(), 12_500_000);
    }

    #[test]
    fn parse_rejects_everything_else() {
        for raw in [
            "", "   ", "abc", "-5", "0", "0.0", "-1.5", "+5", ".", "1e", "e3", "1.2.3", "0x10",
            "NaN", "Infinity",
        ] {
            assert!(
                matches!(parse_amount(raw), Err(LedgerError::InvalidAmount { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_sub_unit_precision_and_overflow() {
        assert!(parse_amount("0.0000001").is_err());
        assert!(parse_amount("1.0000005").is_err());
        assert!(parse_amount("1e-7").is_err());
        assert!(parse_amount("99999999999999999999").is_err());
        assert!(parse_amount("1e400").is_err());
        // Trailing zeros below a base unit are harmless.
        assert_eq!(parse_amount("1.50000000").unwrap(), 1_500_000);
    }

    #[test]
    fn quantity_allows_zero() {
        assert_eq!(parse_quantity("0").unwrap(), 0);
        assert_eq!(parse_quantity("0.000").unwrap(), 0);
        assert!(parse_quantity("-0.5").is_err());
    }

    #[test]
    fn signed_conversion() {
        assert_eq!(amount_from_signed(7).unwrap(), 7);
        assert!(amount_from_signed(0).is_err());
        assert!(amount_from_signed(-5).is_err());
    }

    #[test]
    fn credits_floor() {
        // 12_500 * 0.22 = 2_750 exactly.
        assert_eq!(credits_for(tokens(12_500), 2_200), 2_750);
        // 7 * 0.22 = 1.54 -> 1
        assert_eq!(credits_for(tokens(7), 2_200), 1);
        assert_eq!(credits_for(tokens(1_000), 30_000), 3_000);
        // 1.5 * 3 = 4.5 -> 4
        assert_eq!(credits_for(1_500_000, 30_000), 4);
        assert_eq!(credits_for(0, 2_200), 0);
    }

    #[test]
    fn credits_never_overflow() {
        assert_eq!(credits_for(u64::MAX, 30_000), 55_340_232_221_128);
        assert!(credits_for(u64::MAX, u32::MAX) < u64::MAX);
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(tokens(12_500)), "12500");
        assert_eq!(format_amount(1_500_000), "1.5");
        assert_eq!(format_amount(1), "0.000001");
        assert_eq!(format_amount(0), "0");
    }

    #[test]
    fn progress_rounds_and_caps() {
        assert_eq!(progress_pct(83_220, 100_000), 83);
        assert_eq!(progress_pct(83_500, 100_000), 84);
        assert_eq!(progress_pct(83_499, 100_000), 83);
        assert_eq!(progress_pct(250_000, 100_000), 100);
        assert_eq!(progress_pct(0, 100_000), 0);
        assert_eq!(progress_pct(5, 0), 100);
    }
}
