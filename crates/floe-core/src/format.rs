//! display formatting for ledger integers
//!
//! All formatting stays in integer arithmetic; rounding here is half-up and
//! only ever affects what is shown, never what is submitted.

use crate::fixed::pow10;
use crate::{HEALTH_FACTOR_INFINITY_THRESHOLD, WAD_DECIMALS};
use alloy_primitives::U256;

pub const INFINITY: &str = "∞";

/// Round `value` (with `decimals` fractional digits) to `precision` digits,
/// half-up, returning integer and fractional digit strings.
fn round_digits(value: U256, decimals: u8, precision: u8) -> (String, String) {
    let scaled = if precision >= decimals {
        pow10(precision - decimals)
            .ok()
            .and_then(|f| value.checked_mul(f))
    } else {
        pow10(decimals - precision).ok().map(|d| {
            let half = d / U256::from(2u64);
            value.saturating_add(half) / d
        })
    };
    // only reachable for absurd bases; show the raw value rather than panic
    let scaled = match scaled {
        Some(s) => s,
        None => return (value.to_string(), String::new()),
    };

    let digits = scaled.to_string();
    let precision = precision as usize;
    if precision == 0 {
        return (digits, String::new());
    }
    let padded = if digits.len() <= precision {
        format!("{}{}", "0".repeat(precision + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int, frac) = padded.split_at(padded.len() - precision);
    (int.to_string(), frac.to_string())
}

fn group_thousands(int: &str) -> String {
    let mut out = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `$1,234.56`, always `precision` fractional digits
pub fn format_money(value: U256, decimals: u8, precision: u8) -> String {
    let (int, frac) = round_digits(value, decimals, precision);
    if frac.is_empty() {
        format!("${}", group_thousands(&int))
    } else {
        format!("${}.{}", group_thousands(&int), frac)
    }
}

/// `1,234.5`, at most `precision` fractional digits, trailing zeros dropped
pub fn format_token(value: U256, decimals: u8, precision: u8) -> String {
    let (int, frac) = round_digits(value, decimals, precision);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        group_thousands(&int)
    } else {
        format!("{}.{}", group_thousands(&int), frac)
    }
}

/// WAD ratio as a percentage: 0.1234e18 -> `12.34%`
pub fn format_percent(wad: U256, precision: u8) -> String {
    // a WAD value read with 16 decimals is already in percent
    let (int, frac) = round_digits(wad, WAD_DECIMALS - 2, precision);
    if frac.is_empty() {
        format!("{}%", int)
    } else {
        format!("{}.{}%", int, frac)
    }
}

/// Health factor for display.
///
/// `--` when unknown; `∞` for zero (no debt) and for anything at or above the
/// infinity threshold; one decimal from 10 upward, two below.
pub fn format_health_factor(value: Option<U256>) -> String {
    let value = match value {
        Some(v) => v,
        None => return "--".to_string(),
    };
    if value.is_zero() || value >= U256::from(HEALTH_FACTOR_INFINITY_THRESHOLD) {
        return INFINITY.to_string();
    }
    let ten = U256::from(10u64) * U256::from(crate::WAD);
    let precision = if value >= ten { 1 } else { 2 };
    let (int, frac) = round_digits(value, WAD_DECIMALS, precision);
    format!("{}.{}", int, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WAD;

    #[test]
    fn test_health_factor() {
        assert_eq!(format_health_factor(None), "--");
        assert_eq!(format_health_factor(Some(U256::ZERO)), "∞");
        assert_eq!(
            format_health_factor(Some(U256::from(HEALTH_FACTOR_INFINITY_THRESHOLD))),
            "∞"
        );
        assert_eq!(format_health_factor(Some(U256::MAX)), "∞");
        assert_eq!(format_health_factor(Some(U256::from(3 * WAD / 2))), "1.50");
        assert_eq!(format_health_factor(Some(U256::from(12 * WAD + WAD / 4))), "12.3");
        assert_eq!(format_health_factor(Some(U256::from(999_999 * WAD))), "999999.0");
    }

    #[test]
    fn test_money() {
        assert_eq!(format_money(U256::from(1_234_567_891u64), 6, 2), "$1,234.57");
        assert_eq!(format_money(U256::ZERO, 6, 2), "$0.00");
        assert_eq!(format_money(U256::from(5u64), 6, 4), "$0.0000");
        assert_eq!(format_money(U256::from(50u64), 6, 4), "$0.0001");
        assert_eq!(format_money(U256::from(14_567_000_000u64), 8, 2), "$145.67");
        assert_eq!(format_money(U256::from(1_000_000_000_000u64), 6, 2), "$1,000,000.00");
    }

    #[test]
    fn test_token() {
        assert_eq!(format_token(U256::from(2 * WAD), 18, 4), "2");
        assert_eq!(format_token(U256::from(WAD + WAD / 2), 18, 4), "1.5");
        assert_eq!(format_token(U256::from(686_483_151_299_512u64), 18, 4), "0.0007");
        assert_eq!(format_token(U256::from(1_234_500_000u64), 6, 4), "1,234.5");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(U256::from(WAD / 10), 2), "10.00%");
        assert_eq!(format_percent(U256::from(123_456_000_000_000_000u128), 2), "12.35%");
        assert_eq!(format_percent(U256::ZERO, 2), "0.00%");
    }

    #[test]
    fn test_grouping() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("123"), "123");
        assert_eq!(group_thousands("1234"), "1,234");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }
}
