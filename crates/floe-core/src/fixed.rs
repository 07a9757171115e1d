//! fixed-point quantities and conversion between decimal bases
//!
//! A [`Quantity`] is a raw ledger integer tagged with the number of fractional
//! digits it carries. Moving between bases is the only place precision can be
//! lost, so every conversion names its rounding direction explicitly:
//!
//! - amounts the user must supply round [`Rounding::Up`]
//! - amounts the user may take (withdraw, borrow, spend) round [`Rounding::Down`]

use crate::error::{CoreError, Result};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// largest base whose scale factor (10^77) still fits in 256 bits
pub const MAX_DECIMALS: u8 = 77;

/// Rounding direction for lossy conversions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// ceiling, for required amounts
    Up,
    /// truncation, for available amounts
    Down,
}

/// Unsigned fixed-point amount in a given decimal base
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: U256,
    pub decimals: u8,
}

/// 10^exp, failing for bases that cannot be represented in 256 bits
pub fn pow10(exp: u8) -> Result<U256> {
    if exp > MAX_DECIMALS {
        return Err(CoreError::InvalidBase(exp));
    }
    let ten = U256::from(10u64);
    let mut out = U256::from(1u64);
    for _ in 0..exp {
        out = out.checked_mul(ten).ok_or(CoreError::MathOverflow)?;
    }
    Ok(out)
}

/// Ceiling division.
///
/// Written as `(a - 1) / b + 1` so that it cannot overflow near `U256::MAX`;
/// equal to `(a + b - 1) / b` everywhere else.
pub fn ceil_div(a: U256, b: U256) -> Result<U256> {
    if b.is_zero() {
        return Err(CoreError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(U256::ZERO);
    }
    Ok((a - U256::from(1u64)) / b + U256::from(1u64))
}

impl Quantity {
    pub fn new(amount: U256, decimals: u8) -> Self {
        Self { amount, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::new(U256::ZERO, decimals)
    }

    /// Whole units, e.g. `Quantity::from_units(100, 6)` is 100.000000
    pub fn from_units(units: u64, decimals: u8) -> Result<Self> {
        let amount = U256::from(units)
            .checked_mul(pow10(decimals)?)
            .ok_or(CoreError::MathOverflow)?;
        Ok(Self::new(amount, decimals))
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Re-express this amount with `target` fractional digits.
    ///
    /// Scaling up is exact. Scaling down divides by 10^k and either truncates
    /// or takes the ceiling depending on `rounding`.
    pub fn rebase(self, target: u8, rounding: Rounding) -> Result<Self> {
        if self.decimals > MAX_DECIMALS {
            return Err(CoreError::InvalidBase(self.decimals));
        }
        if target > MAX_DECIMALS {
            return Err(CoreError::InvalidBase(target));
        }

        let amount = match target.cmp(&self.decimals) {
            Ordering::Equal => self.amount,
            Ordering::Greater => self
                .amount
                .checked_mul(pow10(target - self.decimals)?)
                .ok_or(CoreError::MathOverflow)?,
            Ordering::Less => {
                let divisor = pow10(self.decimals - target)?;
                match rounding {
                    Rounding::Up => ceil_div(self.amount, divisor)?,
                    Rounding::Down => self.amount / divisor,
                }
            }
        };

        Ok(Self::new(amount, target))
    }

    /// How much of `self` is not covered by `available`, in `self`'s base.
    ///
    /// `available` is truncated into this base, so the shortfall is never
    /// understated.
    pub fn shortfall(&self, available: &Quantity) -> Result<Quantity> {
        let available = available.rebase(self.decimals, Rounding::Down)?;
        Ok(Self::new(
            self.amount.saturating_sub(available.amount),
            self.decimals,
        ))
    }

    /// Lossy float for logs and display. Never feed this back into arithmetic.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or_default()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.amount.to_string();
        let scale = self.decimals as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        } else {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int, frac)
        }
    }
}

/// Parse a user-entered decimal string into `decimals` fractional digits.
///
/// Empty input and zero parse to zero. Digits beyond `decimals` are
/// truncated, never rounded up.
pub fn parse_units(text: &str, decimals: u8) -> Result<Quantity> {
    if decimals > MAX_DECIMALS {
        return Err(CoreError::InvalidBase(decimals));
    }

    let text = text.trim();
    if text.is_empty() {
        return Ok(Quantity::zero(decimals));
    }

    let (int, frac) = match text.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (text, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return Err(CoreError::InvalidAmount(text.to_string()));
    }
    if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidAmount(text.to_string()));
    }

    let scale = decimals as usize;
    let mut digits = String::with_capacity(int.len() + scale);
    digits.push_str(int);
    if frac.len() >= scale {
        digits.push_str(&frac[..scale]);
    } else {
        digits.push_str(frac);
        digits.push_str(&"0".repeat(scale - frac.len()));
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(Quantity::zero(decimals));
    }

    let amount = U256::from_str_radix(digits, 10)
        .map_err(|_| CoreError::InvalidAmount(text.to_string()))?;
    Ok(Quantity::new(amount, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(amount: u128, decimals: u8) -> Quantity {
        Quantity::new(U256::from(amount), decimals)
    }

    #[test]
    fn test_rebase_up_is_exact() {
        let usdc = q(1_500_000, 6);
        let oracle = usdc.rebase(8, Rounding::Down).unwrap();
        assert_eq!(oracle, q(150_000_000, 8));
    }

    #[test]
    fn test_rebase_down_rounding() {
        let value = q(1_234_567, 8);
        assert_eq!(value.rebase(6, Rounding::Down).unwrap(), q(12_345, 6));
        assert_eq!(value.rebase(6, Rounding::Up).unwrap(), q(12_346, 6));
    }

    #[test]
    fn test_rebase_down_exact_multiple_does_not_round() {
        let value = q(1_200, 8);
        assert_eq!(value.rebase(6, Rounding::Up).unwrap(), q(12, 6));
    }

    #[test]
    fn test_rebase_same_base() {
        let value = q(42, 6);
        assert_eq!(value.rebase(6, Rounding::Up).unwrap(), value);
    }

    #[test]
    fn test_rebase_invalid_base() {
        assert_eq!(
            q(1, 6).rebase(78, Rounding::Down),
            Err(CoreError::InvalidBase(78))
        );
        assert_eq!(
            q(1, 90).rebase(6, Rounding::Down),
            Err(CoreError::InvalidBase(90))
        );
    }

    #[test]
    fn test_rebase_overflow() {
        let huge = Quantity::new(U256::MAX, 0);
        assert_eq!(huge.rebase(1, Rounding::Down), Err(CoreError::MathOverflow));
    }

    #[test]
    fn test_ceil_div() {
        assert_eq!(ceil_div(U256::from(10u64), U256::from(3u64)).unwrap(), U256::from(4u64));
        assert_eq!(ceil_div(U256::from(9u64), U256::from(3u64)).unwrap(), U256::from(3u64));
        assert_eq!(ceil_div(U256::ZERO, U256::from(3u64)).unwrap(), U256::ZERO);
        assert_eq!(ceil_div(U256::MAX, U256::from(1u64)).unwrap(), U256::MAX);
        assert_eq!(ceil_div(U256::from(1u64), U256::ZERO), Err(CoreError::DivisionByZero));
    }

    #[test]
    fn test_shortfall() {
        let required = q(2_000_000_000_000_000_000, 18);
        let posted = q(1_500_000_000_000_000_000, 18);
        assert_eq!(required.shortfall(&posted).unwrap(), q(500_000_000_000_000_000, 18));
        assert!(posted.shortfall(&required).unwrap().is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(q(14_567_000_000, 8).to_string(), "145.67000000");
        assert_eq!(q(5, 6).to_string(), "0.000005");
        assert_eq!(q(7, 0).to_string(), "7");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("145.67", 8).unwrap(), q(14_567_000_000, 8));
        assert_eq!(parse_units("100", 6).unwrap(), q(100_000_000, 6));
        assert_eq!(parse_units(".5", 6).unwrap(), q(500_000, 6));
        assert_eq!(parse_units("2.", 6).unwrap(), q(2_000_000, 6));
        assert_eq!(parse_units("1.23456789", 6).unwrap(), q(1_234_567, 6));
    }

    #[test]
    fn test_parse_units_empty_and_zero() {
        assert!(parse_units("", 6).unwrap().is_zero());
        assert!(parse_units("  ", 6).unwrap().is_zero());
        assert!(parse_units("0.000", 6).unwrap().is_zero());
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(parse_units("abc", 6).is_err());
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units("1.2.3", 6).is_err());
        assert!(parse_units(".", 6).is_err());
        assert!(parse_units("1e5", 6).is_err());
    }
}
