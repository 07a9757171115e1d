//! price quotes and float/fixed-point conversion for the price adapter

use crate::error::{CoreError, Result};
use crate::fixed::{parse_units, Quantity};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// A price as reported by an oracle: raw integer, its base, and a float for display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub raw: U256,
    pub decimals: u8,
    pub display: f64,
}

impl PriceQuote {
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        let display = Quantity::new(raw, decimals).to_f64();
        Self { raw, decimals, display }
    }

    /// zero price means no usable signal
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

}

/// Scale a float price to `decimals` fixed point, flooring.
///
/// The float is first rendered as its shortest round-trip decimal, so
/// `145.67` scales to `14567000000` at 8 decimals instead of the
/// `14566999999` a naive `floor(145.67 * 1e8)` produces.
///
/// A price too small to show up at `decimals` is rejected rather than floored
/// to zero.
pub fn scale_price(price: f64, decimals: u8) -> Result<U256> {
    if !price.is_finite() || price <= 0.0 {
        return Err(CoreError::InvalidAmount(price.to_string()));
    }
    let scaled = parse_units(&price.to_string(), decimals)?.amount;
    if scaled.is_zero() {
        return Err(CoreError::InvalidAmount(format!(
            "{} is below the smallest unit at {} decimals",
            price, decimals
        )));
    }
    Ok(scaled)
}

/// Relative difference `|market - on_chain| / on_chain`, if defined.
pub fn drift(market: f64, on_chain: f64) -> Option<f64> {
    if !market.is_finite() || !on_chain.is_finite() || on_chain <= 0.0 {
        return None;
    }
    Some((market - on_chain).abs() / on_chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_price_avoids_float_floor_error() {
        assert_eq!(scale_price(145.67, 8).unwrap(), U256::from(14_567_000_000u64));
        assert_eq!(scale_price(0.29, 8).unwrap(), U256::from(29_000_000u64));
        assert_eq!(scale_price(1.1, 8).unwrap(), U256::from(110_000_000u64));
    }

    #[test]
    fn test_scale_price_floors_extra_digits() {
        assert_eq!(scale_price(1.123456789, 8).unwrap(), U256::from(112_345_678u64));
    }

    #[test]
    fn test_scale_price_rejects_bad_values() {
        assert!(scale_price(0.0, 8).is_err());
        assert!(scale_price(-3.0, 8).is_err());
        assert!(scale_price(f64::NAN, 8).is_err());
        assert!(scale_price(f64::INFINITY, 8).is_err());
    }

    #[test]
    fn test_scale_price_rejects_dust() {
        assert!(matches!(scale_price(1e-9, 8), Err(CoreError::InvalidAmount(_))));
        assert!(matches!(scale_price(0.000000009, 8), Err(CoreError::InvalidAmount(_))));
        assert_eq!(scale_price(0.00000001, 8).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_drift() {
        let d = drift(145.67, 145.00).unwrap();
        assert!((d * 100.0 - 0.462).abs() < 0.001);
        assert_eq!(drift(100.0, 0.0), None);
    }

    #[test]
    fn test_quote_display() {
        let quote = PriceQuote::from_raw(U256::from(14_567_000_000u64), 8);
        assert!((quote.display - 145.67).abs() < 1e-9);
        assert!(!quote.is_zero());
    }
}
