//! spending approvals granted to the pool

use crate::fixed::{Quantity, Rounding};
use crate::{COLLATERAL_SYMBOL, STABLE_SYMBOL};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Approval amount meaning "no ceiling". ERC-20 tokens treat `type(uint256).max`
/// as an allowance that is never decremented.
pub const UNLIMITED_ALLOWANCE: U256 = U256::MAX;

/// how often allowances are re-read outside of approval writes
pub const ALLOWANCE_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Collateral,
    Stable,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Collateral => f.write_str(COLLATERAL_SYMBOL),
            Asset::Stable => f.write_str(STABLE_SYMBOL),
        }
    }
}

/// True iff a positive spend is not covered by the granted allowance.
///
/// Both sides normally share the asset's base. If they don't, the grant is
/// truncated into the spend's base; an unrepresentable grant counts as
/// insufficient.
pub fn needs_approval(spend: &Quantity, granted: &Quantity) -> bool {
    if spend.is_zero() {
        return false;
    }
    match granted.rebase(spend.decimals, Rounding::Down) {
        Ok(granted) => granted.amount < spend.amount,
        Err(_) => true,
    }
}

/// Allowances the user has granted the pool, per asset. `None` = not read yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceState {
    pub collateral: Option<U256>,
    pub stable: Option<U256>,
}

impl AllowanceState {
    pub fn granted(&self, asset: Asset) -> Option<U256> {
        match asset {
            Asset::Collateral => self.collateral,
            Asset::Stable => self.stable,
        }
    }

    /// Same rule as [`needs_approval`]. `None` when the allowance has not
    /// been read and the spend is positive.
    pub fn needs_approval(&self, asset: Asset, spend: &Quantity) -> Option<bool> {
        if spend.is_zero() {
            return Some(false);
        }
        self.granted(asset)
            .map(|granted| needs_approval(spend, &Quantity::new(granted, spend.decimals)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(amount: u64) -> Quantity {
        Quantity::new(U256::from(amount), 6)
    }

    #[test]
    fn test_zero_spend_never_needs_approval() {
        assert!(!needs_approval(&q(0), &q(0)));
        assert!(!needs_approval(&q(0), &q(5)));
        let state = AllowanceState::default();
        assert_eq!(state.needs_approval(Asset::Stable, &q(0)), Some(false));
    }

    #[test]
    fn test_needs_approval_boundary() {
        assert!(needs_approval(&q(10), &q(9)));
        assert!(!needs_approval(&q(10), &q(10)));
        assert!(!needs_approval(&q(10), &Quantity::new(UNLIMITED_ALLOWANCE, 6)));
    }

    #[test]
    fn test_unknown_allowance_is_undecided() {
        let state = AllowanceState { collateral: Some(U256::from(100u64)), stable: None };
        assert_eq!(state.needs_approval(Asset::Stable, &q(1)), None);
        assert_eq!(state.needs_approval(Asset::Collateral, &q(100)), Some(false));
        assert_eq!(state.needs_approval(Asset::Collateral, &q(101)), Some(true));
    }

    #[test]
    fn test_mixed_bases_truncate_grant() {
        // grant of 1.00000099 (8dp) covers 1.000000 but not 1.000001 (6dp)
        let granted = Quantity::new(U256::from(100_000_099u64), 8);
        assert!(!needs_approval(&q(1_000_000), &granted));
        assert!(needs_approval(&q(1_000_001), &granted));
    }
}
