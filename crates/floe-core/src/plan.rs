//! collateral planning: how much collateral a desired borrow needs
//!
//! The ledger enforces `debt <= collateral_value * ltv`. Planning runs that
//! inequality backwards and rounds every step up, so the advertised
//! requirement is never below what the ledger will demand.

use crate::error::{CoreError, Result};
use crate::fixed::{ceil_div, pow10, Quantity, Rounding};
use crate::gate::Blocker;
use crate::position::LedgerReads;
use crate::price::PriceQuote;
use crate::{BPS_DENOMINATOR, COLLATERAL_DECIMALS, LTV_BPS, STABLE_DECIMALS};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// loan durations offered to borrowers, in days
pub const DURATION_PRESETS_DAYS: [u64; 3] = [7, 30, 90];

pub const DEFAULT_DURATION_DAYS: u64 = 30;

/// Fixed market parameters shared by every plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    pub ltv_bps: u32,
    pub stable_decimals: u8,
    pub collateral_decimals: u8,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            ltv_bps: LTV_BPS,
            stable_decimals: STABLE_DECIMALS,
            collateral_decimals: COLLATERAL_DECIMALS,
        }
    }
}

impl MarketParams {
    pub fn validate(&self) -> Result<()> {
        if self.ltv_bps == 0 || self.ltv_bps > BPS_DENOMINATOR {
            return Err(CoreError::InvalidConfig(format!(
                "ltv must be in (0, {}] bps, got {}",
                BPS_DENOMINATOR, self.ltv_bps
            )));
        }
        pow10(self.stable_decimals)?;
        pow10(self.collateral_decimals)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRequirement {
    /// collateral value needed, in the borrow's (stable) base
    pub required_value: Quantity,
    /// collateral amount needed, in the collateral token's base
    pub required_amount: Quantity,
}

/// Collateral needed to borrow `desired` at `ltv_bps` given `price`.
///
/// Without a usable price the amount is zero (planning suspended) while the
/// value is still reported.
pub fn plan_collateral(
    desired: Quantity,
    ltv_bps: u32,
    price: Option<&PriceQuote>,
    collateral_decimals: u8,
) -> Result<CollateralRequirement> {
    if ltv_bps == 0 {
        return Err(CoreError::InvalidConfig("ltv of 0 bps".into()));
    }
    if desired.is_zero() {
        return Ok(CollateralRequirement {
            required_value: Quantity::zero(desired.decimals),
            required_amount: Quantity::zero(collateral_decimals),
        });
    }

    let scaled = desired
        .amount
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or(CoreError::MathOverflow)?;
    let required_value = Quantity::new(ceil_div(scaled, U256::from(ltv_bps))?, desired.decimals);

    let price = match price {
        Some(price) if !price.is_zero() => price,
        _ => {
            return Ok(CollateralRequirement {
                required_value,
                required_amount: Quantity::zero(collateral_decimals),
            })
        }
    };

    let value_in_oracle_base = required_value.rebase(price.decimals, Rounding::Up)?;
    let numerator = value_in_oracle_base
        .amount
        .checked_mul(pow10(collateral_decimals)?)
        .ok_or(CoreError::MathOverflow)?;
    let required_amount = Quantity::new(ceil_div(numerator, price.raw)?, collateral_decimals);

    Ok(CollateralRequirement { required_value, required_amount })
}

/// What the user asked for: an amount of stable token and a loan duration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub desired: Quantity,
    pub duration_secs: u64,
}

impl BorrowRequest {
    pub fn new(desired: Quantity, duration_days: u64) -> Self {
        Self {
            desired,
            duration_secs: duration_days.saturating_mul(SECONDS_PER_DAY),
        }
    }

    /// no amount entered yet
    pub fn empty(params: &MarketParams) -> Self {
        Self::new(Quantity::zero(params.stable_decimals), DEFAULT_DURATION_DAYS)
    }
}

/// Everything the borrow flow needs to decide, recomputed on every input change.
///
/// `None` means an input was not loaded; callers must treat it as blocking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowPlan {
    pub desired: Quantity,
    pub duration_secs: u64,
    pub required_collateral: Quantity,
    pub required_collateral_value: Quantity,
    pub missing_collateral: Option<Quantity>,
    pub exceeds_user_cap: Option<bool>,
    pub exceeds_pool_cap: Option<bool>,
}

impl BorrowPlan {
    pub fn compute(reads: &LedgerReads, request: &BorrowRequest, params: &MarketParams) -> Result<Self> {
        params.validate()?;
        let desired = request.desired.rebase(params.stable_decimals, Rounding::Up)?;

        let requirement = plan_collateral(
            desired,
            params.ltv_bps,
            reads.price.as_ref(),
            params.collateral_decimals,
        )?;

        let price_known = reads.price.map_or(false, |p| !p.is_zero());
        let missing_collateral = match reads.posted_collateral(params) {
            _ if desired.is_zero() => Some(Quantity::zero(params.collateral_decimals)),
            Some(posted) if price_known => Some(requirement.required_amount.shortfall(&posted)?),
            _ => None,
        };

        let exceeds_user_cap = match reads.max_borrow() {
            Some(cap) => Some(desired.amount > cap),
            None => None,
        };
        let exceeds_pool_cap = reads.pool.map(|pool| desired.amount > pool.liquidity);

        Ok(Self {
            desired,
            duration_secs: request.duration_secs,
            required_collateral: requirement.required_amount,
            required_collateral_value: requirement.required_value,
            missing_collateral,
            exceeds_user_cap,
            exceeds_pool_cap,
        })
    }

    /// collateral already posted covers the plan
    pub fn has_sufficient_collateral(&self) -> bool {
        !self.desired.is_zero() && self.missing_collateral.map_or(false, |m| m.is_zero())
    }

    /// First unmet precondition for borrowing, if any.
    pub fn blocker(&self) -> Option<Blocker> {
        if self.desired.is_zero() {
            return Some(Blocker::EnterBorrowAmount);
        }
        match self.missing_collateral {
            Some(missing) if !missing.is_zero() => return Some(Blocker::MissingCollateral(missing)),
            _ => {}
        }
        if self.exceeds_user_cap == Some(true) {
            return Some(Blocker::AboveUserCap);
        }
        if self.exceeds_pool_cap == Some(true) {
            return Some(Blocker::AbovePoolLiquidity);
        }
        if self.missing_collateral.is_none() {
            return Some(Blocker::Unknown("collateral or price"));
        }
        if self.exceeds_user_cap.is_none() {
            return Some(Blocker::Unknown("borrow cap"));
        }
        if self.exceeds_pool_cap.is_none() {
            return Some(Blocker::Unknown("pool liquidity"));
        }
        None
    }
}
