//! floe core - fixed-point derivations for the NVDA / mUSDC lending pool
//!
//! Everything in this crate is pure: no network, no clocks, no shared state.
//! Ledger reads come in as raw integers in their native fixed-point bases and
//! leave as rebased quantities, borrow plans and gating decisions.
//!
//! Bases in play:
//! - collateral token (NVDA): 18 decimals
//! - stable token (mUSDC): 6 decimals
//! - price adapter / oracle: 8 decimals
//! - ratios (health factor, APRs, utilization): WAD, 18 decimals

pub mod allowance;
pub mod error;
pub mod fixed;
pub mod format;
pub mod gate;
pub mod plan;
pub mod position;
pub mod price;

pub use allowance::{needs_approval, AllowanceState, Asset, UNLIMITED_ALLOWANCE};
pub use error::{CoreError, Result};
pub use fixed::{ceil_div, parse_units, pow10, Quantity, Rounding};
pub use gate::{Action, Blocker, Gate};
pub use plan::{plan_collateral, BorrowPlan, BorrowRequest, CollateralRequirement, MarketParams};
pub use position::{
    BorrowerPosition, LedgerReads, LenderPosition, Metrics, PoolStats, PositionView, RateCurve,
    UserSnapshot,
};
pub use price::{drift, scale_price, PriceQuote};

pub use alloy_primitives::U256;

/// one, in WAD (18 decimal) fixed point
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// decimals of ratios reported by the ledger
pub const WAD_DECIMALS: u8 = 18;

/// decimals of the stable token (mUSDC)
pub const STABLE_DECIMALS: u8 = 6;

/// decimals of the collateral token (NVDA)
pub const COLLATERAL_DECIMALS: u8 = 18;

/// decimals of the on-chain price adapter
pub const ADAPTER_DECIMALS: u8 = 8;

/// system-wide loan-to-value ratio, in basis points (60%)
pub const LTV_BPS: u32 = 6_000;

/// basis points in one
pub const BPS_DENOMINATOR: u32 = 10_000;

/// health factors at or above this (1e6 in WAD) carry no practical liquidation risk
pub const HEALTH_FACTOR_INFINITY_THRESHOLD: u128 = 1_000_000 * WAD;

pub const COLLATERAL_SYMBOL: &str = "NVDA";
pub const STABLE_SYMBOL: &str = "mUSDC";
