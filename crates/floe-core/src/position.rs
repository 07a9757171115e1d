//! ledger read records and the aggregated position view
//!
//! Records mirror the ledger's return values field by field, with names
//! instead of positions. Every read is optional in [`LedgerReads`]: a read
//! that has not completed (or failed) stays `None` and anything derived from
//! it is unknown rather than zero.

use crate::error::Result;
use crate::fixed::Quantity;
use crate::format::{format_health_factor, format_money, format_percent, format_token};
use crate::plan::{BorrowPlan, BorrowRequest, MarketParams};
use crate::price::PriceQuote;
use crate::COLLATERAL_SYMBOL;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Interest rate curve point, all WAD-scaled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCurve {
    pub utilization: U256,
    pub borrow_apr: U256,
    pub supply_apr: U256,
}

/// Per-user snapshot as returned by `getUserSnapshot`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// posted collateral, collateral base
    pub collateral_amount: U256,
    /// posted collateral valued in stable base
    pub collateral_value: U256,
    pub debt: U256,
    pub max_borrow: U256,
    /// WAD
    pub health_factor: U256,
    pub last_borrow_timestamp: u64,
    pub duration_secs: u64,
}

/// Per-user borrow side, stable base except the WAD health factor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerPosition {
    pub debt: U256,
    pub principal: U256,
    pub interest: U256,
    pub max_borrow: U256,
    pub health_factor: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LenderPosition {
    pub balance: U256,
    pub principal: U256,
    pub interest: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub deposits: U256,
    pub debt: U256,
    pub liquidity: U256,
}

/// One round of ledger reads. Fields are filled independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerReads {
    pub rates: Option<RateCurve>,
    pub snapshot: Option<UserSnapshot>,
    pub borrower: Option<BorrowerPosition>,
    pub lender: Option<LenderPosition>,
    pub pool: Option<PoolStats>,
    pub price: Option<PriceQuote>,
}

impl LedgerReads {
    pub fn posted_collateral(&self, params: &MarketParams) -> Option<Quantity> {
        self.snapshot
            .map(|s| Quantity::new(s.collateral_amount, params.collateral_decimals))
    }

    /// borrow position first, snapshot as fallback
    pub fn max_borrow(&self) -> Option<U256> {
        self.borrower
            .map(|b| b.max_borrow)
            .or(self.snapshot.map(|s| s.max_borrow))
    }

    pub fn debt(&self) -> Option<U256> {
        self.borrower.map(|b| b.debt).or(self.snapshot.map(|s| s.debt))
    }

    pub fn health_factor(&self) -> Option<U256> {
        self.borrower
            .map(|b| b.health_factor)
            .or(self.snapshot.map(|s| s.health_factor))
    }
}

/// Ledger reads merged with the current borrow plan
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub reads: LedgerReads,
    pub params: MarketParams,
    pub has_outstanding_debt: Option<bool>,
    pub plan: BorrowPlan,
}

impl PositionView {
    /// Merge a round of reads with the user's borrow request. Pure; call again
    /// whenever either input changes.
    pub fn aggregate(reads: LedgerReads, request: &BorrowRequest, params: &MarketParams) -> Result<Self> {
        let plan = BorrowPlan::compute(&reads, request, params)?;
        Ok(Self {
            has_outstanding_debt: reads.debt().map(|debt| !debt.is_zero()),
            reads,
            params: *params,
            plan,
        })
    }

    /// `max(0, required - posted)`, unknown until collateral and price are loaded
    pub fn collateral_shortfall(&self) -> Option<Quantity> {
        self.plan.missing_collateral
    }

    pub fn exceeds_user_cap(&self) -> Option<bool> {
        self.plan.exceeds_user_cap
    }

    pub fn exceeds_pool_cap(&self) -> Option<bool> {
        self.plan.exceeds_pool_cap
    }

    pub fn metrics(&self) -> Metrics {
        let stable = self.params.stable_decimals;
        let collateral = self.params.collateral_decimals;
        let money = |v: Option<U256>| v.map_or_else(dash, |v| format_money(v, stable, 2));
        let money4 = |v: Option<U256>| v.map_or_else(dash, |v| format_money(v, stable, 4));
        let percent = |v: Option<U256>| v.map_or_else(dash, |v| format_percent(v, 2));

        let r = &self.reads;
        Metrics {
            spot_price: r
                .price
                .map_or_else(dash, |p| format_money(p.raw, p.decimals, 2)),
            borrow_apr: percent(r.rates.map(|x| x.borrow_apr)),
            supply_apr: percent(r.rates.map(|x| x.supply_apr)),
            utilization: percent(r.rates.map(|x| x.utilization)),
            pool_liquidity: money(r.pool.map(|p| p.liquidity)),
            pool_debt: money(r.pool.map(|p| p.debt)),
            pool_deposits: money(r.pool.map(|p| p.deposits)),
            collateral_amount: r.snapshot.map_or_else(dash, |s| {
                format!("{} {}", format_token(s.collateral_amount, collateral, 4), COLLATERAL_SYMBOL)
            }),
            collateral_value: money(r.snapshot.map(|s| s.collateral_value)),
            max_borrow: money(r.borrower.map(|b| b.max_borrow)),
            repay_total: money(r.borrower.map(|b| b.debt)),
            borrower_interest: money4(r.borrower.map(|b| b.interest)),
            health_factor: format_health_factor(r.health_factor()),
            lender_balance: money(r.lender.map(|l| l.balance)),
            lender_principal: money(r.lender.map(|l| l.principal)),
            lender_interest: money4(r.lender.map(|l| l.interest)),
        }
    }
}

fn dash() -> String {
    "--".to_string()
}

/// Display strings for the position dashboard
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub spot_price: String,
    pub borrow_apr: String,
    pub supply_apr: String,
    pub utilization: String,
    pub pool_liquidity: String,
    pub pool_debt: String,
    pub pool_deposits: String,
    pub collateral_amount: String,
    pub collateral_value: String,
    pub max_borrow: String,
    pub repay_total: String,
    pub borrower_interest: String,
    pub health_factor: String,
    pub lender_balance: String,
    pub lender_principal: String,
    pub lender_interest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ADAPTER_DECIMALS, WAD};

    fn usdc(units: u64) -> U256 {
        U256::from(units) * U256::from(1_000_000u64)
    }

    fn reads() -> LedgerReads {
        LedgerReads {
            rates: Some(RateCurve {
                utilization: U256::from(WAD / 2),
                borrow_apr: U256::from(WAD / 10),
                supply_apr: U256::from(45_000_000_000_000_000u128),
            }),
            snapshot: Some(UserSnapshot {
                collateral_amount: U256::from(2 * WAD),
                collateral_value: usdc(290),
                debt: usdc(50),
                max_borrow: usdc(124),
                health_factor: U256::from(3 * WAD / 2),
                last_borrow_timestamp: 1_700_000_000,
                duration_secs: 30 * 86_400,
            }),
            borrower: Some(BorrowerPosition {
                debt: usdc(50),
                principal: usdc(49),
                interest: usdc(1),
                max_borrow: usdc(124),
                health_factor: U256::from(3 * WAD / 2),
            }),
            lender: Some(LenderPosition {
                balance: usdc(1_001),
                principal: usdc(1_000),
                interest: usdc(1),
            }),
            pool: Some(PoolStats {
                deposits: usdc(10_000),
                debt: usdc(5_000),
                liquidity: usdc(5_000),
            }),
            price: Some(PriceQuote::from_raw(U256::from(14_500_000_000u64), ADAPTER_DECIMALS)),
        }
    }

    #[test]
    fn test_aggregate_flags() {
        let params = MarketParams::default();
        let request = BorrowRequest::new(Quantity::new(usdc(60), 6), 30);
        let view = PositionView::aggregate(reads(), &request, &params).unwrap();
        assert_eq!(view.has_outstanding_debt, Some(true));
        assert_eq!(view.exceeds_user_cap(), Some(false));
        assert_eq!(view.exceeds_pool_cap(), Some(false));
        // 60 / 0.6 = $100 at $145 < 2 NVDA posted
        assert_eq!(view.collateral_shortfall(), Some(Quantity::zero(18)));
    }

    #[test]
    fn test_aggregate_unknown_reads_stay_unknown() {
        let params = MarketParams::default();
        let request = BorrowRequest::new(Quantity::new(usdc(60), 6), 30);
        let view = PositionView::aggregate(LedgerReads::default(), &request, &params).unwrap();
        assert_eq!(view.has_outstanding_debt, None);
        assert_eq!(view.collateral_shortfall(), None);
        assert_eq!(view.exceeds_user_cap(), None);
        assert_eq!(view.exceeds_pool_cap(), None);
    }

    #[test]
    fn test_debt_falls_back_to_snapshot() {
        let mut r = reads();
        r.borrower = None;
        assert_eq!(r.debt(), Some(usdc(50)));
        assert_eq!(r.max_borrow(), Some(usdc(124)));
    }

    #[test]
    fn test_metrics() {
        let params = MarketParams::default();
        let view = PositionView::aggregate(reads(), &BorrowRequest::empty(&params), &params).unwrap();
        let m = view.metrics();
        assert_eq!(m.spot_price, "$145.00");
        assert_eq!(m.utilization, "50.00%");
        assert_eq!(m.borrow_apr, "10.00%");
        assert_eq!(m.supply_apr, "4.50%");
        assert_eq!(m.pool_deposits, "$10,000.00");
        assert_eq!(m.collateral_amount, "2 NVDA");
        assert_eq!(m.borrower_interest, "$1.0000");
        assert_eq!(m.health_factor, "1.50");
        assert_eq!(m.lender_balance, "$1,001.00");
    }

    #[test]
    fn test_health_factor_from_snapshot() {
        let params = MarketParams::default();
        let r = LedgerReads { borrower: None, ..reads() };
        let view = PositionView::aggregate(r, &BorrowRequest::empty(&params), &params).unwrap();
        let m = view.metrics();
        assert_eq!(m.health_factor, "1.50");
        assert_eq!(m.borrower_interest, "--");
    }

    #[test]
    fn test_metrics_unknown() {
        let params = MarketParams::default();
        let view = PositionView::aggregate(LedgerReads::default(), &BorrowRequest::empty(&params), &params).unwrap();
        let m = view.metrics();
        assert_eq!(m.spot_price, "--");
        assert_eq!(m.health_factor, "--");
        assert_eq!(m.pool_liquidity, "--");
    }
}
