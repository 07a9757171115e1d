//! lending pool client
//!
//! Reads are issued together and fail independently: a failed read is
//! logged and left as `None` in [`LedgerReads`] so the rest of the view still
//! renders. Writes wait for their receipt.

use crate::bindings::IAggregator::{self, IAggregatorInstance};
use crate::bindings::IERC20::{self, IERC20Instance};
use crate::bindings::INvdaLendingPool::{
    self, getBorrowerPositionReturn, getLenderPositionReturn, getPoolStatsReturn,
    getRatesReturn, getUserSnapshotReturn, INvdaLendingPoolInstance,
};
use crate::error::Result;
use crate::tx::{confirm, send_failure, TxOutcome};
use alloy::primitives::{Address, I256, U256};
use alloy::providers::DynProvider;
use floe_core::{
    AllowanceState, Asset, BorrowerPosition, LedgerReads, LenderPosition, PoolStats, PriceQuote,
    RateCurve, UserSnapshot,
};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

/// Contract addresses the client talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerAddresses {
    pub pool: Address,
    pub collateral_token: Address,
    pub stable_token: Address,
    pub oracle: Address,
}

pub struct LedgerClient {
    addresses: LedgerAddresses,
    pool: INvdaLendingPoolInstance<DynProvider>,
    collateral: IERC20Instance<DynProvider>,
    stable: IERC20Instance<DynProvider>,
    oracle: IAggregatorInstance<DynProvider>,
    confirm_timeout: Duration,
}

impl LedgerClient {
    pub fn new(provider: DynProvider, addresses: LedgerAddresses, confirm_timeout: Duration) -> Self {
        Self {
            pool: INvdaLendingPool::new(addresses.pool, provider.clone()),
            collateral: IERC20::new(addresses.collateral_token, provider.clone()),
            stable: IERC20::new(addresses.stable_token, provider.clone()),
            oracle: IAggregator::new(addresses.oracle, provider),
            addresses,
            confirm_timeout,
        }
    }

    /// One round of reads for `user`, all in flight at once.
    pub async fn read_all(&self, user: Address) -> LedgerReads {
        let rates = self.pool.getRates();
        let snapshot = self.pool.getUserSnapshot(user);
        let borrower = self.pool.getBorrowerPosition(user);
        let lender = self.pool.getLenderPosition(user);
        let stats = self.pool.getPoolStats();
        let answer = self.oracle.latestAnswer();
        let decimals = self.oracle.decimals();

        let (rates, snapshot, borrower, lender, stats, answer, decimals) = tokio::join!(
            rates.call(),
            snapshot.call(),
            borrower.call(),
            lender.call(),
            stats.call(),
            answer.call(),
            decimals.call(),
        );

        let price = match (
            logged("latestAnswer", answer),
            logged("decimals", decimals),
        ) {
            (Some(answer), Some(decimals)) => oracle_quote(answer, decimals),
            _ => None,
        };

        let reads = LedgerReads {
            rates: logged("getRates", rates).map(RateCurve::from_return),
            snapshot: logged("getUserSnapshot", snapshot).map(UserSnapshot::from_return),
            borrower: logged("getBorrowerPosition", borrower).map(BorrowerPosition::from_return),
            lender: logged("getLenderPosition", lender).map(LenderPosition::from_return),
            pool: logged("getPoolStats", stats).map(PoolStats::from_return),
            price,
        };
        debug!("ledger reads for {}: {:?}", user, reads);
        reads
    }

    /// Allowances `owner` granted to the pool on both tokens.
    pub async fn read_allowances(&self, owner: Address) -> AllowanceState {
        let collateral = self.collateral.allowance(owner, self.addresses.pool);
        let stable = self.stable.allowance(owner, self.addresses.pool);
        let (collateral, stable) = tokio::join!(collateral.call(), stable.call());
        AllowanceState {
            collateral: logged("collateral allowance", collateral),
            stable: logged("stable allowance", stable),
        }
    }

    pub async fn deposit_collateral(&self, amount: U256) -> Result<TxOutcome> {
        let pending = self
            .pool
            .depositCollateral(amount)
            .send()
            .await
            .map_err(|e| send_failure("depositCollateral", e))?;
        confirm("depositCollateral", pending, self.confirm_timeout).await
    }

    pub async fn withdraw_collateral(&self, amount: U256) -> Result<TxOutcome> {
        let pending = self
            .pool
            .withdrawCollateral(amount)
            .send()
            .await
            .map_err(|e| send_failure("withdrawCollateral", e))?;
        confirm("withdrawCollateral", pending, self.confirm_timeout).await
    }

    pub async fn deposit_stable(&self, amount: U256) -> Result<TxOutcome> {
        let pending = self
            .pool
            .depositUSDC(amount)
            .send()
            .await
            .map_err(|e| send_failure("depositUSDC", e))?;
        confirm("depositUSDC", pending, self.confirm_timeout).await
    }

    pub async fn withdraw_stable(&self, amount: U256) -> Result<TxOutcome> {
        let pending = self
            .pool
            .withdrawUSDC(amount)
            .send()
            .await
            .map_err(|e| send_failure("withdrawUSDC", e))?;
        confirm("withdrawUSDC", pending, self.confirm_timeout).await
    }

    pub async fn borrow(&self, amount: U256, duration_secs: u64) -> Result<TxOutcome> {
        let pending = self
            .pool
            .borrow(amount, U256::from(duration_secs))
            .send()
            .await
            .map_err(|e| send_failure("borrow", e))?;
        confirm("borrow", pending, self.confirm_timeout).await
    }

    pub async fn repay(&self, amount: U256) -> Result<TxOutcome> {
        let pending = self
            .pool
            .repay(amount)
            .send()
            .await
            .map_err(|e| send_failure("repay", e))?;
        confirm("repay", pending, self.confirm_timeout).await
    }

    /// Grant the pool `amount` of `asset`; pass `UNLIMITED_ALLOWANCE` for a
    /// standing approval.
    pub async fn approve(&self, asset: Asset, amount: U256) -> Result<TxOutcome> {
        let token = match asset {
            Asset::Collateral => &self.collateral,
            Asset::Stable => &self.stable,
        };
        let what = format!("approve {}", asset);
        let pending = token
            .approve(self.addresses.pool, amount)
            .send()
            .await
            .map_err(|e| send_failure(&what, e))?;
        confirm(&what, pending, self.confirm_timeout).await
    }
}

fn logged<T, E: Display>(what: &str, result: std::result::Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("chain read {} failed: {}", what, e);
            None
        }
    }
}

/// Oracle answer as a quote; a negative answer is treated as unreadable.
fn oracle_quote(answer: I256, decimals: u8) -> Option<PriceQuote> {
    if answer.is_negative() {
        warn!("oracle returned negative answer {}", answer);
        return None;
    }
    Some(PriceQuote::from_raw(answer.into_raw(), decimals))
}

// tuple-shaped ABI returns become named records here and nowhere else

trait FromReturn<R> {
    fn from_return(ret: R) -> Self;
}

impl FromReturn<getRatesReturn> for RateCurve {
    fn from_return(ret: getRatesReturn) -> Self {
        RateCurve {
            utilization: ret.utilization,
            borrow_apr: ret.borrowAPR,
            supply_apr: ret.supplyAPR,
        }
    }
}

impl FromReturn<getUserSnapshotReturn> for UserSnapshot {
    fn from_return(ret: getUserSnapshotReturn) -> Self {
        UserSnapshot {
            collateral_amount: ret.collateralNVDA,
            collateral_value: ret.collateralUSD,
            debt: ret.debtUSDC,
            max_borrow: ret.maxBorrowUSDC,
            health_factor: ret.healthFactor,
            last_borrow_timestamp: ret.lastBorrowTimestamp.to::<u64>(),
            duration_secs: ret.durationSeconds.to::<u64>(),
        }
    }
}

impl FromReturn<getBorrowerPositionReturn> for BorrowerPosition {
    fn from_return(ret: getBorrowerPositionReturn) -> Self {
        BorrowerPosition {
            debt: ret.debtUSDC,
            principal: ret.principalUSDC,
            interest: ret.interestUSDC,
            max_borrow: ret.maxBorrowUSDC,
            health_factor: ret.healthFactor,
        }
    }
}

impl FromReturn<getLenderPositionReturn> for LenderPosition {
    fn from_return(ret: getLenderPositionReturn) -> Self {
        LenderPosition {
            balance: ret.balance,
            principal: ret.principal,
            interest: ret.interest,
        }
    }
}

impl FromReturn<getPoolStatsReturn> for PoolStats {
    fn from_return(ret: getPoolStatsReturn) -> Self {
        PoolStats {
            deposits: ret.deposits,
            debt: ret.debt,
            liquidity: ret.liquidity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::aliases::U40;
    use floe_core::{ADAPTER_DECIMALS, WAD};

    #[test]
    fn test_snapshot_fields_by_name() {
        let ret = getUserSnapshotReturn {
            collateralNVDA: U256::from(2 * WAD),
            collateralUSD: U256::from(290_000_000u64),
            debtUSDC: U256::from(100_000_000u64),
            maxBorrowUSDC: U256::from(174_000_000u64),
            healthFactor: U256::from(3 * WAD / 2),
            lastBorrowTimestamp: U40::from(1_700_000_000u64),
            durationSeconds: U40::from(30 * 86_400u64),
        };
        let snap = UserSnapshot::from_return(ret);
        assert_eq!(snap.collateral_amount, U256::from(2 * WAD));
        assert_eq!(snap.collateral_value, U256::from(290_000_000u64));
        assert_eq!(snap.debt, U256::from(100_000_000u64));
        assert_eq!(snap.max_borrow, U256::from(174_000_000u64));
        assert_eq!(snap.last_borrow_timestamp, 1_700_000_000);
        assert_eq!(snap.duration_secs, 2_592_000);
    }

    #[test]
    fn test_rates_and_pool() {
        let rates = RateCurve::from_return(getRatesReturn {
            utilization: U256::from(WAD / 2),
            borrowAPR: U256::from(WAD / 10),
            supplyAPR: U256::from(WAD / 20),
        });
        assert_eq!(rates.borrow_apr, U256::from(WAD / 10));
        assert_eq!(rates.supply_apr, U256::from(WAD / 20));

        let pool = PoolStats::from_return(getPoolStatsReturn {
            deposits: U256::from(10u64),
            debt: U256::from(4u64),
            liquidity: U256::from(6u64),
        });
        assert_eq!(pool, PoolStats { deposits: U256::from(10u64), debt: U256::from(4u64), liquidity: U256::from(6u64) });
    }

    #[test]
    fn test_oracle_quote() {
        let quote = oracle_quote(I256::try_from(14_567_000_000i64).unwrap(), ADAPTER_DECIMALS).unwrap();
        assert_eq!(quote.raw, U256::from(14_567_000_000u64));
        assert!((quote.display - 145.67).abs() < 1e-9);
        assert!(oracle_quote(I256::try_from(-1i64).unwrap(), ADAPTER_DECIMALS).is_none());
    }

    #[test]
    fn test_logged_maps_failure_to_none() {
        let ok: std::result::Result<u8, String> = Ok(8);
        let err: std::result::Result<u8, String> = Err("rpc down".into());
        assert_eq!(logged("decimals", ok), Some(8));
        assert_eq!(logged("decimals", err), None);
    }
}
