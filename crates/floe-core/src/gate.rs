//! action gating
//!
//! Each ledger write is either ready or blocked on one specific, user-facing
//! precondition. Gating never errors: unknown inputs block.

use crate::allowance::{AllowanceState, Asset};
use crate::fixed::Quantity;
use crate::format::format_token;
use crate::position::PositionView;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    DepositCollateral,
    WithdrawCollateral,
    Borrow,
    Repay,
    DepositStable,
    WithdrawStable,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::DepositCollateral | Action::DepositStable => "depositing",
            Action::WithdrawCollateral | Action::WithdrawStable => "withdrawing",
            Action::Borrow => "borrowing",
            Action::Repay => "repaying",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Blocker {
    EnterBorrowAmount,
    EnterAmount,
    /// posted collateral already covers the plan
    NothingToDeposit,
    MissingCollateral(Quantity),
    AboveUserCap,
    AbovePoolLiquidity,
    ApprovalRequired(Asset, Action),
    OutstandingDebt,
    /// an input this decision depends on has not been read
    Unknown(&'static str),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::EnterBorrowAmount => {
                write!(f, "enter the {} amount you plan to borrow first", Asset::Stable)
            }
            Blocker::EnterAmount => f.write_str("enter an amount greater than zero"),
            Blocker::NothingToDeposit => write!(
                f,
                "you already have enough {} posted for this borrow plan",
                Asset::Collateral
            ),
            Blocker::MissingCollateral(missing) => write!(
                f,
                "stake the required {} before borrowing ({} {} still needed)",
                Asset::Collateral,
                format_token(missing.amount, missing.decimals, 4),
                Asset::Collateral
            ),
            Blocker::AboveUserCap => f.write_str("above your collateral limit"),
            Blocker::AbovePoolLiquidity => f.write_str("above pool liquidity"),
            Blocker::ApprovalRequired(asset, action) => {
                write!(f, "approve {} spending cap before {}", asset, action.verb())
            }
            Blocker::OutstandingDebt => write!(
                f,
                "repay outstanding {} before withdrawing {}",
                Asset::Stable,
                Asset::Collateral
            ),
            Blocker::Unknown(what) => write!(f, "{} not loaded yet", what),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Gate {
    Ready,
    Blocked(Blocker),
}

impl Gate {
    pub fn is_ready(&self) -> bool {
        matches!(self, Gate::Ready)
    }

    fn from_blocker(blocker: Option<Blocker>) -> Self {
        blocker.map_or(Gate::Ready, Gate::Blocked)
    }
}

/// Deposit exactly the plan's missing collateral.
pub fn deposit_collateral(view: &PositionView, allowances: &AllowanceState) -> Gate {
    if view.plan.desired.is_zero() {
        return Gate::Blocked(Blocker::EnterBorrowAmount);
    }
    let missing = match view.plan.missing_collateral {
        Some(missing) => missing,
        None => return Gate::Blocked(Blocker::Unknown("collateral or price")),
    };
    if missing.is_zero() {
        return Gate::Blocked(Blocker::NothingToDeposit);
    }
    approval_gate(allowances, Asset::Collateral, &missing, Action::DepositCollateral)
}

pub fn withdraw_collateral(view: &PositionView, amount: &Quantity) -> Gate {
    if amount.is_zero() {
        return Gate::Blocked(Blocker::EnterAmount);
    }
    match view.has_outstanding_debt {
        Some(false) => Gate::Ready,
        Some(true) => Gate::Blocked(Blocker::OutstandingDebt),
        None => Gate::Blocked(Blocker::Unknown("debt")),
    }
}

pub fn borrow(view: &PositionView) -> Gate {
    Gate::from_blocker(view.plan.blocker())
}

pub fn repay(amount: &Quantity, allowances: &AllowanceState) -> Gate {
    spend_stable(amount, allowances, Action::Repay)
}

pub fn deposit_stable(amount: &Quantity, allowances: &AllowanceState) -> Gate {
    spend_stable(amount, allowances, Action::DepositStable)
}

pub fn withdraw_stable(amount: &Quantity) -> Gate {
    if amount.is_zero() {
        return Gate::Blocked(Blocker::EnterAmount);
    }
    Gate::Ready
}

fn spend_stable(amount: &Quantity, allowances: &AllowanceState, action: Action) -> Gate {
    if amount.is_zero() {
        return Gate::Blocked(Blocker::EnterAmount);
    }
    approval_gate(allowances, Asset::Stable, amount, action)
}

fn approval_gate(allowances: &AllowanceState, asset: Asset, spend: &Quantity, action: Action) -> Gate {
    match allowances.needs_approval(asset, spend) {
        Some(false) => Gate::Ready,
        Some(true) => Gate::Blocked(Blocker::ApprovalRequired(asset, action)),
        None => Gate::Blocked(Blocker::Unknown("allowance")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{BorrowRequest, MarketParams};
    use crate::position::{LedgerReads, PoolStats, UserSnapshot};
    use crate::price::PriceQuote;
    use crate::WAD;
    use alloy_primitives::U256;

    fn view(desired_usdc: u64, debt: u64) -> PositionView {
        let reads = LedgerReads {
            snapshot: Some(UserSnapshot {
                collateral_amount: U256::from(WAD),
                collateral_value: U256::from(100_000_000u64),
                debt: U256::from(debt),
                max_borrow: U256::from(60_000_000u64),
                health_factor: U256::ZERO,
                last_borrow_timestamp: 0,
                duration_secs: 0,
            }),
            pool: Some(PoolStats {
                deposits: U256::from(500_000_000u64),
                debt: U256::ZERO,
                liquidity: U256::from(500_000_000u64),
            }),
            price: Some(PriceQuote::from_raw(U256::from(10_000_000_000u64), 8)),
            ..Default::default()
        };
        let params = MarketParams::default();
        let request = BorrowRequest::new(Quantity::from_units(desired_usdc, 6).unwrap(), 30);
        PositionView::aggregate(reads, &request, &params).unwrap()
    }

    fn usdc(units: u64) -> Quantity {
        Quantity::from_units(units, 6).unwrap()
    }

    #[test]
    fn test_deposit_collateral_needs_plan() {
        let allowances = AllowanceState::default();
        assert_eq!(
            deposit_collateral(&view(0, 0), &allowances),
            Gate::Blocked(Blocker::EnterBorrowAmount)
        );
        assert_eq!(
            deposit_collateral(&view(30, 0), &allowances),
            Gate::Blocked(Blocker::NothingToDeposit)
        );
    }

    #[test]
    fn test_deposit_collateral_needs_approval() {
        // 120 mUSDC needs 2 NVDA, 1 posted
        let v = view(120, 0);
        let unread = AllowanceState::default();
        assert_eq!(
            deposit_collateral(&v, &unread),
            Gate::Blocked(Blocker::Unknown("allowance"))
        );
        let none = AllowanceState { collateral: Some(U256::ZERO), stable: None };
        assert_eq!(
            deposit_collateral(&v, &none),
            Gate::Blocked(Blocker::ApprovalRequired(Asset::Collateral, Action::DepositCollateral))
        );
        let partial = AllowanceState { collateral: Some(U256::from(WAD / 2)), stable: None };
        assert!(!deposit_collateral(&v, &partial).is_ready());
        let enough = AllowanceState { collateral: Some(U256::from(WAD)), stable: None };
        assert!(deposit_collateral(&v, &enough).is_ready());
    }

    #[test]
    fn test_withdraw_collateral_blocked_by_debt() {
        let amount = Quantity::new(U256::from(WAD), 18);
        assert_eq!(
            withdraw_collateral(&view(0, 10), &amount),
            Gate::Blocked(Blocker::OutstandingDebt)
        );
        assert!(withdraw_collateral(&view(0, 0), &amount).is_ready());
        assert_eq!(
            withdraw_collateral(&view(0, 0), &Quantity::zero(18)),
            Gate::Blocked(Blocker::EnterAmount)
        );
    }

    #[test]
    fn test_borrow_gate() {
        assert!(borrow(&view(60, 0)).is_ready());
        assert!(matches!(
            borrow(&view(120, 0)),
            Gate::Blocked(Blocker::MissingCollateral(_))
        ));
    }

    #[test]
    fn test_stable_spends() {
        let granted = AllowanceState { collateral: None, stable: Some(U256::from(50_000_000u64)) };
        assert!(repay(&usdc(50), &granted).is_ready());
        assert_eq!(
            repay(&usdc(51), &granted),
            Gate::Blocked(Blocker::ApprovalRequired(Asset::Stable, Action::Repay))
        );
        assert_eq!(deposit_stable(&usdc(0), &granted), Gate::Blocked(Blocker::EnterAmount));
        assert!(withdraw_stable(&usdc(1)).is_ready());

        let unread = AllowanceState::default();
        assert_eq!(
            deposit_stable(&usdc(1), &unread),
            Gate::Blocked(Blocker::Unknown("allowance"))
        );
        assert_eq!(deposit_stable(&usdc(0), &unread), Gate::Blocked(Blocker::EnterAmount));
    }

    #[test]
    fn test_messages_are_specific() {
        let msg = Blocker::ApprovalRequired(Asset::Stable, Action::Repay).to_string();
        assert_eq!(msg, "approve mUSDC spending cap before repaying");
        let missing = Quantity::new(U256::from(WAD / 2), 18);
        assert_eq!(
            Blocker::MissingCollateral(missing).to_string(),
            "stake the required NVDA before borrowing (0.5 NVDA still needed)"
        );
    }
}
