//! Solidity interfaces used by floe

use alloy::sol;

sol! {
    /// NVDA-collateralized mUSDC lending pool
    #[sol(rpc)]
    interface INvdaLendingPool {
        function depositCollateral(uint256 amount) external;
        function withdrawCollateral(uint256 amount) external;
        function depositUSDC(uint256 amount) external;
        function withdrawUSDC(uint256 amount) external;
        function borrow(uint256 amount, uint256 durationSeconds) external;
        function repay(uint256 amount) external;

        function getUserSnapshot(address user) external view returns (
            uint256 collateralNVDA,
            uint256 collateralUSD,
            uint256 debtUSDC,
            uint256 maxBorrowUSDC,
            uint256 healthFactor,
            uint40 lastBorrowTimestamp,
            uint40 durationSeconds
        );
        function getRates() external view returns (uint256 utilization, uint256 borrowAPR, uint256 supplyAPR);
        function getBorrowerPosition(address user) external view returns (
            uint256 debtUSDC,
            uint256 principalUSDC,
            uint256 interestUSDC,
            uint256 maxBorrowUSDC,
            uint256 healthFactor
        );
        function getLenderPosition(address user) external view returns (uint256 balance, uint256 principal, uint256 interest);
        function getPoolStats() external view returns (uint256 deposits, uint256 debt, uint256 liquidity);
    }

    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Chainlink-style aggregator the pool prices collateral with
    #[sol(rpc)]
    interface IAggregator {
        function latestAnswer() external view returns (int256);
        function decimals() external view returns (uint8);
    }

    /// Manually fed price adapter, 8 decimals
    #[sol(rpc)]
    interface IPriceAdapter {
        function updatePrice(bytes32 feedId, uint256 price) external;
        function prices(bytes32 feedId) external view returns (uint256 price, uint256 timestamp, bool exists);
    }
}
