//! floe chain - contract bindings and clients
//!
//! Thin async layer over the lending pool, the two ERC-20 tokens, the
//! collateral oracle and the manual price adapter. All fixed-point math lives
//! in `floe-core`; this crate only moves integers across the ABI boundary.

pub mod adapter;
pub mod bindings;
pub mod error;
pub mod ledger;
pub mod provider;
pub mod tx;

pub use adapter::{AdapterClient, AdapterPrice};
pub use error::{ChainError, Result};
pub use ledger::{LedgerAddresses, LedgerClient};
pub use provider::{parse_address, parse_feed_id, parse_signer, Connection};
pub use tx::TxOutcome;

pub use alloy::primitives::{Address, B256};

/// default RPC endpoint (Base Sepolia)
pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";

/// manual price adapter deployment
pub const DEFAULT_ADAPTER_ADDRESS: &str = "0xbBD700ca8Fc326c90BA90A028fC1C7b36b0e9D7B";

/// NVDA feed id on the adapter
pub const DEFAULT_FEED_ID: &str =
    "0xd7f402a699378a97cf4b1f46fb772a465535d2fead1457bcb27b58312638e264";

/// how long a submitted tx may take to confirm
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 120;
