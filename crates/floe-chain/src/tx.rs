//! transaction submission and confirmation

use crate::error::{ChainError, Result};
use alloy::contract;
use alloy::network::{Ethereum, ReceiptResponse};
use alloy::primitives::B256;
use alloy::providers::{PendingTransactionBuilder, PendingTransactionError, WatchTxError};
use std::time::Duration;
use tracing::{info, warn};

/// What a confirmed write reports back
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: B256,
    pub block: Option<u64>,
    pub gas_used: u64,
}

/// Map a failed `send()` to a write failure carrying the node's reason.
pub fn send_failure(what: &str, err: contract::Error) -> ChainError {
    ChainError::WriteFailure { reason: format!("{}: {}", what, err) }
}

/// Wait for the receipt of a submitted tx, giving up after `timeout`.
///
/// A reverted receipt is a write failure; the tx may still land after a
/// timeout, callers only learn that it was not seen in time.
pub async fn confirm(
    what: &str,
    pending: PendingTransactionBuilder<Ethereum>,
    timeout: Duration,
) -> Result<TxOutcome> {
    let hash = *pending.tx_hash();
    info!("{} submitted: {}", what, hash);

    let receipt = pending
        .with_timeout(Some(timeout))
        .get_receipt()
        .await
        .map_err(|e| match e {
            PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                ChainError::ConfirmationTimeout(hash.to_string())
            }
            other => ChainError::WriteFailure { reason: format!("{} {}: {}", what, hash, other) },
        })?;

    if !receipt.status() {
        warn!("{} reverted: {}", what, hash);
        return Err(ChainError::WriteFailure { reason: format!("{} {} reverted", what, hash) });
    }

    let outcome = TxOutcome {
        hash,
        block: receipt.block_number(),
        gas_used: receipt.gas_used(),
    };
    info!(
        "{} confirmed in block {} (gas used {})",
        what,
        outcome.block.map_or_else(|| "?".to_string(), |b| b.to_string()),
        outcome.gas_used
    );
    Ok(outcome)
}
