//! manual price adapter: read the stored price, push a new one

use crate::bindings::IPriceAdapter::{self, pricesReturn, IPriceAdapterInstance};
use crate::error::{ChainError, Result};
use crate::tx::{confirm, send_failure, TxOutcome};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::DynProvider;
use chrono::{DateTime, Utc};
use floe_core::{PriceQuote, ADAPTER_DECIMALS};
use std::time::Duration;

/// Price currently stored on-chain for the feed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdapterPrice {
    /// 8 decimals
    pub raw: U256,
    /// display only
    pub price: f64,
    pub updated_at: DateTime<Utc>,
}

impl AdapterPrice {
    /// `None` when the adapter has never been fed
    fn from_return(ret: pricesReturn) -> Option<Self> {
        if !ret.exists {
            return None;
        }
        let secs = i64::try_from(ret.timestamp).unwrap_or(i64::MAX);
        Some(Self {
            raw: ret.price,
            price: PriceQuote::from_raw(ret.price, ADAPTER_DECIMALS).display,
            updated_at: DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }
}

pub struct AdapterClient {
    adapter: IPriceAdapterInstance<DynProvider>,
    feed_id: B256,
    confirm_timeout: Duration,
}

impl AdapterClient {
    pub fn new(provider: DynProvider, address: Address, feed_id: B256, confirm_timeout: Duration) -> Self {
        Self {
            adapter: IPriceAdapter::new(address, provider),
            feed_id,
            confirm_timeout,
        }
    }

    pub async fn read_price(&self) -> Result<Option<AdapterPrice>> {
        let ret = self
            .adapter
            .prices(self.feed_id)
            .call()
            .await
            .map_err(|e| ChainError::ReadFailure(format!("prices({}): {}", self.feed_id, e)))?;
        Ok(AdapterPrice::from_return(ret))
    }

    /// Submit `updatePrice(feedId, raw)` and wait for it to confirm.
    pub async fn push_price(&self, raw: U256) -> Result<TxOutcome> {
        let pending = self
            .adapter
            .updatePrice(self.feed_id, raw)
            .send()
            .await
            .map_err(|e| send_failure("updatePrice", e))?;
        confirm("updatePrice", pending, self.confirm_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_feed_reads_as_none() {
        let ret = pricesReturn { price: U256::ZERO, timestamp: U256::ZERO, exists: false };
        assert!(AdapterPrice::from_return(ret).is_none());
    }

    #[test]
    fn test_stored_price() {
        let ret = pricesReturn {
            price: U256::from(14_500_000_000u64),
            timestamp: U256::from(1_700_000_000u64),
            exists: true,
        };
        let stored = AdapterPrice::from_return(ret).unwrap();
        assert_eq!(stored.raw, U256::from(14_500_000_000u64));
        assert!((stored.price - 145.0).abs() < 1e-9);
        assert_eq!(stored.updated_at.timestamp(), 1_700_000_000);
    }
}
