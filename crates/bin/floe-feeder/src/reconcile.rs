//! price reconciliation loop
//!
//! Each cycle fetches the market price, compares it against the adapter's
//! stored price, and pushes the market price on-chain when the push policy
//! allows. Cycles never overlap: a cycle runs inline in the timer loop and
//! any tick that comes due while it runs is dropped and counted.

use crate::error::{FeederError, Result};
use crate::feed::YahooFeed;
use crate::stats::ReconciliationStats;
use chrono::Utc;
use floe_chain::{AdapterClient, AdapterPrice, TxOutcome};
use floe_core::{drift, scale_price, ADAPTER_DECIMALS, BPS_DENOMINATOR, U256};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[async_trait::async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_reference_price(&self) -> Result<f64>;
}

#[async_trait::async_trait]
pub trait PriceAdapter: Send + Sync {
    /// `None` when no price has been stored yet
    async fn read_price(&self) -> Result<Option<AdapterPrice>>;

    /// Store `raw` (8 decimals) and wait for confirmation.
    async fn push_price(&self, raw: U256) -> Result<TxOutcome>;
}

#[async_trait::async_trait]
impl PriceFeed for YahooFeed {
    async fn fetch_reference_price(&self) -> Result<f64> {
        YahooFeed::fetch_reference_price(self).await
    }
}

#[async_trait::async_trait]
impl PriceAdapter for AdapterClient {
    async fn read_price(&self) -> Result<Option<AdapterPrice>> {
        Ok(AdapterClient::read_price(self).await?)
    }

    async fn push_price(&self, raw: U256) -> Result<TxOutcome> {
        Ok(AdapterClient::push_price(self, raw).await?)
    }
}

/// When a fetched price is worth a write.
///
/// `min_drift_bps == 0` pushes on every successful fetch. Otherwise a push is
/// held back only when the drift is known and below the threshold; a missing
/// or unreadable on-chain price always pushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PushPolicy {
    pub min_drift_bps: u32,
}

impl PushPolicy {
    pub fn should_push(&self, drift: Option<f64>) -> bool {
        if self.min_drift_bps == 0 {
            return true;
        }
        match drift {
            Some(d) => d * f64::from(BPS_DENOMINATOR) >= f64::from(self.min_drift_bps),
            None => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub feed: Duration,
    pub read: Duration,
    /// covers submission and confirmation
    pub push: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Comparing,
    Pushing,
    Failed,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Pushed {
        price: f64,
        raw: U256,
        drift: Option<f64>,
        tx: TxOutcome,
    },
    /// drift below the push threshold
    Held { price: f64, drift: f64 },
    Failed(FeederError),
}

impl CycleOutcome {
    pub fn log(&self) {
        match self {
            CycleOutcome::Pushed { price, raw, drift, tx } => {
                info!(
                    "price updated to ${:.2} ({}): tx {} block {} gas used {}",
                    price,
                    raw,
                    tx.hash,
                    tx.block.map_or_else(|| "?".to_string(), |b| b.to_string()),
                    tx.gas_used
                );
                if let Some(d) = drift {
                    debug!("pushed at drift {:.4}%", d * 100.0);
                }
            }
            CycleOutcome::Held { price, drift } => {
                info!("holding at ${:.2}, drift {:.2}%", price, drift * 100.0);
            }
            CycleOutcome::Failed(e) => error!("update cycle failed: {}", e),
        }
    }
}

pub struct Reconciler<F, A> {
    feed: F,
    adapter: A,
    policy: PushPolicy,
    timeouts: Timeouts,
    state: CycleState,
    stats: ReconciliationStats,
}

impl<F: PriceFeed, A: PriceAdapter> Reconciler<F, A> {
    pub fn new(feed: F, adapter: A, policy: PushPolicy, timeouts: Timeouts) -> Self {
        Self {
            feed,
            adapter,
            policy,
            timeouts,
            state: CycleState::Idle,
            stats: ReconciliationStats::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> CycleState {
        self.state
    }

    #[cfg(test)]
    pub fn stats(&self) -> &ReconciliationStats {
        &self.stats
    }

    fn enter(&mut self, state: CycleState) {
        debug!("cycle state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// One full cycle. Errors are absorbed here and counted.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        info!("update cycle at {}", Utc::now().to_rfc3339());
        let outcome = match self.reconcile().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.enter(CycleState::Failed);
                self.stats.record_failure();
                CycleOutcome::Failed(e)
            }
        };
        outcome.log();
        self.enter(CycleState::Idle);
        self.stats.log();
        outcome
    }

    async fn reconcile(&mut self) -> Result<CycleOutcome> {
        self.enter(CycleState::Fetching);
        let price = timeout(self.timeouts.feed, self.feed.fetch_reference_price())
            .await
            .map_err(|_| FeederError::Timeout("market feed"))??;
        info!("market price: ${:.2}", price);

        self.enter(CycleState::Comparing);
        let drift = self.compare(price).await;
        if !self.policy.should_push(drift) {
            let drift = drift.unwrap_or_default();
            self.stats.held += 1;
            info!(
                "drift {:.2}% below {} bps, not pushing",
                drift * 100.0,
                self.policy.min_drift_bps
            );
            return Ok(CycleOutcome::Held { price, drift });
        }

        self.enter(CycleState::Pushing);
        let raw = scale_price(price, ADAPTER_DECIMALS)
            .map_err(|e| FeederError::FeedMalformed(e.to_string()))?;
        info!("updating price to ${:.2} ({})", price, raw);
        let tx = timeout(self.timeouts.push, self.adapter.push_price(raw))
            .await
            .map_err(|_| FeederError::Timeout("price update"))??;

        self.stats.record_success(price, Utc::now());
        Ok(CycleOutcome::Pushed { price, raw, drift, tx })
    }

    /// Best effort: a failed read only costs the drift figure.
    async fn compare(&self, market: f64) -> Option<f64> {
        let stored = match timeout(self.timeouts.read, self.adapter.read_price()).await {
            Ok(Ok(Some(stored))) => stored,
            Ok(Ok(None)) => {
                info!("no price set on-chain yet (first update)");
                return None;
            }
            Ok(Err(e)) => {
                warn!("reading on-chain price failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!("reading on-chain price timed out");
                return None;
            }
        };

        info!("on-chain price: ${:.2}", stored.price);
        info!("last update: {}", stored.updated_at.to_rfc3339());
        let d = drift(market, stored.price);
        if let Some(d) = d {
            info!(
                "difference: ${:.2} ({:.2}%)",
                (market - stored.price).abs(),
                d * 100.0
            );
        }
        d
    }

    /// Run cycles every `period`, first one immediately, until `shutdown`
    /// resolves. A cycle still running at shutdown is abandoned.
    pub async fn run(mut self, period: Duration, shutdown: impl Future<Output = ()>) -> ReconciliationStats {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut busy_until: Option<Instant> = None;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                scheduled = ticker.tick() => {
                    // came due while the last cycle ran, already counted
                    if busy_until.is_some_and(|end| scheduled < end) {
                        continue;
                    }

                    tokio::select! {
                        _ = &mut shutdown => {
                            warn!("shutting down with a cycle in flight");
                            break;
                        }
                        _ = self.run_cycle() => {}
                    }

                    let end = Instant::now();
                    let missed = missed_ticks(scheduled, end, period);
                    if missed > 0 {
                        warn!("cycle overran {} tick(s)", missed);
                        self.stats.skipped_ticks += missed;
                    }
                    busy_until = Some(end);
                    info!("next update in {}s", period.as_secs());
                }
            }
        }
        self.stats
    }
}

/// Ticks scheduled strictly between a cycle's start and end.
fn missed_ticks(start: Instant, end: Instant, period: Duration) -> u64 {
    let elapsed = end.saturating_duration_since(start).as_nanos();
    let period = period.as_nanos().max(1);
    let due = (elapsed + period - 1) / period;
    due.saturating_sub(1) as u64
}
