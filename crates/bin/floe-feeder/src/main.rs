use anyhow::{bail, Context, Result};
use clap::Parser;
use floe_chain::{
    parse_address, parse_feed_id, AdapterClient, Connection, DEFAULT_ADAPTER_ADDRESS,
    DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_FEED_ID, DEFAULT_RPC_URL,
};
use std::time::Duration;
use tracing::{info, warn};

mod error;
mod feed;
mod reconcile;
mod stats;

use crate::feed::{YahooFeed, DEFAULT_FEED_URL};
use crate::reconcile::{PushPolicy, Reconciler, Timeouts};

#[derive(Parser, Debug)]
#[command(name = "floe-feeder")]
#[command(about = "keeps the on-chain NVDA price adapter in line with the market", long_about = None)]
struct Args {
    /// EVM RPC endpoint
    #[arg(long, env = "FLOE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Hex private key of the account that feeds the adapter
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Manual price adapter contract
    #[arg(long, env = "FLOE_ADAPTER_ADDRESS", default_value = DEFAULT_ADAPTER_ADDRESS)]
    adapter: String,

    /// Feed id (bytes32) the price is stored under
    #[arg(long, env = "FLOE_FEED_ID", default_value = DEFAULT_FEED_ID)]
    feed_id: String,

    /// Seconds between update cycles
    #[arg(long, env = "FLOE_UPDATE_INTERVAL_SECS", default_value_t = 300)]
    interval_secs: u64,

    /// Market data URL (Yahoo chart API)
    #[arg(long, env = "FLOE_FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Timeout for the market data request
    #[arg(long, default_value_t = 30)]
    feed_timeout_secs: u64,

    /// Timeout for reading the stored price
    #[arg(long, default_value_t = 30)]
    read_timeout_secs: u64,

    /// Timeout for an update to confirm
    #[arg(long, default_value_t = DEFAULT_CONFIRM_TIMEOUT_SECS)]
    confirm_timeout_secs: u64,

    /// Only push when the price moved at least this many basis points (0 = always push)
    #[arg(long, env = "FLOE_MIN_DRIFT_BPS", default_value_t = 0)]
    min_drift_bps: u32,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            bail!("--interval-secs must be positive");
        }
        for (flag, secs) in [
            ("--feed-timeout-secs", self.feed_timeout_secs),
            ("--read-timeout-secs", self.read_timeout_secs),
            ("--confirm-timeout-secs", self.confirm_timeout_secs),
        ] {
            if secs == 0 {
                bail!("{} must be positive", flag);
            }
        }
        if self.private_key.trim().is_empty() {
            bail!("PRIVATE_KEY is empty");
        }
        Ok(())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            feed: Duration::from_secs(self.feed_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
            // send is one rpc round trip before the confirmation wait starts
            push: Duration::from_secs(self.confirm_timeout_secs + self.read_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floe_feeder=info,floe_chain=info".into()),
        )
        .init();

    let args = Args::parse();
    args.validate()?;

    let adapter_address = parse_address(&args.adapter, "adapter")?;
    let feed_id = parse_feed_id(&args.feed_id)?;

    info!("starting floe-feeder");
    info!("RPC: {}", args.rpc_url);
    info!("price adapter: {}", adapter_address);
    info!("feed id: {}", feed_id);
    info!(
        "update interval: {}s ({} minutes)",
        args.interval_secs,
        args.interval_secs / 60
    );
    if args.min_drift_bps > 0 {
        info!("push threshold: {} bps", args.min_drift_bps);
    }

    let connection = Connection::open(&args.rpc_url, Some(&args.private_key))
        .await
        .context("connecting to rpc")?;
    let signer = connection.require_signer()?;
    info!("signer: {}", signer);

    match connection.native_balance(signer).await {
        Ok(balance) => {
            info!("signer balance: {} wei", balance);
            if balance.is_zero() {
                warn!("signer has zero balance, updates will fail until it is funded");
            }
        }
        Err(e) => warn!("could not check signer balance: {}", e),
    }

    let feed = YahooFeed::new(&args.feed_url, Duration::from_secs(args.feed_timeout_secs))?;
    info!("market feed: {}", feed.url());
    let adapter = AdapterClient::new(
        connection.provider.clone(),
        adapter_address,
        feed_id,
        Duration::from_secs(args.confirm_timeout_secs),
    );
    let reconciler = Reconciler::new(
        feed,
        adapter,
        PushPolicy { min_drift_bps: args.min_drift_bps },
        args.timeouts(),
    );

    info!("first update runs now, then every {}s", args.interval_secs);
    let stats = reconciler
        .run(Duration::from_secs(args.interval_secs), shutdown_signal())
        .await;

    info!("shutting down floe-feeder");
    stats.log();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["floe-feeder", "--private-key", "0x01"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.interval_secs, 300);
        assert_eq!(args.min_drift_bps, 0);
        assert!(args.validate().is_ok());
        assert!(parse_address(&args.adapter, "adapter").is_ok());
        assert!(parse_feed_id(&args.feed_id).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(parse(&["--interval-secs", "0"]).validate().is_err());
        assert!(parse(&["--confirm-timeout-secs", "0"]).validate().is_err());
    }

    #[test]
    fn test_push_timeout_covers_confirmation() {
        let t = parse(&["--confirm-timeout-secs", "60", "--read-timeout-secs", "5"]).timeouts();
        assert_eq!(t.push, Duration::from_secs(65));
        assert_eq!(t.read, Duration::from_secs(5));
    }
}
