//! floe CLI - operate a position on the NVDA / mUSDC lending pool
//!
//! Commands:
//! - status: pool and position dashboard
//! - plan: collateral needed for a borrow
//! - deposit-collateral: post exactly the collateral a borrow plan is missing
//! - withdraw-collateral, supply, withdraw, borrow, repay
//! - approve: grant the pool a spending cap
//!
//! Every write is checked against the same gating the dashboard shows and is
//! refused with the specific reason when blocked.

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use floe_chain::{
    parse_address, Address, Connection, LedgerAddresses, LedgerClient, TxOutcome,
    DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_RPC_URL,
};
use floe_core::allowance::ALLOWANCE_REFRESH_INTERVAL;
use floe_core::format::{format_money, format_token};
use floe_core::gate::{self, Gate};
use floe_core::plan::{DEFAULT_DURATION_DAYS, DURATION_PRESETS_DAYS, SECONDS_PER_DAY};
use floe_core::{
    parse_units, Asset, BorrowRequest, MarketParams, PositionView, Quantity, UNLIMITED_ALLOWANCE,
};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "floe")]
#[command(about = "floe lending pool CLI", long_about = None)]
struct Cli {
    /// EVM RPC endpoint
    #[arg(long, env = "FLOE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Hex private key, required for writes
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Lending pool contract
    #[arg(long, env = "FLOE_POOL_ADDRESS")]
    pool: String,

    /// Collateral token (NVDA)
    #[arg(long, env = "FLOE_COLLATERAL_ADDRESS")]
    collateral_token: String,

    /// Stable token (mUSDC)
    #[arg(long, env = "FLOE_STABLE_ADDRESS")]
    stable_token: String,

    /// Collateral price oracle
    #[arg(long, env = "FLOE_ORACLE_ADDRESS")]
    oracle: String,

    /// Account to inspect (defaults to the signer)
    #[arg(long)]
    account: Option<String>,

    /// Seconds to wait for a write to confirm
    #[arg(long, default_value_t = DEFAULT_CONFIRM_TIMEOUT_SECS)]
    confirm_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pool and position dashboard
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Refresh until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Collateral needed to borrow an amount
    Plan {
        /// mUSDC to borrow
        #[arg(long)]
        borrow: String,
        /// Loan duration in days
        #[arg(long, default_value_t = DEFAULT_DURATION_DAYS, value_parser = parse_days)]
        days: u64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Post the collateral a borrow plan is still missing
    DepositCollateral {
        /// mUSDC you plan to borrow
        #[arg(long)]
        borrow: String,
        #[arg(long, default_value_t = DEFAULT_DURATION_DAYS, value_parser = parse_days)]
        days: u64,
    },

    /// Withdraw NVDA collateral
    WithdrawCollateral {
        /// NVDA amount
        amount: String,
    },

    /// Supply mUSDC to the pool
    Supply {
        /// mUSDC amount
        amount: String,
    },

    /// Withdraw supplied mUSDC
    Withdraw {
        /// mUSDC amount
        amount: String,
    },

    /// Borrow mUSDC against posted collateral
    Borrow {
        /// mUSDC amount
        amount: String,
        #[arg(long, default_value_t = DEFAULT_DURATION_DAYS, value_parser = parse_days)]
        days: u64,
    },

    /// Repay mUSDC debt
    Repay {
        /// mUSDC amount
        amount: String,
    },

    /// Grant the pool a spending cap
    Approve {
        asset: AssetArg,
        /// Cap in token units (default: unlimited)
        #[arg(long)]
        amount: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AssetArg {
    Collateral,
    Stable,
}

impl From<AssetArg> for Asset {
    fn from(arg: AssetArg) -> Self {
        match arg {
            AssetArg::Collateral => Asset::Collateral,
            AssetArg::Stable => Asset::Stable,
        }
    }
}

fn parse_days(s: &str) -> std::result::Result<u64, String> {
    let days: u64 = s.parse().map_err(|e| format!("{}", e))?;
    if DURATION_PRESETS_DAYS.contains(&days) {
        Ok(days)
    } else {
        Err(format!("duration must be one of {:?} days", DURATION_PRESETS_DAYS))
    }
}

/// Connected ledger plus the account commands act for
struct Session {
    connection: Connection,
    ledger: LedgerClient,
    account: Address,
    params: MarketParams,
}

impl Session {
    async fn open(cli: &Cli) -> Result<Self> {
        let addresses = LedgerAddresses {
            pool: parse_address(&cli.pool, "pool")?,
            collateral_token: parse_address(&cli.collateral_token, "collateral token")?,
            stable_token: parse_address(&cli.stable_token, "stable token")?,
            oracle: parse_address(&cli.oracle, "oracle")?,
        };
        let connection = Connection::open(&cli.rpc_url, cli.private_key.as_deref()).await?;
        let account = match (&cli.account, connection.signer) {
            (Some(account), _) => parse_address(account, "account")?,
            (None, Some(signer)) => signer,
            (None, None) => bail!("provide --account or a private key"),
        };
        let ledger = LedgerClient::new(
            connection.provider.clone(),
            addresses,
            Duration::from_secs(cli.confirm_timeout_secs),
        );
        Ok(Self { connection, ledger, account, params: MarketParams::default() })
    }

    /// Fresh reads merged with `request`
    async fn view(&self, request: &BorrowRequest) -> Result<PositionView> {
        let reads = self.ledger.read_all(self.account).await;
        Ok(PositionView::aggregate(reads, request, &self.params)?)
    }

    /// Writes always act for the signer.
    fn require_writer(&self) -> Result<()> {
        let signer = self.connection.require_signer()?;
        if signer != self.account {
            bail!("--account {} is not the signer {}", self.account, signer);
        }
        Ok(())
    }

    fn decimals(&self, asset: Asset) -> u8 {
        match asset {
            Asset::Collateral => self.params.collateral_decimals,
            Asset::Stable => self.params.stable_decimals,
        }
    }

    fn amount(&self, asset: Asset, text: &str) -> Result<Quantity> {
        Ok(parse_units(text, self.decimals(asset))?)
    }

    fn request(&self, borrow: &str, days: u64) -> Result<BorrowRequest> {
        Ok(BorrowRequest::new(self.amount(Asset::Stable, borrow)?, days))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floe=info,floe_chain=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let session = Session::open(&cli).await?;

    match &cli.command {
        Commands::Status { json, watch } => cmd_status(&session, *json, *watch).await?,
        Commands::Plan { borrow, days, json } => {
            cmd_plan(&session, &session.request(borrow, *days)?, *json).await?
        }
        Commands::DepositCollateral { borrow, days } => {
            cmd_deposit_collateral(&session, &session.request(borrow, *days)?).await?
        }
        Commands::WithdrawCollateral { amount } => {
            cmd_withdraw_collateral(&session, &session.amount(Asset::Collateral, amount)?).await?
        }
        Commands::Supply { amount } => {
            cmd_supply(&session, &session.amount(Asset::Stable, amount)?).await?
        }
        Commands::Withdraw { amount } => {
            cmd_withdraw(&session, &session.amount(Asset::Stable, amount)?).await?
        }
        Commands::Borrow { amount, days } => {
            cmd_borrow(&session, &session.request(amount, *days)?).await?
        }
        Commands::Repay { amount } => {
            cmd_repay(&session, &session.amount(Asset::Stable, amount)?).await?
        }
        Commands::Approve { asset, amount } => {
            cmd_approve(&session, (*asset).into(), amount.as_deref()).await?
        }
    }

    Ok(())
}

fn ensure_ready(gate: Gate) -> Result<()> {
    match gate {
        Gate::Ready => Ok(()),
        Gate::Blocked(blocker) => Err(anyhow!("{}", blocker)),
    }
}

fn print_tx(what: &str, tx: &TxOutcome) {
    println!("{} confirmed", what);
    println!("  tx: {}", tx.hash);
    if let Some(block) = tx.block {
        println!("  block: {}", block);
    }
    println!("  gas used: {}", tx.gas_used);
}

async fn cmd_status(session: &Session, json: bool, watch: bool) -> Result<()> {
    let request = BorrowRequest::empty(&session.params);
    let mut ticker = tokio::time::interval(ALLOWANCE_REFRESH_INTERVAL);
    loop {
        ticker.tick().await;
        let view = session.view(&request).await?;
        let allowances = session.ledger.read_allowances(session.account).await;
        let metrics = view.metrics();

        if json {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        } else {
            println!("account: {}", session.account);
            println!("pool");
            println!("  NVDA price:      {}", metrics.spot_price);
            println!("  borrow APR:      {}", metrics.borrow_apr);
            println!("  supply APR:      {}", metrics.supply_apr);
            println!("  utilization:     {}", metrics.utilization);
            println!("  deposits:        {}", metrics.pool_deposits);
            println!("  debt:            {}", metrics.pool_debt);
            println!("  liquidity:       {}", metrics.pool_liquidity);
            println!("borrower");
            println!("  collateral:      {}", metrics.collateral_amount);
            println!("  value:           {}", metrics.collateral_value);
            println!("  max borrow:      {}", metrics.max_borrow);
            println!("  repay total:     {}", metrics.repay_total);
            println!("  interest:        {}", metrics.borrower_interest);
            println!("  health factor:   {}", metrics.health_factor);
            println!("lender");
            println!("  balance:         {}", metrics.lender_balance);
            println!("  principal:       {}", metrics.lender_principal);
            println!("  interest:        {}", metrics.lender_interest);
            println!("allowances");
            for asset in [Asset::Collateral, Asset::Stable] {
                println!(
                    "  {:<16} {}",
                    format!("{}:", asset),
                    describe_allowance(allowances.granted(asset), session.decimals(asset))
                );
            }
        }

        if !watch {
            return Ok(());
        }
        println!();
    }
}

fn describe_allowance(granted: Option<floe_core::U256>, decimals: u8) -> String {
    match granted {
        None => "--".to_string(),
        Some(v) if v == UNLIMITED_ALLOWANCE => "unlimited".to_string(),
        Some(v) => format_token(v, decimals, 4),
    }
}

async fn cmd_plan(session: &Session, request: &BorrowRequest, json: bool) -> Result<()> {
    let view = session.view(request).await?;
    let plan = &view.plan;

    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    let collateral = session.params.collateral_decimals;
    println!(
        "borrow {} mUSDC for {} days",
        format_token(plan.desired.amount, plan.desired.decimals, 6),
        plan.duration_secs / SECONDS_PER_DAY
    );
    println!(
        "  required collateral: {} NVDA ({})",
        format_token(plan.required_collateral.amount, collateral, 4),
        format_money(
            plan.required_collateral_value.amount,
            plan.required_collateral_value.decimals,
            2
        )
    );
    println!(
        "  still missing:       {}",
        plan.missing_collateral.map_or_else(
            || "--".to_string(),
            |m| format!("{} NVDA", format_token(m.amount, m.decimals, 4))
        )
    );
    println!("  max borrow:          {}", view.metrics().max_borrow);
    match gate::borrow(&view) {
        Gate::Ready => println!("  ready to borrow"),
        Gate::Blocked(blocker) => println!("  blocked: {}", blocker),
    }
    Ok(())
}

async fn cmd_deposit_collateral(session: &Session, request: &BorrowRequest) -> Result<()> {
    session.require_writer()?;
    let view = session.view(request).await?;
    let allowances = session.ledger.read_allowances(session.account).await;
    ensure_ready(gate::deposit_collateral(&view, &allowances))?;

    let missing = view
        .collateral_shortfall()
        .ok_or_else(|| anyhow!("collateral shortfall unknown"))?;
    info!("depositing {} NVDA", format_token(missing.amount, missing.decimals, 6));
    let tx = session.ledger.deposit_collateral(missing.amount).await?;
    print_tx("deposit collateral", &tx);
    Ok(())
}

async fn cmd_withdraw_collateral(session: &Session, amount: &Quantity) -> Result<()> {
    session.require_writer()?;
    let view = session.view(&BorrowRequest::empty(&session.params)).await?;
    ensure_ready(gate::withdraw_collateral(&view, amount))?;
    let tx = session.ledger.withdraw_collateral(amount.amount).await?;
    print_tx("withdraw collateral", &tx);
    Ok(())
}

async fn cmd_supply(session: &Session, amount: &Quantity) -> Result<()> {
    session.require_writer()?;
    let allowances = session.ledger.read_allowances(session.account).await;
    ensure_ready(gate::deposit_stable(amount, &allowances))?;
    let tx = session.ledger.deposit_stable(amount.amount).await?;
    print_tx("supply", &tx);
    Ok(())
}

async fn cmd_withdraw(session: &Session, amount: &Quantity) -> Result<()> {
    session.require_writer()?;
    ensure_ready(gate::withdraw_stable(amount))?;
    let tx = session.ledger.withdraw_stable(amount.amount).await?;
    print_tx("withdraw", &tx);
    Ok(())
}

async fn cmd_borrow(session: &Session, request: &BorrowRequest) -> Result<()> {
    session.require_writer()?;
    let view = session.view(request).await?;
    ensure_ready(gate::borrow(&view))?;
    let tx = session
        .ledger
        .borrow(view.plan.desired.amount, view.plan.duration_secs)
        .await?;
    print_tx("borrow", &tx);
    Ok(())
}

async fn cmd_repay(session: &Session, amount: &Quantity) -> Result<()> {
    session.require_writer()?;
    let allowances = session.ledger.read_allowances(session.account).await;
    ensure_ready(gate::repay(amount, &allowances))?;
    let tx = session.ledger.repay(amount.amount).await?;
    print_tx("repay", &tx);
    Ok(())
}

async fn cmd_approve(session: &Session, asset: Asset, amount: Option<&str>) -> Result<()> {
    session.require_writer()?;
    let cap = match amount {
        Some(text) => session.amount(asset, text)?.amount,
        None => UNLIMITED_ALLOWANCE,
    };
    let tx = session.ledger.approve(asset, cap).await?;
    print_tx(&format!("approve {}", asset), &tx);

    // allowance reads are the only way to learn the new cap
    let allowances = session.ledger.read_allowances(session.account).await;
    match allowances.granted(asset) {
        Some(granted) => println!(
            "  {} allowance: {}",
            asset,
            describe_allowance(Some(granted), session.decimals(asset))
        ),
        None => warn!("could not read back the {} allowance", asset),
    }
    Ok(())
}
