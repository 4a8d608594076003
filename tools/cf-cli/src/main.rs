//! CF-CLI: Crowdfund Command Line Client
//!
//! Lists campaigns, shows what the connected account may do with each, and
//! drives contribute / finalize / refund / create through the action
//! orchestrator while printing progress.

mod demo;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::debug;

use cf_campaign_client::adapters::abi;
use cf_campaign_client::{
    ActionKey, ActionKind, ActionOutcome, Address, BalanceReader, CampaignClient,
    CampaignClientApi, CampaignClientConfig, CampaignClientError, CampaignId, Clock, JsonRpcConfig,
    JsonRpcLedgerGateway, LedgerGateway, RefreshStrategy, SystemClock,
};
use cf_telemetry::{init_telemetry, TelemetryConfig};

/// CF-CLI: Crowdfund command line client
#[derive(Parser, Debug)]
#[command(name = "cf-cli")]
#[command(about = "Browse, fund and settle crowdfunding campaigns")]
struct Args {
    /// JSON-RPC endpoint URL
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    endpoint: String,

    /// Crowdfunding contract address
    #[arg(short, long)]
    contract: Option<String>,

    /// ERC-20 token to show in `balance`
    #[arg(short, long)]
    token: Option<String>,

    /// Chain id the contract is deployed on
    #[arg(long, default_value_t = cf_campaign_client::SEPOLIA_CHAIN_ID)]
    expected_network: u64,

    /// Refresh after a settled write: full or targeted
    #[arg(long, default_value = "full")]
    strategy: RefreshStrategy,

    /// Run against an in-memory ledger seeded with sample campaigns
    #[arg(long)]
    demo: bool,

    /// Demo only: move the ledger clock forward this many seconds first
    #[arg(long, default_value_t = 0, requires = "demo")]
    advance: u64,

    /// Log level (overrides CF_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the connected account and network
    Status,
    /// List all campaigns
    List,
    /// Show one campaign
    Show {
        /// Campaign index
        id: u64,
    },
    /// Contribute to an active campaign
    Contribute {
        /// Campaign index
        id: u64,
        /// Amount in ETH, e.g. 0.01
        amount: String,
    },
    /// Finalize a campaign whose deadline has passed
    Finalize {
        /// Campaign index
        id: u64,
    },
    /// Claim a refund from a failed campaign
    Refund {
        /// Campaign index
        id: u64,
    },
    /// Create a new campaign
    Create {
        /// Campaign title
        #[arg(long)]
        title: String,
        /// Goal in ETH
        #[arg(long)]
        goal: String,
        /// Duration in minutes
        #[arg(long)]
        minutes: String,
    },
    /// Show native and token balances
    Balance,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &args.log_level {
        telemetry = telemetry.with_level(level.clone());
    }
    let _telemetry = init_telemetry(telemetry)?;

    let config = CampaignClientConfig {
        expected_network_id: args.expected_network,
        refresh_strategy: args.strategy,
        ..CampaignClientConfig::default()
    };

    if args.demo {
        let ledger = Arc::new(demo::seeded_ledger().await?);
        ledger.advance_time(args.advance);
        let clock: Arc<dyn Clock> = ledger.clone();
        let client = CampaignClient::new(config, ledger, clock)?;
        return run(&client, args.command).await;
    }

    let Some(contract) = args.contract.as_deref() else {
        bail!("--contract is required unless --demo is set");
    };
    let rpc = JsonRpcConfig {
        endpoint: args.endpoint.clone(),
        contract_address: parse_address(contract).context("invalid --contract")?,
        token_address: args
            .token
            .as_deref()
            .map(parse_address)
            .transpose()
            .context("invalid --token")?,
        ..JsonRpcConfig::default()
    };
    let gateway = Arc::new(JsonRpcLedgerGateway::new(rpc)?);
    let client = CampaignClient::new(config, gateway, Arc::new(SystemClock))?;
    run(&client, args.command).await
}

async fn run<G>(client: &CampaignClient<G>, command: Command) -> anyhow::Result<()>
where
    G: LedgerGateway + BalanceReader + ?Sized + 'static,
{
    let info = client.connect().await?;
    if !info.on_expected_network {
        eprintln!(
            "Warning: connected to network {} but the contract lives on {}",
            info.network_id, info.expected_network_id
        );
    }

    match command {
        Command::Status => {
            println!("{}", render::connection(&info));
            return Ok(());
        }
        Command::Balance => {
            let balances = client.balances().await?;
            println!(
                "{}",
                render::balances(&balances, &client.config().native_symbol)
            );
            return Ok(());
        }
        _ => {}
    }

    client.refresh().await?;
    let symbol = client.config().native_symbol.clone();

    match command {
        Command::List => {
            let views = client.views();
            if views.is_empty() {
                println!("No campaigns yet.");
            }
            for view in &views {
                println!("{}", render::campaign_line(view, &symbol));
            }
        }
        Command::Show { id } => {
            let view = client
                .view(CampaignId(id))
                .with_context(|| format!("campaign {} does not exist", id))?;
            println!("{}", render::campaign_detail(&view, &symbol));
        }
        Command::Contribute { id, amount } => {
            let id = CampaignId(id);
            let key = ActionKey::campaign(id, ActionKind::Contribute);
            drive(client, key, client.contribute(id, &amount)).await?;
        }
        Command::Finalize { id } => {
            let id = CampaignId(id);
            let key = ActionKey::campaign(id, ActionKind::Finalize);
            drive(client, key, client.finalize(id)).await?;
        }
        Command::Refund { id } => {
            let id = CampaignId(id);
            let key = ActionKey::campaign(id, ActionKind::ClaimRefund);
            drive(client, key, client.claim_refund(id)).await?;
        }
        Command::Create {
            title,
            goal,
            minutes,
        } => {
            let key = ActionKey::creation();
            drive(client, key, client.create_campaign(&title, &goal, &minutes)).await?;
        }
        Command::Status | Command::Balance => {}
    }
    Ok(())
}

/// Run one action, echoing its progress events, then print the result.
async fn drive<G, F>(client: &CampaignClient<G>, key: ActionKey, action: F) -> anyhow::Result<()>
where
    G: LedgerGateway + BalanceReader + ?Sized + 'static,
    F: std::future::Future<Output = Result<ActionOutcome, CampaignClientError>>,
{
    let mut events = client.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.key == key => {
                    println!("{}", render::progress(&event));
                    if event.phase.is_terminal() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let result = action.await;
    if tokio::time::timeout(Duration::from_millis(200), printer)
        .await
        .is_err()
    {
        debug!(action = %key, "Progress printer did not observe a terminal event");
    }

    let outcome = result?;
    if let Some(err) = &outcome.refresh_error {
        eprintln!("Warning: transaction settled but the refresh failed: {}", err);
    }

    if let Some(id) = key.campaign_id() {
        if let Some(view) = client.view(id) {
            println!("{}", render::campaign_line(&view, &client.config().native_symbol));
        }
    } else if let Some(view) = client.views().last() {
        println!("{}", render::campaign_line(view, &client.config().native_symbol));
    }
    Ok(())
}

/// Parse a 20-byte hex address.
fn parse_address(text: &str) -> anyhow::Result<Address> {
    let bytes = abi::from_hex(text.trim())?;
    if bytes.len() != 20 {
        bail!("expected 20 bytes, got {}", bytes.len());
    }
    Ok(Address::from_slice(&bytes))
}
