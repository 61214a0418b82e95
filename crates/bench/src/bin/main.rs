//! tps-bench CLI
//!
//! Measures sustained operations per second against a shared-object ledger.
//!
//! # Example
//!
//! ```bash
//! # Full run against the network in config.json, signing via a local service
//! tps-bench --config config.json --signer-url http://127.0.0.1:7070 --address 0x... run
//!
//! # Same run against the in-memory ledger
//! tps-bench --config config.json --dry-run --report-json report.json
//!
//! # Create 30 new targets
//! tps-bench --config config.json --signer-url ... --address 0x... create-targets --batch-size 30
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tps_bench::{
    create_targets, ActiveConfig, ConfigError, FileConfig, Harness, HarnessError, RunContext,
    TargetError, DEFAULT_CREATE_BATCH_SIZE,
};
use tps_bench_client::{
    LedgerError, RemoteSigner, RpcClient, SignerError, SimConfig, SimLedger, SimSigner,
};
use tps_bench_types::{ParseError, SuiAddress, MIST_PER_SUI};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Account used by dry runs when none is given.
const DRY_RUN_ADDRESS: &str = "0xd1";

/// Funds minted for the dry-run account, in MIST.
const DRY_RUN_FUNDING: u64 = 100 * MIST_PER_SUI;

/// Per-call latency of the dry-run ledger.
const DRY_RUN_LATENCY: Duration = Duration::from_millis(20);

/// tps-bench
///
/// Forges one fee coin per channel, pairs each with a shared target, and
/// submits composite transactions from all channels concurrently.
#[derive(Parser, Debug)]
#[command(name = "tps-bench")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = "config.json")]
    config: PathBuf,

    /// Base URL of the signing service
    #[arg(long, env = "TPS_SIGNER_URL")]
    signer_url: Option<String>,

    /// Address that signs and pays
    #[arg(long, env = "TPS_ADDRESS")]
    address: Option<String>,

    /// Run against an in-memory ledger instead of the network
    #[arg(long)]
    dry_run: bool,

    /// Write the run report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Override the number of channels
    #[arg(short = 'n', long)]
    target_count: Option<i64>,

    /// Override the submissions per channel
    #[arg(short = 'i', long)]
    iterations: Option<i64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run the throughput measurement (default)
    Run,
    /// Create new shared targets
    CreateTargets {
        /// Creation calls in the transaction
        #[arg(long, default_value_t = DEFAULT_CREATE_BATCH_SIZE)]
        batch_size: usize,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error(transparent)]
    Targets(#[from] TargetError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("{0} is required unless --dry-run is set")]
    MissingArgument(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] ParseError),

    #[error("Failed to write report to {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tps_bench=info,tps_bench_client=info")),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "tps-bench failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let mut active = FileConfig::load(&args.config)?.active()?;
    if let Some(count) = args.target_count {
        active.target_count = count;
    }
    if let Some(iterations) = args.iterations {
        active.iters = iterations;
    }

    let ctx = if args.dry_run {
        dry_run_context(&args, &active)?
    } else {
        network_context(&args, &active)?
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = active.to_harness_config()?;
            info!(
                network = %active.network,
                dry_run = args.dry_run,
                channels = config.target_count(),
                iterations = config.channel.iterations,
                "Starting run"
            );

            let report = Harness::new(ctx, config)?.run().await?;
            report.print_summary();

            if let Some(path) = &args.report_json {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(path, json).map_err(|source| CliError::Report {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), "Report written");
            }
        }
        Command::CreateTargets { batch_size } => {
            let created = create_targets(
                &ctx,
                &active.create_call()?,
                active.global_state()?,
                batch_size,
            )
            .await?;

            println!("\n=== Created Targets ({}) ===", created.len());
            for id in created {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn network_context(args: &Args, active: &ActiveConfig) -> Result<RunContext, CliError> {
    let signer_url = args
        .signer_url
        .clone()
        .ok_or(CliError::MissingArgument("--signer-url"))?;
    let address: SuiAddress = args
        .address
        .as_deref()
        .ok_or(CliError::MissingArgument("--address"))?
        .parse()?;

    let rpc_url = active.rpc_url()?;
    info!(%rpc_url, %address, "Connecting");

    let ledger = RpcClient::new(rpc_url)?;
    let signer = RemoteSigner::new(signer_url, address)?;
    Ok(RunContext::new(Arc::new(ledger), Arc::new(signer)))
}

/// In-memory ledger with a funded account and the configured targets.
fn dry_run_context(args: &Args, active: &ActiveConfig) -> Result<RunContext, CliError> {
    let address: SuiAddress = args.address.as_deref().unwrap_or(DRY_RUN_ADDRESS).parse()?;
    let package = active.package_id()?;

    let ledger = SimLedger::new(SimConfig::default().with_latency(DRY_RUN_LATENCY));
    ledger.mint_coin(address, DRY_RUN_FUNDING);

    let counter_type = format!("{package}::{}::Counter", active.module);
    for id in active.target_pool()? {
        ledger.register_shared_object(id, counter_type.clone());
    }
    if let Ok(global_state) = active.global_state() {
        let state_type = format!("{package}::{}::GlobalState", active.module);
        ledger.register_shared_object(global_state, state_type);
    }

    info!(%address, funding = DRY_RUN_FUNDING, "Dry run against in-memory ledger");
    Ok(RunContext::new(Arc::new(ledger), Arc::new(SimSigner::new(address))))
}
