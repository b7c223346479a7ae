//! Escrow gas comparison runner.
//!
//! Authorizes and captures the same payment against the calldata-optimized
//! and the gas-optimized escrow, then reports what each variant cost.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (escrow-gas.toml in current directory)
//! cargo run -p escrow-gas-cli --release
//!
//! # Custom config, fresh salts, partial capture, JSON report on stdout
//! escrow-gas --config base.toml --random-salts --capture-value 5000 --json
//!
//! # Configure logging level
//! RUST_LOG=escrow_gas=debug escrow-gas
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `escrow-gas.toml`)
//! - `RPC_URL` - Override the RPC endpoint
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::path::PathBuf;
use std::time::Duration;

use alloy_network::{AnyNetwork, EthereumWallet};
use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use escrow_gas::provider::AlloyTransport;
use escrow_gas::sink::TracingSink;
use escrow_gas::{Orchestrator, UnixTimestamp};
use tracing_subscriber::EnvFilter;

use escrow_gas_cli::config::{DEFAULT_CONFIG_PATH, ExperimentConfig};
use escrow_gas_cli::error::CliError;
use escrow_gas_cli::plan::{RunOptions, build_plan, signing_domain};

/// Compare escrow authorize/capture fees across payment encodings.
#[derive(Debug, Parser)]
#[command(name = "escrow-gas", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the fee report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Use fresh random salts instead of the configured ones.
    #[arg(long)]
    random_salts: bool,

    /// Amount to capture, in the token's smallest unit (default: full value).
    #[arg(long)]
    capture_value: Option<u64>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        if let CliError::Run(run_error) = &e {
            tracing::error!(
                kind = ?run_error.kind(),
                variant = ?run_error.variant(),
                phase = ?run_error.phase(),
                "Run aborted; earlier operations may already be on-chain"
            );
        }
        tracing::error!("escrow-gas failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let config = ExperimentConfig::load_from(&args.config)?;

    let key = config.signer_private_key.trim();
    if key.is_empty() || key.starts_with('$') {
        return Err(CliError::InvalidKey(
            "signer_private_key is empty or references an unset variable".to_owned(),
        ));
    }
    let signer: PrivateKeySigner = key
        .parse()
        .map_err(|e| CliError::InvalidKey(format!("{e}")))?;

    let options = RunOptions {
        random_salts: args.random_salts,
        capture_value: args.capture_value,
    };
    let plan = build_plan(&config, signer.address(), UnixTimestamp::now(), options)?;
    let domain = signing_domain(&config, plan.descriptor().token());
    tracing::info!(
        rpc = %config.rpc_url,
        chain_id = config.chain_id,
        signer = %signer.address(),
        token = %domain.verifying_contract,
        value = %plan.descriptor().value(),
        capture = %plan.capture_value(),
        "Loaded configuration"
    );

    let provider = ProviderBuilder::new()
        .network::<AnyNetwork>()
        .wallet(EthereumWallet::from(signer.clone()))
        .connect_http(config.rpc_url.clone());
    let mut transport = AlloyTransport::new(provider).with_confirmations(config.confirmations);
    if let Some(secs) = config.receipt_timeout_secs {
        transport = transport.with_receipt_timeout(Duration::from_secs(secs));
    }

    let orchestrator = Orchestrator::new(signer, transport, domain, TracingSink);
    let report = orchestrator.run(&plan).await?;

    if args.json {
        print_json(&serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_json(json: &str) {
    println!("{json}");
}
