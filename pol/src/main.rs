use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use pol::commands::status::TagTarget;
use pol::{commands, config, telemetry};

#[derive(Parser)]
#[command(name = "pol")]
#[command(about = "Proof-of-Loyalty subsidy engine", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.pol/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to a JSON chain file (default: ~/.pol/chain.json)
    #[arg(long, global = true)]
    chain: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild loyalty state from the chain and list every tag
    Scan {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show loyalty status for a payout address or miner tag
    #[command(group(ArgGroup::new("target").required(true).args(["address", "tag"])))]
    Status {
        /// Payout address (worker suffix after '.' is ignored)
        #[arg(long)]
        address: Option<String>,

        /// Miner tag in hex (8/16/24 hex chars)
        #[arg(long)]
        tag: Option<String>,

        /// Height to evaluate the subsidy at (default: tip)
        #[arg(long)]
        height: Option<u64>,
    },

    /// Show the subsidy a miner tag may claim
    Allowed {
        /// Miner tag in hex (8/16/24 hex chars)
        #[arg(long)]
        tag: String,

        /// Height to evaluate (default: tip + 1)
        #[arg(long)]
        height: Option<u64>,
    },

    /// Print the miner tag of every block in the chain
    Extract,

    /// Run a loyalty query (getpolallowedtag, getpoladdressstatus, getpolconfig)
    Query {
        /// Method name
        method: String,

        /// Positional parameters
        params: Vec<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file first
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose)?;

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    let chain_path = cli
        .chain
        .map(PathBuf::from)
        .unwrap_or_else(config::default_chain_path);

    match cli.command {
        Commands::Scan { json } => commands::scan::run(&config_path, &chain_path, json),
        Commands::Status {
            address,
            tag,
            height,
        } => {
            let target = match (address, tag) {
                (Some(address), _) => TagTarget::Address(address),
                (None, Some(tag)) => TagTarget::Tag(tag),
                (None, None) => anyhow::bail!("Either --address or --tag is required"),
            };
            commands::status::run(&config_path, &chain_path, target, height)
        }
        Commands::Allowed { tag, height } => {
            commands::allowed::run(&config_path, &chain_path, &tag, height)
        }
        Commands::Extract => commands::extract::run(&chain_path),
        Commands::Query { method, params } => {
            commands::query::run(&config_path, &chain_path, &method, &params)
        }
        Commands::Config { init } => commands::config::run(&config_path, init),
    }
}
