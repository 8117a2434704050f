//! valchain daemon: entry point for running a valchain node.
//!
//! Peers are reached through a line-delimited JSON transport on
//! stdin/stdout; logs go to stderr.

mod stdio;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use valchain_consensus::{genesis_block, genesis_id};
use valchain_node::{init_logging, AcceptAll, LogFormat, Node, NodeConfig, NodeMode};
use valchain_store_lmdb::{LmdbChainStore, LmdbEnvironment};
use valchain_types::{ConsensusParams, SystemClock};

use crate::stdio::StdioTransport;

#[derive(Parser)]
#[command(name = "valchain-daemon", about = "valchain proof-of-work assertion node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a node, exchanging messages over stdin/stdout.
    Run(RunArgs),
    /// Print the genesis block and its id.
    Genesis {
        /// Use the development proof-of-work target.
        #[arg(long)]
        dev: bool,
    },
    /// Print the default configuration as TOML.
    Config,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "VALCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for chain storage.
    #[arg(long, env = "VALCHAIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Node mode: "full" or "light".
    #[arg(long, env = "VALCHAIN_MODE")]
    mode: Option<String>,

    /// Disable the proof-of-work search.
    #[arg(long, env = "VALCHAIN_NO_MINING")]
    no_mining: bool,

    /// Free text recorded in mined blocks.
    #[arg(long, env = "VALCHAIN_MINER_TAG")]
    miner_tag: Option<String>,

    /// Worker threads for mining; 0 uses every core.
    #[arg(long, env = "VALCHAIN_MINING_THREADS")]
    mining_threads: Option<usize>,

    /// Use the development proof-of-work target.
    #[arg(long, env = "VALCHAIN_DEV")]
    dev: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VALCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VALCHAIN_LOG_FORMAT")]
    log_format: Option<String>,
}

impl RunArgs {
    /// Layer flags over the config file (or the defaults).
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_string_lossy();
                NodeConfig::from_toml_file(&path)
                    .with_context(|| format!("failed to load config from {path}"))?
            }
            None => NodeConfig::default(),
        };
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(mode) = self.mode {
            config.mode = parse_mode(&mode)?;
        }
        if self.no_mining {
            config.enable_mining = false;
        }
        if self.miner_tag.is_some() {
            config.miner_tag = self.miner_tag;
        }
        if let Some(threads) = self.mining_threads {
            config.mining_threads = threads;
        }
        if self.dev {
            config.consensus = ConsensusParams::dev();
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

fn parse_mode(s: &str) -> anyhow::Result<NodeMode> {
    match s.to_ascii_lowercase().as_str() {
        "full" => Ok(NodeMode::Full),
        "light" => Ok(NodeMode::Light),
        other => anyhow::bail!("unknown node mode {other:?}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args.into_config()?).await,
        Command::Genesis { dev } => {
            let params = if dev {
                ConsensusParams::dev()
            } else {
                ConsensusParams::mainnet()
            };
            println!("{}", genesis_id(&params)?);
            println!("{}", serde_json::to_string_pretty(&genesis_block(&params))?);
            Ok(())
        }
        Command::Config => {
            print!("{}", NodeConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format.parse::<LogFormat>()?, &config.log_level)?;

    let store = if config.is_full() {
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)
            .with_context(|| format!("failed to open {}", config.data_dir.display()))?;
        tracing::info!(path = %env.path().display(), "opened chain store");
        Some(Arc::new(env.chain_store()))
    } else {
        None
    };

    let (transport, outbound) = StdioTransport::new();
    let (node, handle) = Node::<LmdbChainStore>::new(
        &config,
        store,
        Arc::new(transport),
        Arc::new(SystemClock),
        Arc::new(AcceptAll),
    )?;

    tracing::info!(
        mode = ?config.mode,
        mining = config.enable_mining,
        common_prefix = config.consensus.common_prefix,
        "starting valchain node"
    );

    let writer = tokio::spawn(stdio::write_lines(tokio::io::stdout(), outbound));
    let reader = tokio::spawn(stdio::read_lines(
        tokio::io::BufReader::new(tokio::io::stdin()),
        handle.clone(),
        handle.shutdown_controller().subscribe(),
    ));
    let signals = {
        let shutdown = handle.shutdown_controller().clone();
        tokio::spawn(async move {
            shutdown.wait_for_signal().await;
        })
    };

    let result = node.run().await;
    signals.abort();
    reader.abort();
    drop(handle);
    if let Err(e) = writer.await {
        tracing::warn!(error = %e, "stdout writer task failed");
    }
    result?;

    tracing::info!("valchain daemon exited cleanly");
    Ok(())
}
