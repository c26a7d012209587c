//! CLI parsing and service wiring (§10.3), grounded in the teacher's `backend/bin::main`
//! entrypoint: parse `clap` args, layer them over a file-or-default [`Config`], initialize
//! tracing, then build and run the long-running services until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fisherman_actors::actor::TaskSpawner;
use fisherman_chain_rpc::{ChainClient, MockChainClient};
use fisherman_common::crypto::EcdsaKeypair;
use fisherman_forest_manager::MockForestProofProvider;
use fisherman_indexer_service::{IndexerConfig, IndexerMode};
use fisherman_scheduler::FishermanConfig;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, IndexerModeConfig, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "fisherman")]
#[command(
    about = "Fisherman: converts finalized on-chain deletion anomalies into batched deletion extrinsics",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a TOML config file; the flags below override whatever it sets.
    #[arg(long, env = "FISHERMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `rpc_url`.
    #[arg(long, env = "FISHERMAN_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Overrides `db_url`.
    #[arg(long, env = "FISHERMAN_DB_URL")]
    pub db_url: Option<String>,

    /// Overrides `indexer_mode` (`full` or `fishing`).
    #[arg(long, env = "FISHERMAN_INDEXER_MODE", value_parser = ["full", "fishing"])]
    pub indexer_mode: Option<String>,

    /// Overrides `standalone_indexer`.
    #[arg(long, env = "FISHERMAN_STANDALONE_INDEXER")]
    pub standalone_indexer: bool,

    /// Overrides `log_level`.
    #[arg(long, env = "FISHERMAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Overrides `log_format` (`pretty` or `json`).
    #[arg(long, env = "FISHERMAN_LOG_FORMAT", value_parser = ["pretty", "json"])]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Runs the Indexer and Fisherman scheduler in the same process (default).
    Run,
    /// Runs only the Indexer; a separate process runs the scheduler against the same event
    /// store (§4.1 Standalone mode).
    StandaloneIndexer,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    crate::logging::init(&config.log_level, config.log_format);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the async runtime")?
        .block_on(run_services(cli.command.unwrap_or(Command::Run), config))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path.to_string_lossy().as_ref())
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(rpc_url) = &cli.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(db_url) = &cli.db_url {
        config.db_url = db_url.clone();
    }
    if let Some(mode) = &cli.indexer_mode {
        config.indexer_mode = match mode.as_str() {
            "fishing" => IndexerModeConfig::Fishing,
            _ => IndexerModeConfig::Full,
        };
    }
    if cli.standalone_indexer {
        config.standalone_indexer = true;
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone();
    }
    if let Some(log_format) = &cli.log_format {
        config.log_format = match log_format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
    }

    Ok(config)
}

/// Builds and runs the Indexer (C3), and the Fisherman scheduler (C5) unless this process is
/// standing in as the standalone Indexer (§4.1), until a shutdown signal arrives. On `ctrl_c`,
/// cancels the shared [`CancellationToken`] and awaits both event loops so each finishes its
/// in-flight DB transaction and commits before the process exits (§4 "shutdown").
///
/// C1 (chain RPC) and C4 (forest-proof provider) are external collaborators the specification
/// treats as black boxes; this workspace carries no production RPC crate for either, so their
/// in-memory test doubles stand in here until a concrete chain/forest backend is wired in.
async fn run_services(command: Command, config: Config) -> Result<()> {
    info!(rpc_url = %config.rpc_url, db_url = %config.db_url, ?command, "starting fisherman");

    let db_pool = fisherman_indexer_db::setup_db_pool(&config.db_url)
        .await
        .context("failed to set up the event store")?;

    let chain: Arc<dyn ChainClient> = Arc::new(MockChainClient::new());
    let forest = Arc::new(MockForestProofProvider::new());
    let task_spawner = TaskSpawner::new("fisherman-node");
    let shutdown = CancellationToken::new();

    let indexer_mode = match config.indexer_mode {
        IndexerModeConfig::Full => IndexerMode::Full,
        IndexerModeConfig::Fishing => IndexerMode::Fishing,
    };
    let indexer_config = IndexerConfig {
        mode: indexer_mode,
        sync_mode_min_blocks_behind: config.sync_mode_min_blocks_behind,
        incomplete_sync_page_size: config.incomplete_sync_page_size,
        incomplete_sync_max: config.incomplete_sync_max,
    };

    let (_indexer, indexer_join) = fisherman_indexer_service::spawn_indexer_service(
        &task_spawner,
        chain.clone(),
        db_pool.clone(),
        indexer_config,
        shutdown.clone(),
    )
    .await;

    let run_scheduler = command == Command::Run && !config.standalone_indexer;

    let scheduler_join = if run_scheduler {
        let signing_key = Arc::new(
            EcdsaKeypair::from_bytes(&config.signing_key_bytes()?)
                .map_err(|e| anyhow::anyhow!("invalid signing key: {e}"))?,
        );
        let fisherman_config = FishermanConfig {
            batch_interval: Duration::from_secs(config.batch_interval_secs),
            idle_poll_interval: Duration::from_secs(config.idle_poll_interval_secs),
            batch_deletion_limit: config.batch_deletion_limit,
        };

        let (_scheduler, scheduler_join) = fisherman_scheduler::spawn_fisherman_scheduler(
            &task_spawner,
            chain,
            db_pool,
            forest,
            signing_key,
            fisherman_config,
            shutdown.clone(),
        )
        .await;

        info!("running Indexer and Fisherman scheduler");
        Some(scheduler_join)
    } else {
        info!("running Indexer only (standalone_indexer)");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received, waiting for in-flight work to finish");

    shutdown.cancel();
    indexer_join
        .await
        .context("indexer task panicked during shutdown")?;
    if let Some(scheduler_join) = scheduler_join {
        scheduler_join
            .await
            .context("fisherman scheduler task panicked during shutdown")?;
    }

    info!("all services stopped, exiting");
    Ok(())
}
