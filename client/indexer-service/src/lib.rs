pub mod handler;

use std::sync::Arc;

use fisherman_actors::actor::{ActorHandle, ActorSpawner, TaskSpawner};
use fisherman_chain_rpc::ChainClient;
use fisherman_indexer_db::DbPool;
use tokio_util::sync::CancellationToken;

pub use self::handler::{IndexerError, IndexerService};

/// Which subset of the event taxonomy the Indexer applies (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerMode {
    /// Every handler in the event taxonomy table runs.
    Full,
    /// Only the subset relevant to deletion bookkeeping runs; same event enum, filtered.
    Fishing,
}

/// Recognized configuration keys from §6 that govern the Indexer's pacing.
#[derive(Debug, Clone, Copy)]
pub struct IndexerConfig {
    pub mode: IndexerMode,
    /// Gap, in blocks, past which the Indexer switches from processing blocks individually to
    /// paginated sync mode.
    pub sync_mode_min_blocks_behind: u64,
    /// Blocks fetched per page while in sync mode.
    pub incomplete_sync_page_size: u64,
    /// Total blocks processed per finality notification while in sync mode, before yielding to
    /// let the next notification re-evaluate the gap.
    pub incomplete_sync_max: u64,
}

/// Spawns the Indexer. `shutdown` lets the caller request a graceful stop: the returned join
/// handle resolves once the event loop has finished its in-flight block and exited.
pub async fn spawn_indexer_service(
    task_spawner: &TaskSpawner,
    chain: Arc<dyn ChainClient>,
    db_pool: DbPool,
    config: IndexerConfig,
    shutdown: CancellationToken,
) -> (ActorHandle<IndexerService>, tokio::task::JoinHandle<()>) {
    let task_spawner = task_spawner.with_name("indexer-service").with_group("core");

    let indexer_service = IndexerService::new(chain, db_pool, config, shutdown);

    task_spawner.spawn_actor(indexer_service)
}
