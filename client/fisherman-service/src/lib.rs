pub mod handler;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use fisherman_actors::actor::{ActorHandle, ActorSpawner, TaskSpawner};
use fisherman_chain_rpc::ChainClient;
use fisherman_common::crypto::EcdsaKeypair;
use fisherman_forest_manager::ForestProofProvider;
use fisherman_indexer_db::DbPool;
use tokio_util::sync::CancellationToken;

pub use self::handler::{FishermanSchedulerError, FishermanService};

/// Recognized configuration keys from §6 that govern the Fisherman scheduler's pacing.
#[derive(Debug, Clone, Copy)]
pub struct FishermanConfig {
    /// Wait between batch cycles after one that attempted work (`batch_interval`, default 60s).
    pub batch_interval: Duration,
    /// Wait between batch cycles once `CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD` consecutive
    /// cycles found nothing (`idle_poll_interval`).
    pub idle_poll_interval: Duration,
    /// Maximum number of intents read per class per cycle (`batch_deletion_limit`).
    pub batch_deletion_limit: i64,
}

/// Spawns the Fisherman scheduler. `shutdown` lets the caller request a graceful stop: the
/// returned join handle resolves once any in-flight batch cycle has committed and the event
/// loop has exited.
pub async fn spawn_fisherman_scheduler(
    task_spawner: &TaskSpawner,
    chain: Arc<dyn ChainClient>,
    db_pool: DbPool,
    forest: Arc<dyn ForestProofProvider>,
    signing_key: Arc<EcdsaKeypair>,
    config: FishermanConfig,
    shutdown: CancellationToken,
) -> (ActorHandle<FishermanService>, tokio::task::JoinHandle<()>) {
    let task_spawner = task_spawner.with_name("fisherman-scheduler").with_group("core");

    let service = FishermanService::new(
        chain,
        db_pool,
        forest,
        signing_key,
        config.batch_interval,
        config.idle_poll_interval,
        config.batch_deletion_limit,
        shutdown,
    );

    task_spawner.spawn_actor(service)
}
