//! The Fisherman scheduler (C5): translates pending deletion intents into on-chain deletion
//! extrinsics, batching across files per target, rebuilding inclusion proofs, and surviving
//! restarts and transient RPC/DB failures (§4.2).
//!
//! Grounded in the teacher's `FishermanService` batch scheduler: a size-1 semaphore per intent
//! class bars overlapping cycles *within* that class while leaving `User` and `Incomplete`
//! free to run at the same time (§5 ordering guarantees), a [`BatchDeletionPermitGuard`]
//! notifies the event loop on drop regardless of how the cycle ended, and
//! [`CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD`] consecutive empty cycles widen the wait from
//! `batch_interval` to `idle_poll_interval`. Unlike the teacher, which emits an event for a
//! separate downstream task to pick up, this scheduler runs the batch cycle itself as a spawned
//! task: there is no other subsystem left to subscribe to it once the runtime-API-based mutation
//! replay (`get_file_key_changes_since_block` et al.) is dropped in favor of querying the event
//! store (C2) directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use codec::Encode;
use fisherman_actors::actor::{Actor, ActorEventLoop};
use fisherman_chain_rpc::events::ChainEvent;
use fisherman_chain_rpc::{ChainClient, ChainClientError, DeletionTarget, SignedExtrinsic};
use fisherman_common::crypto::EcdsaKeypair;
use fisherman_common::types::{BspId, BucketId, Hash32, OffchainSignature};
use fisherman_forest_manager::{ForestManagerError, ForestProofProvider};
use fisherman_indexer_db::models::{DeletionIntent, File, IntentKind, IntentStatus, TargetKind};
use fisherman_indexer_db::{DbConnection, DbPool};
use log::{debug, error, info, trace, warn};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{self, interval, Instant as TokioInstant};
use tokio_util::sync::CancellationToken;

use crate::types::{BatchDeletionPermitGuard, BatchDeletionPermitReleased};

pub(crate) const LOG_TARGET: &str = "fisherman-scheduler";
const CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD: u8 =
    fisherman_common::consts::CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD;
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// No external commands are needed: the scheduler is entirely self-driven off the event store,
/// and there is no separate subsystem that needs to query it mid-cycle.
#[derive(Debug)]
pub enum FishermanSchedulerCommand {}

#[derive(Debug, Error)]
pub enum FishermanSchedulerError {
    #[error("event store error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel_async::pooled_connection::bb8::RunError),
    #[error("chain RPC error: {0}")]
    Chain(#[from] ChainClientError),
    #[error("forest-proof provider error: {0}")]
    Forest(#[from] ForestManagerError),
    #[error("deletion intent {0} points at a file row that no longer exists")]
    DanglingIntent(i64),
    #[error("target id has the wrong length for a 32-byte hash: {0} bytes")]
    MalformedTargetId(usize),
    #[error(
        "extrinsic finalized but the post-deletion forest root does not match the chain-queried \
         state: expected {expected}, observed {observed}"
    )]
    RootMismatch { expected: String, observed: String },
    #[error("extrinsic finalized without the expected completion event for this target")]
    MissingCompletionEvent,
}

impl fisherman_common::error::Classified for FishermanSchedulerError {
    fn class(&self) -> fisherman_common::error::ErrorClass {
        use fisherman_common::error::{Classified as _, ErrorClass};
        match self {
            FishermanSchedulerError::Database(_) | FishermanSchedulerError::Pool(_) => {
                ErrorClass::Transient
            }
            FishermanSchedulerError::Chain(e) => e.class(),
            FishermanSchedulerError::Forest(e) => e.class(),
            FishermanSchedulerError::DanglingIntent(_) => ErrorClass::Inconsistent,
            FishermanSchedulerError::MalformedTargetId(_) => ErrorClass::Fatal,
            FishermanSchedulerError::RootMismatch { .. } => ErrorClass::Inconsistent,
            FishermanSchedulerError::MissingCompletionEvent => ErrorClass::Transient,
        }
    }
}

/// A SCALE-encoded call to the chain's permissionless deletion extrinsics (§4.2 step 3c). Opaque
/// past this module: signed and handed to [`ChainClient::submit_and_watch`] as a
/// [`SignedExtrinsic`].
#[derive(Debug, Clone, Encode)]
enum Call {
    DeleteFilesForBsp {
        bsp_id: Hash32,
        files: Vec<UserFileEntry>,
        proof: Vec<u8>,
    },
    DeleteFilesForBucket {
        bucket_id: Hash32,
        files: Vec<UserFileEntry>,
        proof: Vec<u8>,
    },
    DeleteFilesForIncompleteStorageRequestBsp {
        bsp_id: Hash32,
        file_keys: Vec<Hash32>,
        proof: Vec<u8>,
    },
    DeleteFilesForIncompleteStorageRequestBucket {
        bucket_id: Hash32,
        file_keys: Vec<Hash32>,
        proof: Vec<u8>,
    },
}

#[derive(Debug, Clone, Encode)]
struct UserFileEntry {
    file_key: Hash32,
    signature: OffchainSignature,
}

/// One target-group's worth of pending work: the file rows to delete and the intent ids that
/// cover them, keyed by the target they were grouped under (§4.2 step 2).
struct Group {
    target_kind: TargetKind,
    target_id: Vec<u8>,
    intent_ids: Vec<i64>,
    files: Vec<File>,
}

pub struct FishermanService {
    chain: Arc<dyn ChainClient>,
    db_pool: DbPool,
    forest: Arc<dyn ForestProofProvider>,
    signing_key: Arc<EcdsaKeypair>,
    /// One permit each, so a `User` cycle and an `Incomplete` cycle can run concurrently while
    /// same-class cycles still serialize.
    user_batch_semaphore: Arc<Semaphore>,
    incomplete_batch_semaphore: Arc<Semaphore>,
    permit_release_sender: mpsc::UnboundedSender<BatchDeletionPermitReleased>,
    batch_cooldown_duration: Duration,
    idle_poll_interval_duration: Duration,
    consecutive_no_work_batches: u8,
    next_scheduled_run: TokioInstant,
    batch_deletion_limit: i64,
    shutdown: CancellationToken,
}

impl Actor for FishermanService {
    type Message = FishermanSchedulerCommand;
    type EventLoop = FishermanServiceEventLoop;
    type EventBusProvider = ();

    fn handle_message(
        &mut self,
        message: Self::Message,
    ) -> impl std::future::Future<Output = ()> + Send {
        async move {
            match message {}
        }
    }

    fn get_event_bus_provider(&self) -> &Self::EventBusProvider {
        &()
    }
}

impl FishermanService {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        db_pool: DbPool,
        forest: Arc<dyn ForestProofProvider>,
        signing_key: Arc<EcdsaKeypair>,
        batch_interval: Duration,
        idle_poll_interval: Duration,
        batch_deletion_limit: i64,
        shutdown: CancellationToken,
    ) -> Self {
        let (permit_release_sender, _permit_release_receiver) = mpsc::unbounded_channel();

        Self {
            chain,
            db_pool,
            forest,
            signing_key,
            user_batch_semaphore: Arc::new(Semaphore::new(1)),
            incomplete_batch_semaphore: Arc::new(Semaphore::new(1)),
            permit_release_sender,
            batch_cooldown_duration: batch_interval,
            idle_poll_interval_duration: idle_poll_interval,
            consecutive_no_work_batches: 0,
            next_scheduled_run: TokioInstant::now(),
            batch_deletion_limit,
            shutdown,
        }
    }

    /// Updates the reschedule timer from a completed batch cycle. `did_work = true` resets the
    /// no-work streak and schedules the next attempt after `batch_cooldown_duration`;
    /// `did_work = false` only widens the wait to `idle_poll_interval_duration` once
    /// [`CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD`] consecutive cycles found nothing, so a quiet
    /// `Incomplete` queue never stalls a busy `User` queue or vice versa.
    fn handle_batch_deletion_permit_released(&mut self, msg: BatchDeletionPermitReleased) {
        let now = TokioInstant::now();
        let delay = if msg.did_work {
            self.consecutive_no_work_batches = 0;
            self.batch_cooldown_duration
        } else {
            self.consecutive_no_work_batches = self.consecutive_no_work_batches.saturating_add(1);
            if self.consecutive_no_work_batches >= CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD {
                self.idle_poll_interval_duration
            } else {
                self.batch_cooldown_duration
            }
        };

        self.next_scheduled_run = now + delay;
        debug!(
            target: LOG_TARGET,
            "batch cycle released (did_work={}, no_work_streak={}), next run in {:?}",
            msg.did_work,
            self.consecutive_no_work_batches,
            delay
        );
    }

    /// Tries to start a batch cycle for each intent class independently (§4.2 step 1). Each
    /// class has its own semaphore, so a `User` cycle and an `Incomplete` cycle may run at the
    /// same time; within a class, a still-running previous cycle simply skips this attempt and
    /// waits for its permit-drop notification to reschedule.
    fn try_start_batch_deletion_cycle(&mut self) {
        let now = TokioInstant::now();

        // Safety net: if every permit-drop notification is ever lost, still retry.
        self.next_scheduled_run = now + self.idle_poll_interval_duration;

        let started_user = self.try_start_cycle_for(IntentKind::User);
        let started_incomplete = self.try_start_cycle_for(IntentKind::Incomplete);

        if !started_user && !started_incomplete {
            trace!(
                target: LOG_TARGET,
                "batch attempt due but a previous cycle is still running for every class"
            );
        }
    }

    fn semaphore_for(&self, kind: IntentKind) -> &Arc<Semaphore> {
        match kind {
            IntentKind::User => &self.user_batch_semaphore,
            IntentKind::Incomplete => &self.incomplete_batch_semaphore,
        }
    }

    fn try_start_cycle_for(&mut self, kind: IntentKind) -> bool {
        let Ok(permit) = self.semaphore_for(kind).clone().try_acquire_owned() else {
            return false;
        };

        debug!(target: LOG_TARGET, "starting batch deletion cycle for {kind} intents");

        let guard = Arc::new(BatchDeletionPermitGuard::new(
            permit,
            self.permit_release_sender.clone(),
        ));
        let chain = self.chain.clone();
        let db_pool = self.db_pool.clone();
        let forest = self.forest.clone();
        let signing_key = self.signing_key.clone();
        let limit = self.batch_deletion_limit;

        tokio::spawn(async move {
            match run_batch_cycle(&chain, &db_pool, &forest, &signing_key, kind, limit).await {
                Ok(did_work) => {
                    if did_work {
                        guard.mark_did_work();
                    }
                }
                Err(e) => {
                    error!(target: LOG_TARGET, "batch deletion cycle failed: {e}");
                }
            }
        });

        true
    }
}

/// Runs one batch cycle for `kind`: query pending intents, group by target, and process each
/// group. Returns whether any group had work to attempt.
async fn run_batch_cycle(
    chain: &Arc<dyn ChainClient>,
    db_pool: &DbPool,
    forest: &Arc<dyn ForestProofProvider>,
    signing_key: &Arc<EcdsaKeypair>,
    kind: IntentKind,
    limit: i64,
) -> Result<bool, FishermanSchedulerError> {
    let groups = {
        let mut conn = db_pool.get().await?;
        load_groups(&mut conn, kind, limit).await?
    };

    if groups.is_empty() {
        trace!(target: LOG_TARGET, "no pending {kind} intents this cycle");
        return Ok(false);
    }

    // At most S+B groups (§4.2 batch grouping contract); process them in parallel, serially
    // within each group.
    let cycles = groups.into_iter().map(|group| {
        let chain = chain.clone();
        let db_pool = db_pool.clone();
        let forest = forest.clone();
        let signing_key = signing_key.clone();
        async move { process_group(&chain, &db_pool, &forest, &signing_key, kind, group).await }
    });
    futures::future::join_all(cycles).await;

    Ok(true)
}

/// Reads one snapshot of pending intents for `kind` and groups them by target (§4.2 steps 1-2).
async fn load_groups<'a>(
    conn: &mut DbConnection<'a>,
    kind: IntentKind,
    limit: i64,
) -> Result<Vec<Group>, FishermanSchedulerError> {
    let intents = DeletionIntent::pending_by_kind(conn, kind, limit).await?;
    if intents.is_empty() {
        return Ok(Vec::new());
    }

    let file_ids: Vec<i64> = intents.iter().map(|intent| intent.file_id).collect();
    let files = File::get_many(conn, &file_ids).await?;
    let files_by_id: HashMap<i64, File> = files.into_iter().map(|f| (f.id, f)).collect();

    let mut groups: HashMap<(TargetKind, Vec<u8>), Group> = HashMap::new();
    for intent in intents {
        let Some(file) = files_by_id.get(&intent.file_id).cloned() else {
            return Err(FishermanSchedulerError::DanglingIntent(intent.id));
        };
        let key = (intent.target_kind, intent.target_id.clone());
        let group = groups.entry(key).or_insert_with(|| Group {
            target_kind: intent.target_kind,
            target_id: intent.target_id.clone(),
            intent_ids: Vec::new(),
            files: Vec::new(),
        });
        group.intent_ids.push(intent.id);
        group.files.push(file);
    }

    Ok(groups.into_values().collect())
}

/// Processes a single target group end to end: query root, request proof, submit, verify, and
/// update intent status. Failures leave the group's intents retry-eligible on the next cycle
/// (§4.2 "Retry and backoff"); they are never dropped.
async fn process_group(
    chain: &Arc<dyn ChainClient>,
    db_pool: &DbPool,
    forest: &Arc<dyn ForestProofProvider>,
    signing_key: &Arc<EcdsaKeypair>,
    kind: IntentKind,
    group: Group,
) -> Result<(), FishermanSchedulerError> {
    {
        let mut conn = db_pool.get().await?;
        for id in &group.intent_ids {
            DeletionIntent::set_status(&mut conn, *id, IntentStatus::Batched).await?;
        }
    }

    match process_group_inner(chain, forest, signing_key, kind, &group).await {
        Ok(()) => {
            let file_ids: Vec<i64> = group.files.iter().map(|f| f.id).collect();
            let mut conn = db_pool.get().await?;
            DeletionIntent::confirm_and_clear(
                &mut conn,
                group.target_kind,
                &group.target_id,
                &file_ids,
            )
            .await?;
            Ok(())
        }
        Err(e) => {
            warn!(
                target: LOG_TARGET,
                "deletion batch failed for {:?} target, retrying next cycle: {e}",
                group.target_kind
            );
            let mut conn = db_pool.get().await?;
            for id in &group.intent_ids {
                DeletionIntent::set_status(&mut conn, *id, IntentStatus::Failed).await?;
            }
            Err(e)
        }
    }
}

async fn process_group_inner(
    chain: &Arc<dyn ChainClient>,
    forest: &Arc<dyn ForestProofProvider>,
    signing_key: &Arc<EcdsaKeypair>,
    kind: IntentKind,
    group: &Group,
) -> Result<(), FishermanSchedulerError> {
    let target = parse_target(group.target_kind, &group.target_id)?;
    let root = chain.forest_root(target).await?;

    let file_keys: Vec<Hash32> = group
        .files
        .iter()
        .map(|f| hash32(&f.file_key))
        .collect::<Result<_, _>>()?;
    let proof = forest.prove(root, &file_keys).await?.0;

    let call = build_call(kind, target, group, &file_keys, proof)?;
    let extrinsic = sign_extrinsic(signing_key, &call);

    let outcome = chain.submit_and_watch(extrinsic).await?;
    let observed_new_root = find_completion_root(&outcome.events, target, &file_keys)?;

    let post_state_root = chain.forest_root(target).await?;
    if observed_new_root != post_state_root {
        return Err(FishermanSchedulerError::RootMismatch {
            expected: hex::encode(post_state_root),
            observed: hex::encode(observed_new_root),
        });
    }

    Ok(())
}

fn build_call(
    kind: IntentKind,
    target: DeletionTarget,
    group: &Group,
    file_keys: &[Hash32],
    proof: Vec<u8>,
) -> Result<Call, FishermanSchedulerError> {
    Ok(match (kind, target) {
        (IntentKind::User, DeletionTarget::Bsp(BspId(bsp_id))) => Call::DeleteFilesForBsp {
            bsp_id,
            files: user_file_entries(group, file_keys)?,
            proof,
        },
        (IntentKind::User, DeletionTarget::Bucket(BucketId(bucket_id))) => {
            Call::DeleteFilesForBucket {
                bucket_id,
                files: user_file_entries(group, file_keys)?,
                proof,
            }
        }
        (IntentKind::Incomplete, DeletionTarget::Bsp(BspId(bsp_id))) => {
            Call::DeleteFilesForIncompleteStorageRequestBsp {
                bsp_id,
                file_keys: file_keys.to_vec(),
                proof,
            }
        }
        (IntentKind::Incomplete, DeletionTarget::Bucket(BucketId(bucket_id))) => {
            Call::DeleteFilesForIncompleteStorageRequestBucket {
                bucket_id,
                file_keys: file_keys.to_vec(),
                proof,
            }
        }
    })
}

fn user_file_entries(
    group: &Group,
    file_keys: &[Hash32],
) -> Result<Vec<UserFileEntry>, FishermanSchedulerError> {
    group
        .files
        .iter()
        .zip(file_keys)
        .map(|(file, file_key)| {
            let signature = file
                .deletion_signature
                .as_deref()
                .and_then(|bytes| <[u8; 65]>::try_from(bytes).ok())
                .map(OffchainSignature)
                .ok_or(FishermanSchedulerError::DanglingIntent(file.id))?;
            Ok(UserFileEntry {
                file_key: *file_key,
                signature,
            })
        })
        .collect()
}

fn sign_extrinsic(signing_key: &EcdsaKeypair, call: &Call) -> SignedExtrinsic {
    let payload = call.encode();
    let signature = signing_key.sign(&payload);
    let mut bytes = payload;
    bytes.extend_from_slice(&signature.0);
    SignedExtrinsic(bytes)
}

fn parse_target(
    target_kind: TargetKind,
    target_id: &[u8],
) -> Result<DeletionTarget, FishermanSchedulerError> {
    let id = hash32(target_id)?;
    Ok(match target_kind {
        TargetKind::Bsp => DeletionTarget::Bsp(BspId(id)),
        TargetKind::Bucket => DeletionTarget::Bucket(BucketId(id)),
    })
}

fn hash32(bytes: &[u8]) -> Result<Hash32, FishermanSchedulerError> {
    <[u8; 32]>::try_from(bytes).map_err(|_| FishermanSchedulerError::MalformedTargetId(bytes.len()))
}

/// Finds the target's completion event among the finalized extrinsic's events and checks it
/// covers every file key this group submitted (§4.2 step 3e).
fn find_completion_root(
    events: &[ChainEvent],
    target: DeletionTarget,
    file_keys: &[Hash32],
) -> Result<Hash32, FishermanSchedulerError> {
    for event in events {
        match (event, target) {
            (
                ChainEvent::BspFileDeletionsCompleted {
                    bsp_id,
                    file_keys: completed,
                    new_root,
                },
                DeletionTarget::Bsp(expected),
            ) if *bsp_id == expected && completed_covers(completed, file_keys) => {
                return Ok(*new_root);
            }
            (
                ChainEvent::BucketFileDeletionsCompleted {
                    bucket_id,
                    file_keys: completed,
                    new_root,
                },
                DeletionTarget::Bucket(expected),
            ) if *bucket_id == expected && completed_covers(completed, file_keys) => {
                return Ok(*new_root);
            }
            _ => {}
        }
    }
    Err(FishermanSchedulerError::MissingCompletionEvent)
}

fn completed_covers(completed: &[Hash32], requested: &[Hash32]) -> bool {
    requested.iter().all(|key| completed.contains(key))
}

pub struct FishermanServiceEventLoop {
    service: FishermanService,
    receiver: mpsc::UnboundedReceiver<FishermanSchedulerCommand>,
    permit_release_receiver: mpsc::UnboundedReceiver<BatchDeletionPermitReleased>,
}

impl ActorEventLoop<FishermanService> for FishermanServiceEventLoop {
    fn new(
        actor: FishermanService,
        receiver: mpsc::UnboundedReceiver<FishermanSchedulerCommand>,
    ) -> Self {
        let (permit_release_sender, permit_release_receiver) = mpsc::unbounded_channel();
        let mut actor = actor;
        actor.permit_release_sender = permit_release_sender;

        Self {
            service: actor,
            receiver,
            permit_release_receiver,
        }
    }

    /// Fully event-driven loop (§4.2, §5): a timer fires `try_start_batch_deletion_cycle` at
    /// `next_scheduled_run`; a permit-drop notification reschedules it; commands (currently none)
    /// are handled inline; a periodic health check just logs liveness.
    async fn run(mut self) {
        info!(target: LOG_TARGET, "fisherman scheduler event loop started");
        self.service.next_scheduled_run = TokioInstant::now();

        let mut health_check_interval = interval(HEALTH_CHECK_INTERVAL);
        health_check_interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = time::sleep_until(self.service.next_scheduled_run) => {
                    self.service.try_start_batch_deletion_cycle();
                }

                Some(msg) = self.permit_release_receiver.recv() => {
                    self.service.handle_batch_deletion_permit_released(msg);
                }

                maybe_cmd = self.receiver.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.service.handle_message(cmd).await,
                        None => {
                            warn!(target: LOG_TARGET, "command channel closed");
                            break;
                        }
                    }
                }

                _ = health_check_interval.tick() => {
                    debug!(target: LOG_TARGET, "fisherman scheduler health check");
                }

                _ = self.service.shutdown.cancelled() => {
                    info!(
                        target: LOG_TARGET,
                        "shutdown signal received, waiting for any in-flight batch cycle to finish"
                    );
                    break;
                }
            }
        }

        // Any batch cycle still running holds its class's permit until it commits and its
        // guard drops; waiting for both here ensures we never return while one is mid-flight.
        let _ = self.service.user_batch_semaphore.acquire().await;
        let _ = self.service.incomplete_batch_semaphore.acquire().await;

        info!(target: LOG_TARGET, "fisherman scheduler event loop terminated");
    }
}
