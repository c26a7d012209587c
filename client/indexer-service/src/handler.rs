use std::sync::Arc;

use diesel_async::AsyncConnection;
use fisherman_actors::actor::{Actor, ActorEventLoop};
use fisherman_chain_rpc::events::{ChainEvent, DeletionTargetEvent};
use fisherman_chain_rpc::{ChainClient, ChainClientError, FinalizedHead};
use fisherman_common::types::Hash32;
use fisherman_indexer_db::models::file::NewFile;
use fisherman_indexer_db::models::{
    AppliedEvent, Block, Bsp, BspFile, Bucket, DeletionIntent, File, IntentKind, Msp, MspFile,
    ServiceState, TargetKind,
};
use fisherman_indexer_db::{DbConnection, DbPool};
use futures::StreamExt;
use log::{error, info};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{IndexerConfig, IndexerMode};

mod fishing;

pub(crate) const LOG_TARGET: &str = "indexer-service";

/// The Indexer has no external command surface: callers observe its effects by reading the
/// event store directly (§3.2).
#[derive(Debug)]
pub enum IndexerServiceCommand {}

pub struct IndexerService {
    chain: Arc<dyn ChainClient>,
    db_pool: DbPool,
    config: IndexerConfig,
    shutdown: CancellationToken,
}

impl Actor for IndexerService {
    type Message = IndexerServiceCommand;
    type EventLoop = IndexerServiceEventLoop;
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

impl IndexerService {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        db_pool: DbPool,
        config: IndexerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            chain,
            db_pool,
            config,
            shutdown,
        }
    }

    /// Drives the Indexer from `last_indexed_block` up to `head`, switching between sync mode
    /// and normal mode per block-height gap (§4.1 step 1).
    async fn handle_finality_notification(&self, head: FinalizedHead) -> Result<(), IndexerError> {
        let mut conn = self.db_pool.get().await?;
        let mut processed_this_cycle: u64 = 0;
        let mut announced_sync = false;

        loop {
            let last = ServiceState::get(&mut conn).await?.last_indexed_block as u64;
            if last >= head.number {
                if announced_sync {
                    info!(target: LOG_TARGET, "caught up to finalized head at block #{last}");
                }
                break;
            }

            let gap = head.number - last;
            let syncing = gap > self.config.sync_mode_min_blocks_behind;

            if syncing && !announced_sync {
                info!(
                    target: LOG_TARGET,
                    "entering sync mode: {gap} blocks behind finalized head #{}", head.number
                );
                announced_sync = true;
            }

            let page_size = if syncing {
                self.config.incomplete_sync_page_size.max(1)
            } else {
                1
            };
            let page_end = (last + page_size).min(head.number);

            for next in (last + 1)..=page_end {
                let hash = self.chain.block_hash_at(next).await?;
                let events = self.chain.events_at_block(hash).await?;
                index_block(&mut conn, next as i64, hash, events, self.config.mode).await?;
                processed_this_cycle += 1;
            }

            if syncing && processed_this_cycle >= self.config.incomplete_sync_max {
                info!(
                    target: LOG_TARGET,
                    "incomplete sync budget exhausted for this notification, {processed_this_cycle} blocks processed; resuming on next finality notification"
                );
                break;
            }
        }

        Ok(())
    }
}

/// Applies one finalized block's events atomically: every mutation and the
/// `last_indexed_block` advance happen in the same transaction (§4.1 step 4).
async fn index_block<'a>(
    conn: &mut DbConnection<'a>,
    height: i64,
    hash: Hash32,
    events: Vec<ChainEvent>,
    mode: IndexerMode,
) -> Result<(), IndexerError> {
    conn.transaction::<(), IndexerError, _>(move |conn| {
        Box::pin(async move {
            Block::record(conn, height, hash.to_vec()).await?;

            for (index, event) in events.iter().enumerate() {
                if !AppliedEvent::mark_applied(conn, height, index as i32).await? {
                    continue;
                }
                if mode == IndexerMode::Fishing && !fishing::is_relevant(event) {
                    continue;
                }
                apply_event(conn, event, height).await?;
            }

            ServiceState::advance(conn, height).await?;
            Ok(())
        })
    })
    .await
}

/// Applies a single chain event's store mutation, per the authoritative table in §4.1. Events
/// outside the table are matched explicitly and ignored, never dropped by a wildcard arm.
async fn apply_event<'a>(
    conn: &mut DbConnection<'a>,
    event: &ChainEvent,
    block_height: i64,
) -> Result<(), IndexerError> {
    match event {
        ChainEvent::NewBucket {
            bucket_id,
            owner,
            name,
            msp_id,
        } => {
            Bucket::upsert(
                conn,
                bucket_id.0.to_vec(),
                name.clone(),
                owner.0.to_vec(),
                msp_id.map(|id| id.0.to_vec()),
            )
            .await?;
        }
        ChainEvent::BucketDeleted { bucket_id } => {
            Bucket::set_deleted(conn, bucket_id.0).await?;
        }
        ChainEvent::MoveBucketAccepted {
            bucket_id,
            new_msp_id,
        } => {
            Bucket::rebind_msp(conn, bucket_id.0, new_msp_id.0.to_vec()).await?;
        }
        ChainEvent::MspStoppedStoringBucket { bucket_id, msp_id } => {
            let file_ids = File::ids_for_bucket(conn, bucket_id.0).await?;
            MspFile::delete_all_for_bucket_msp(conn, msp_id.0, &file_ids).await?;
            Bucket::clear_msp(conn, bucket_id.0).await?;
            for file_id in file_ids {
                File::delete_if_orphaned(conn, file_id).await?;
            }
        }
        ChainEvent::NewStorageRequest {
            file_key,
            owner,
            bucket_id,
            location,
            size,
            fingerprint,
        } => {
            File::upsert(
                conn,
                NewFile {
                    file_key: file_key.to_vec(),
                    fingerprint: fingerprint.to_vec(),
                    owner: owner.0.to_vec(),
                    bucket_id: bucket_id.0.to_vec(),
                    location: location.clone(),
                    size: *size as i64,
                    created_at_block: block_height,
                },
            )
            .await?;
        }
        ChainEvent::MspAcceptedStorageRequest {
            file_key,
            msp_id,
            metadata,
        } => {
            let file = get_or_recover_file(conn, *file_key, metadata, block_height).await?;
            MspFile::create(conn, msp_id.0.to_vec(), file.id, block_height).await?;
        }
        ChainEvent::BspConfirmedStoring { confirmations } => {
            for confirmation in confirmations {
                let file = get_or_recover_file(
                    conn,
                    confirmation.file_key,
                    &confirmation.metadata,
                    block_height,
                )
                .await?;
                BspFile::create(conn, confirmation.bsp_id.0.to_vec(), file.id, block_height)
                    .await?;
            }
        }
        ChainEvent::StorageRequestFulfilled { file_key } => {
            File::mark_fulfilled(conn, file_key).await?;
        }
        ChainEvent::StorageRequestRevoked { file_key }
        | ChainEvent::StorageRequestExpired { file_key }
        | ChainEvent::StorageRequestRejected { file_key }
        | ChainEvent::IncompleteStorageRequest { file_key } => {
            mark_incomplete(conn, file_key, block_height).await?;
        }
        ChainEvent::FileDeletionRequested {
            file_key,
            signature,
            signer,
        } => {
            File::set_deletion_signature(conn, file_key, signature.to_vec(), signer.0.to_vec())
                .await?;
            if let Some(file) = File::get_by_file_key(conn, file_key).await? {
                for bsp_id in BspFile::bsp_ids_for_file(conn, file.id).await? {
                    DeletionIntent::create(
                        conn,
                        file.id,
                        IntentKind::User,
                        TargetKind::Bsp,
                        bsp_id,
                        block_height,
                    )
                    .await?;
                }
                if File::has_msp_associations(conn, file.id).await? {
                    DeletionIntent::create(
                        conn,
                        file.id,
                        IntentKind::User,
                        TargetKind::Bucket,
                        file.bucket_id.clone(),
                        block_height,
                    )
                    .await?;
                }
            }
        }
        ChainEvent::BspRequestedToStopStoring { .. } => {}
        ChainEvent::BspConfirmStoppedStoring { file_key, bsp_id } => {
            if let Some(file) = File::get_by_file_key(conn, file_key).await? {
                BspFile::delete(conn, bsp_id.0, file.id).await?;
                File::delete_if_orphaned(conn, file.id).await?;
            }
        }
        ChainEvent::SpStopStoringInsolventUser { owner } => {
            let file_ids = File::ids_for_owner(conn, owner.0).await?;
            BspFile::delete_all_for_owner(conn, &file_ids).await?;
            for file_id in file_ids {
                File::delete_if_orphaned(conn, file_id).await?;
            }
        }
        ChainEvent::BspFileDeletionsCompleted {
            bsp_id,
            file_keys,
            new_root,
        } => {
            Bsp::update_forest_root(conn, bsp_id.0, new_root.to_vec()).await?;
            for file_key in file_keys {
                let Some(file) = File::get_by_file_key(conn, file_key).await? else {
                    continue;
                };
                BspFile::delete(conn, bsp_id.0, file.id).await?;
                DeletionIntent::confirm_and_clear(conn, TargetKind::Bsp, bsp_id.0, &[file.id])
                    .await?;
                File::delete_if_orphaned(conn, file.id).await?;
            }
        }
        ChainEvent::BucketFileDeletionsCompleted {
            bucket_id,
            file_keys,
            new_root,
        } => {
            Bucket::update_forest_root(conn, bucket_id.0, new_root.to_vec()).await?;
            let managing_msp = Bucket::get(conn, bucket_id.0).await?.and_then(|b| b.msp_id);
            for file_key in file_keys {
                let Some(file) = File::get_by_file_key(conn, file_key).await? else {
                    continue;
                };
                if let Some(msp_id) = &managing_msp {
                    MspFile::delete(conn, msp_id, file.id).await?;
                }
                DeletionIntent::confirm_and_clear(
                    conn,
                    TargetKind::Bucket,
                    bucket_id.0,
                    &[file.id],
                )
                .await?;
                File::delete_if_orphaned(conn, file.id).await?;
            }
        }
        ChainEvent::MutationsApplied { target, new_root } => match target {
            DeletionTargetEvent::Bsp(bsp_id) => {
                Bsp::update_forest_root(conn, bsp_id.0, new_root.to_vec()).await?;
            }
            DeletionTargetEvent::Bucket(bucket_id) => {
                Bucket::update_forest_root(conn, bucket_id.0, new_root.to_vec()).await?;
            }
        },
        ChainEvent::MspSignedUp {
            msp_id,
            capabilities,
        } => {
            Msp::upsert(
                conn,
                msp_id.0.to_vec(),
                serde_json::json!({ "raw": hex::encode(capabilities) }),
            )
            .await?;
        }
        ChainEvent::MspSignedOff { msp_id } => {
            Msp::delete(conn, msp_id.0).await?;
        }
        ChainEvent::BspSignedUp { bsp_id } => {
            Bsp::upsert(conn, bsp_id.0.to_vec(), serde_json::json!({})).await?;
        }
        ChainEvent::BspSignedOff { bsp_id } => {
            Bsp::delete(conn, bsp_id.0).await?;
        }
        // Every other pallet's events: matched explicitly so a new relevant variant added
        // above is a compile error here, not a silent gap.
        ChainEvent::Other { .. } => {}
    }
    Ok(())
}

/// Looks up a file by key, reconstructing its row from event-carried metadata if the store's
/// copy has gone missing (§4.1 recovery pattern) — e.g. a `fishing`-mode indexer restarted in
/// `full` mode after a BSP confirmation referencing a file it never saw the storage request for.
async fn get_or_recover_file<'a>(
    conn: &mut DbConnection<'a>,
    file_key: Hash32,
    metadata: &fisherman_chain_rpc::events::FileRecoveryMetadata,
    block_height: i64,
) -> Result<File, IndexerError> {
    if let Some(file) = File::get_by_file_key(conn, file_key).await? {
        return Ok(file);
    }

    info!(
        target: LOG_TARGET,
        "file record not found for file_key {}, recreating from event metadata (recovery)",
        hex::encode(file_key)
    );

    File::upsert(
        conn,
        NewFile {
            file_key: file_key.to_vec(),
            fingerprint: metadata.fingerprint.to_vec(),
            owner: metadata.owner.0.to_vec(),
            bucket_id: metadata.bucket_id.0.to_vec(),
            location: metadata.location.clone(),
            size: metadata.size as i64,
            created_at_block: block_height,
        },
    )
    .await?;

    File::get_by_file_key(conn, file_key)
        .await?
        .ok_or(IndexerError::RecoveryFailed)
}

/// Shared handler for `StorageRequestRevoked`/`StorageRequestExpired`/`StorageRequestRejected`/
/// `IncompleteStorageRequest`: creates a pending `Incomplete` deletion intent against every
/// current provider association, or deletes the file immediately if it was never stored.
async fn mark_incomplete<'a>(
    conn: &mut DbConnection<'a>,
    file_key: &Hash32,
    block_height: i64,
) -> Result<(), IndexerError> {
    let Some(file) = File::get_by_file_key(conn, file_key).await? else {
        return Ok(());
    };

    let bsp_ids = BspFile::bsp_ids_for_file(conn, file.id).await?;
    let has_msp = File::has_msp_associations(conn, file.id).await?;

    if bsp_ids.is_empty() && !has_msp {
        File::delete_if_orphaned(conn, file.id).await?;
        return Ok(());
    }

    for bsp_id in bsp_ids {
        DeletionIntent::create(
            conn,
            file.id,
            IntentKind::Incomplete,
            TargetKind::Bsp,
            bsp_id,
            block_height,
        )
        .await?;
    }
    if has_msp {
        DeletionIntent::create(
            conn,
            file.id,
            IntentKind::Incomplete,
            TargetKind::Bucket,
            file.bucket_id.clone(),
            block_height,
        )
        .await?;
    }
    Ok(())
}

pub struct IndexerServiceEventLoop {
    receiver: tokio::sync::mpsc::UnboundedReceiver<IndexerServiceCommand>,
    actor: IndexerService,
}

enum MergedMessage {
    Command(IndexerServiceCommand),
    Finalized(FinalizedHead),
}

impl ActorEventLoop<IndexerService> for IndexerServiceEventLoop {
    fn new(
        actor: IndexerService,
        receiver: tokio::sync::mpsc::UnboundedReceiver<IndexerServiceCommand>,
    ) -> Self {
        Self { actor, receiver }
    }

    async fn run(self) {
        let Self { actor, receiver } = self;
        info!(target: LOG_TARGET, "indexer starting up in {:?} mode", actor.config.mode);

        let finality_stream = match actor.chain.subscribe_finalized_heads().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(target: LOG_TARGET, "failed to subscribe to finality notifications: {e}");
                return;
            }
        };

        let command_stream = tokio_stream::wrappers::UnboundedReceiverStream::new(receiver);
        let mut merged = futures::stream::select(
            command_stream.map(MergedMessage::Command),
            finality_stream.map(MergedMessage::Finalized),
        );

        loop {
            tokio::select! {
                maybe_message = merged.next() => {
                    match maybe_message {
                        Some(MergedMessage::Command(command)) => match command {},
                        Some(MergedMessage::Finalized(head)) => {
                            if let Err(e) = actor.handle_finality_notification(head).await {
                                error!(target: LOG_TARGET, "failed to handle finality notification: {e}");
                            }
                        }
                        None => break,
                    }
                }
                _ = actor.shutdown.cancelled() => {
                    info!(target: LOG_TARGET, "shutdown signal received, indexer exiting after in-flight block");
                    break;
                }
            }
        }

        info!(target: LOG_TARGET, "indexer shutting down");
    }
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("event store error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel_async::pooled_connection::bb8::RunError),
    #[error("chain RPC error: {0}")]
    Chain(#[from] ChainClientError),
    #[error("recovered file row vanished immediately after insertion")]
    RecoveryFailed,
}

impl fisherman_common::error::Classified for IndexerError {
    fn class(&self) -> fisherman_common::error::ErrorClass {
        use fisherman_common::error::{Classified as _, ErrorClass};
        match self {
            IndexerError::Database(_) | IndexerError::Pool(_) => ErrorClass::Transient,
            IndexerError::Chain(e) => e.class(),
            IndexerError::RecoveryFailed => ErrorClass::Inconsistent,
        }
    }
}
