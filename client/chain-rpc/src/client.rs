//! The chain RPC client abstraction (C1).
//!
//! The chain is treated as a black box behind this trait: the Indexer and Fisherman scheduler
//! never import a runtime or substrate crate directly, only [`ChainClient`]. Grounded in the
//! teacher's `SubmittedTransaction::watch_for_success` lifecycle (wait for inclusion, check the
//! dispatch result, surface the block's events) and `blockchain_utils::get_events_at_block`
//! (decode the events storage item for a given block), generalized away from a concrete
//! substrate `ParachainClient`.

use async_trait::async_trait;
pub use fisherman_common::types::DeletionTarget;
use fisherman_common::types::Hash32;
use thiserror::Error;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::events::ChainEvent;

/// A finalized block header, as delivered by the finality subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizedHead {
    pub number: u64,
    pub hash: Hash32,
}

/// Outcome of an extrinsic that reached a finalized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrinsicOutcome {
    pub block: FinalizedHead,
    pub events: Vec<ChainEvent>,
}

/// A signed, SCALE-encoded extrinsic ready for submission. Opaque to every caller above C1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtrinsic(pub Vec<u8>);

#[derive(Debug, Error)]
pub enum ChainClientError {
    /// InvalidInput: the caller handed the client a malformed extrinsic or target reference.
    #[error("malformed extrinsic or request")]
    InvalidRequest,
    /// Transient: RPC endpoint unreachable, request timed out, or the mempool rejected the
    /// extrinsic for a reason that may no longer hold on resubmission (e.g. stale nonce).
    #[error("transient RPC failure: {0}")]
    Transient(String),
    /// Transient: the extrinsic was dropped from the pool, or finality watch timed out, without
    /// ever reaching a block. Safe to retry with a fresh submission.
    #[error("extrinsic did not reach a finalized block: {0}")]
    NotFinalized(String),
    /// Inconsistent: the extrinsic finalized but failed on-chain (dispatch error).
    #[error("extrinsic dispatch failed: {0}")]
    DispatchFailed(String),
    /// Fatal: the client could not decode a block's events or runtime metadata, implying a
    /// runtime upgrade the client does not understand.
    #[error("failed to decode chain data: {0}")]
    DecodeError(String),
}

impl fisherman_common::error::Classified for ChainClientError {
    fn class(&self) -> fisherman_common::error::ErrorClass {
        use fisherman_common::error::ErrorClass;
        match self {
            ChainClientError::InvalidRequest => ErrorClass::InvalidInput,
            ChainClientError::Transient(_) | ChainClientError::NotFinalized(_) => {
                ErrorClass::Transient
            }
            ChainClientError::DispatchFailed(_) => ErrorClass::Inconsistent,
            ChainClientError::DecodeError(_) => ErrorClass::Fatal,
        }
    }
}

/// C1: the sole interface through which the Indexer, the Fisherman scheduler and the client SDK
/// touch the chain.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Subscribes to newly finalized heads, in ascending order, starting from whatever the node
    /// considers "now". Callers wanting history must pair this with [`ChainClient::events_at_block`]
    /// over the range they need to catch up.
    async fn subscribe_finalized_heads(
        &self,
    ) -> Result<UnboundedReceiverStream<FinalizedHead>, ChainClientError>;

    /// Fetches the finalized head at construction time, used to compute the sync/normal mode
    /// gap on startup.
    async fn finalized_head(&self) -> Result<FinalizedHead, ChainClientError>;

    /// Fetches the ordered event list for a given finalized block.
    async fn events_at_block(&self, block: Hash32) -> Result<Vec<ChainEvent>, ChainClientError>;

    /// Resolves a block height to its finalized hash, used when paging through a sync-mode gap.
    async fn block_hash_at(&self, height: u64) -> Result<Hash32, ChainClientError>;

    /// Submits a signed extrinsic and waits until it is included in a finalized block, returning
    /// that block and its events. Does not itself distinguish dispatch success from failure;
    /// callers inspect the returned events for the expected completion event.
    async fn submit_and_watch(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> Result<ExtrinsicOutcome, ChainClientError>;

    /// Queries the current forest root for a provider, used to build inclusion proofs. Never
    /// cached by the caller beyond a single scheduler tick (§5).
    async fn forest_root(&self, target: DeletionTarget) -> Result<Hash32, ChainClientError>;
}
