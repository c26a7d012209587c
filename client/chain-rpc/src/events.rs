//! Closed set of chain events the Indexer (C3) and Fisherman scheduler (C5) react to.
//!
//! The chain emits far more events than these; everything outside this enum is folded into
//! [`ChainEvent::Other`] by the RPC client's decoder. Handlers still match on every variant
//! explicitly, `Other` included, so that a runtime upgrade adding a relevant event is a compile
//! error in the handler rather than a silent gap.

use fisherman_common::types::{Address, BspId, BucketId, Hash32, MspId};

/// A single entry in a batch-aware BSP confirmation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BspConfirmation {
    pub file_key: Hash32,
    pub bsp_id: BspId,
    pub metadata: FileRecoveryMetadata,
}

/// File metadata carried by confirmation/acceptance events, sufficient to reconstruct a `file`
/// row when the Indexer's local copy has gone missing (the recovery pattern of §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecoveryMetadata {
    pub owner: Address,
    pub bucket_id: BucketId,
    pub location: String,
    pub size: u64,
    pub fingerprint: Hash32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    NewBucket {
        bucket_id: BucketId,
        owner: Address,
        name: String,
        msp_id: Option<MspId>,
    },
    BucketDeleted {
        bucket_id: BucketId,
    },
    MoveBucketAccepted {
        bucket_id: BucketId,
        new_msp_id: MspId,
    },
    MspStoppedStoringBucket {
        bucket_id: BucketId,
        msp_id: MspId,
    },
    NewStorageRequest {
        file_key: Hash32,
        owner: Address,
        bucket_id: BucketId,
        location: String,
        size: u64,
        fingerprint: Hash32,
    },
    MspAcceptedStorageRequest {
        file_key: Hash32,
        msp_id: MspId,
        metadata: FileRecoveryMetadata,
    },
    BspConfirmedStoring {
        confirmations: Vec<BspConfirmation>,
    },
    StorageRequestFulfilled {
        file_key: Hash32,
    },
    StorageRequestRevoked {
        file_key: Hash32,
    },
    StorageRequestExpired {
        file_key: Hash32,
    },
    StorageRequestRejected {
        file_key: Hash32,
    },
    IncompleteStorageRequest {
        file_key: Hash32,
    },
    FileDeletionRequested {
        file_key: Hash32,
        signature: [u8; 65],
        signer: Address,
    },
    BspRequestedToStopStoring {
        file_key: Hash32,
        bsp_id: BspId,
    },
    BspConfirmStoppedStoring {
        file_key: Hash32,
        bsp_id: BspId,
    },
    SpStopStoringInsolventUser {
        owner: Address,
    },
    BspFileDeletionsCompleted {
        bsp_id: BspId,
        file_keys: Vec<Hash32>,
        new_root: Hash32,
    },
    BucketFileDeletionsCompleted {
        bucket_id: BucketId,
        file_keys: Vec<Hash32>,
        new_root: Hash32,
    },
    /// Covers both `MutationsApplied` and `MutationsAppliedForProvider`: both only move the
    /// diagnostic `forest_root` cache forward for the named target.
    MutationsApplied {
        target: DeletionTargetEvent,
        new_root: Hash32,
    },
    MspSignedUp {
        msp_id: MspId,
        capabilities: Vec<u8>,
    },
    MspSignedOff {
        msp_id: MspId,
    },
    BspSignedUp {
        bsp_id: BspId,
    },
    BspSignedOff {
        bsp_id: BspId,
    },
    /// Every event outside the set above (`System`, `Balances`, `TransactionPayment`, other
    /// pallets). Carried as raw identifiers rather than decoded, since the Indexer never
    /// needs their payload.
    Other { pallet: String, variant: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTargetEvent {
    Bsp(BspId),
    Bucket(BucketId),
}
