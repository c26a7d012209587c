//! Filters the shared [`ChainEvent`] taxonomy down to the subset `fishing` mode applies: the
//! events needed to track which files a provider holds and when they must be deleted, without
//! the bucket/MSP bookkeeping `full` mode also maintains.

use fisherman_chain_rpc::events::ChainEvent;

/// Whether `event` should be applied by an Indexer running in fishing mode.
///
/// Matches every variant explicitly, `Other` included, so a new variant added to
/// [`ChainEvent`] forces a decision here rather than silently falling through a wildcard.
pub fn is_relevant(event: &ChainEvent) -> bool {
    match event {
        ChainEvent::NewStorageRequest { .. }
        | ChainEvent::MspAcceptedStorageRequest { .. }
        | ChainEvent::BspConfirmedStoring { .. }
        | ChainEvent::StorageRequestFulfilled { .. }
        | ChainEvent::StorageRequestRevoked { .. }
        | ChainEvent::StorageRequestExpired { .. }
        | ChainEvent::StorageRequestRejected { .. }
        | ChainEvent::IncompleteStorageRequest { .. }
        | ChainEvent::FileDeletionRequested { .. }
        | ChainEvent::BspConfirmStoppedStoring { .. }
        | ChainEvent::SpStopStoringInsolventUser { .. }
        | ChainEvent::BspFileDeletionsCompleted { .. }
        | ChainEvent::BucketFileDeletionsCompleted { .. }
        | ChainEvent::BspSignedUp { .. }
        | ChainEvent::BspSignedOff { .. } => true,

        // Bucket/MSP bookkeeping irrelevant to a fishing-only node: it never manages buckets
        // or needs to resolve a bucket's managing MSP.
        ChainEvent::NewBucket { .. }
        | ChainEvent::BucketDeleted { .. }
        | ChainEvent::MoveBucketAccepted { .. }
        | ChainEvent::MspStoppedStoringBucket { .. }
        | ChainEvent::BspRequestedToStopStoring { .. }
        | ChainEvent::MutationsApplied { .. }
        | ChainEvent::MspSignedUp { .. }
        | ChainEvent::MspSignedOff { .. }
        | ChainEvent::Other { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use fisherman_common::types::{BspId, Hash32};

    use super::*;

    #[test]
    fn storage_lifecycle_events_are_relevant() {
        assert!(is_relevant(&ChainEvent::StorageRequestFulfilled {
            file_key: Hash32::default(),
        }));
        assert!(is_relevant(&ChainEvent::BspSignedUp {
            bsp_id: BspId(Hash32::default()),
        }));
    }

    #[test]
    fn bucket_management_events_are_not_relevant() {
        assert!(!is_relevant(&ChainEvent::BucketDeleted {
            bucket_id: fisherman_common::types::BucketId(Hash32::default()),
        }));
        assert!(!is_relevant(&ChainEvent::Other {
            pallet: "System".into(),
            variant: "ExtrinsicSuccess".into(),
        }));
    }
}
