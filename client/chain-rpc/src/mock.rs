//! An in-memory [`ChainClient`] used by the indexer, scheduler and SDK test suites.
//!
//! Grounded in the teacher's test harness's container-pause affordances (pausing a node or
//! database container mid-test to exercise restart/recovery paths), reworked as an in-process
//! fault-injection switch so the same scenarios run without Docker (§9 redesign note).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use fisherman_common::types::Hash32;

use crate::client::{ChainClient, ChainClientError, DeletionTarget, ExtrinsicOutcome, FinalizedHead, SignedExtrinsic};
use crate::events::ChainEvent;

struct MockBlock {
    hash: Hash32,
    events: Vec<ChainEvent>,
}

struct MockState {
    blocks: Vec<MockBlock>,
    forest_roots: HashMap<DeletionTarget, Hash32>,
    /// Extrinsics submitted via [`ChainClient::submit_and_watch`], for assertions in tests.
    submitted: Vec<SignedExtrinsic>,
    finality_sender: Option<mpsc::UnboundedSender<FinalizedHead>>,
}

/// A fully in-memory chain double. Blocks are appended with [`MockChainClient::finalize_block`],
/// which both records the block and, if a subscriber is attached, pushes the new head.
#[derive(Clone)]
pub struct MockChainClient {
    state: Arc<Mutex<MockState>>,
    rpc_paused: Arc<AtomicBool>,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                blocks: Vec::new(),
                forest_roots: HashMap::new(),
                submitted: Vec::new(),
                finality_sender: None,
            })),
            rpc_paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Appends a new finalized block, notifying any active finality subscription.
    pub fn finalize_block(&self, hash: Hash32, events: Vec<ChainEvent>) -> u64 {
        let mut state = self.state.lock();
        state.blocks.push(MockBlock { hash, events });
        let number = state.blocks.len() as u64;
        if let Some(sender) = &state.finality_sender {
            let _ = sender.send(FinalizedHead { number, hash });
        }
        number
    }

    pub fn set_forest_root(&self, target: DeletionTarget, root: Hash32) {
        self.state.lock().forest_roots.insert(target, root);
    }

    pub fn submitted_extrinsics(&self) -> Vec<SignedExtrinsic> {
        self.state.lock().submitted.clone()
    }

    /// Simulates an RPC endpoint outage: every call fails as [`ChainClientError::Transient`]
    /// until [`MockChainClient::resume_rpc`] is called.
    pub fn pause_rpc(&self) {
        self.rpc_paused.store(true, Ordering::SeqCst);
    }

    pub fn resume_rpc(&self) {
        self.rpc_paused.store(false, Ordering::SeqCst);
    }

    fn check_paused(&self) -> Result<(), ChainClientError> {
        if self.rpc_paused.load(Ordering::SeqCst) {
            log::warn!("mock rpc call rejected: endpoint is paused");
            Err(ChainClientError::Transient("rpc endpoint paused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChainClient {
    async fn subscribe_finalized_heads(
        &self,
    ) -> Result<UnboundedReceiverStream<FinalizedHead>, ChainClientError> {
        self.check_paused()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state.lock().finality_sender = Some(sender);
        Ok(UnboundedReceiverStream::new(receiver))
    }

    async fn finalized_head(&self) -> Result<FinalizedHead, ChainClientError> {
        self.check_paused()?;
        let state = self.state.lock();
        state
            .blocks
            .last()
            .map(|b| FinalizedHead {
                number: state.blocks.len() as u64,
                hash: b.hash,
            })
            .ok_or_else(|| ChainClientError::Transient("no finalized blocks yet".to_string()))
    }

    async fn events_at_block(&self, block: Hash32) -> Result<Vec<ChainEvent>, ChainClientError> {
        self.check_paused()?;
        let state = self.state.lock();
        state
            .blocks
            .iter()
            .find(|b| b.hash == block)
            .map(|b| b.events.clone())
            .ok_or_else(|| ChainClientError::DecodeError("unknown block hash".to_string()))
    }

    async fn block_hash_at(&self, height: u64) -> Result<Hash32, ChainClientError> {
        self.check_paused()?;
        let state = self.state.lock();
        state
            .blocks
            .get((height.saturating_sub(1)) as usize)
            .map(|b| b.hash)
            .ok_or_else(|| ChainClientError::Transient(format!("block {height} not finalized yet")))
    }

    async fn submit_and_watch(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> Result<ExtrinsicOutcome, ChainClientError> {
        self.check_paused()?;
        let mut state = self.state.lock();
        state.submitted.push(extrinsic);
        let last = state
            .blocks
            .last()
            .ok_or_else(|| ChainClientError::NotFinalized("no blocks finalized yet".to_string()))?;
        Ok(ExtrinsicOutcome {
            block: FinalizedHead {
                number: state.blocks.len() as u64,
                hash: last.hash,
            },
            events: last.events.clone(),
        })
    }

    async fn forest_root(&self, target: DeletionTarget) -> Result<Hash32, ChainClientError> {
        self.check_paused()?;
        self.state
            .lock()
            .forest_roots
            .get(&target)
            .copied()
            .ok_or_else(|| ChainClientError::Transient("no forest root recorded for target".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisherman_common::types::BspId;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn paused_client_fails_transiently_and_resumes_cleanly() {
        let client = MockChainClient::new();
        let target = DeletionTarget::Bsp(BspId([1u8; 32]));
        client.set_forest_root(target, [2u8; 32]);

        client.pause_rpc();
        assert!(matches!(
            client.forest_root(target).await,
            Err(ChainClientError::Transient(_))
        ));

        client.resume_rpc();
        assert_eq!(client.forest_root(target).await.unwrap(), [2u8; 32]);
    }

    #[tokio::test]
    async fn finalize_block_is_observable_through_subscription_and_by_hash() {
        let client = MockChainClient::new();
        let mut heads = client.subscribe_finalized_heads().await.unwrap();

        let hash = [9u8; 32];
        client.finalize_block(hash, vec![]);

        let head = heads.next().await.unwrap();
        assert_eq!(head.hash, hash);
        assert_eq!(client.block_hash_at(1).await.unwrap(), hash);
    }
}
