//! Forest-proof provider (C4): given a forest root and a set of file keys, produce an
//! inclusion proof. The spec treats the forest data structure and its proof verifier as an
//! external capability, so this crate defines only the boundary the Fisherman scheduler (C5)
//! calls through, plus an in-memory mock for tests — it does not reimplement a trie.

pub mod error;
pub mod mock;

use async_trait::async_trait;
pub use error::ForestManagerError;
use fisherman_common::types::Hash32;
pub use mock::MockForestProofProvider;

pub(crate) const LOG_TARGET: &str = "forest-manager";

/// An inclusion proof as produced by the external forest-proof capability. Opaque to every
/// caller above C4: the scheduler embeds it in a `deleteFiles` extrinsic without inspecting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof(pub Vec<u8>);

/// C4: the boundary through which the Fisherman scheduler requests inclusion proofs.
#[async_trait]
pub trait ForestProofProvider: Send + Sync + 'static {
    /// Produces a proof that every key in `file_keys` is included in the trie committed to by
    /// `forest_root`. Queried fresh for every scheduler tick (§5): never cached across ticks.
    async fn prove(
        &self,
        forest_root: Hash32,
        file_keys: &[Hash32],
    ) -> Result<InclusionProof, ForestManagerError>;
}
