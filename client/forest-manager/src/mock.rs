//! An in-memory [`ForestProofProvider`] for tests: tracks a forest root as the hash over its
//! current key set, recomputed on every mutation, and proves inclusion by checking set
//! membership directly rather than building an authenticated path. Exercises the scheduler's
//! proof-request flow without depending on a real trie implementation.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use fisherman_common::types::Hash32;
use sha2::{Digest, Sha256};

use crate::{ForestManagerError, ForestProofProvider, InclusionProof};

pub struct MockForestProofProvider {
    keys: Mutex<BTreeSet<Hash32>>,
}

impl MockForestProofProvider {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn insert(&self, key: Hash32) {
        self.keys.lock().unwrap().insert(key);
    }

    pub fn remove(&self, key: &Hash32) {
        self.keys.lock().unwrap().remove(key);
    }

    /// The root over the current key set, for callers that need to assert against it directly.
    pub fn root(&self) -> Hash32 {
        Self::root_of(&self.keys.lock().unwrap())
    }

    fn root_of(keys: &BTreeSet<Hash32>) -> Hash32 {
        let mut hasher = Sha256::new();
        for key in keys {
            hasher.update(key);
        }
        hasher.finalize().into()
    }
}

impl Default for MockForestProofProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForestProofProvider for MockForestProofProvider {
    async fn prove(
        &self,
        forest_root: Hash32,
        file_keys: &[Hash32],
    ) -> Result<InclusionProof, ForestManagerError> {
        let keys = self.keys.lock().unwrap();
        if Self::root_of(&keys) != forest_root {
            return Err(ForestManagerError::Unavailable(
                "forest root does not match the mock's current key set".into(),
            ));
        }
        if !file_keys.iter().all(|k| keys.contains(k)) {
            return Err(ForestManagerError::KeyNotInForest);
        }

        let mut proof = Vec::with_capacity(file_keys.len() * 32);
        for key in file_keys {
            proof.extend_from_slice(key);
        }
        Ok(InclusionProof(proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn proves_inclusion_of_known_keys() {
        let provider = MockForestProofProvider::new();
        provider.insert([1u8; 32]);
        provider.insert([2u8; 32]);
        let root = provider.root();

        let proof = provider.prove(root, &[[1u8; 32]]).await.unwrap();
        assert!(!proof.0.is_empty());
    }

    #[tokio::test]
    async fn rejects_keys_outside_the_forest() {
        let provider = MockForestProofProvider::new();
        provider.insert([1u8; 32]);
        let root = provider.root();

        let err = provider.prove(root, &[[9u8; 32]]).await.unwrap_err();
        assert!(matches!(err, ForestManagerError::KeyNotInForest));
    }

    #[tokio::test]
    async fn rejects_stale_forest_root() {
        let provider = MockForestProofProvider::new();
        provider.insert([1u8; 32]);
        let stale_root = provider.root();
        provider.insert([2u8; 32]);

        let err = provider.prove(stale_root, &[[1u8; 32]]).await.unwrap_err();
        assert!(matches!(err, ForestManagerError::Unavailable(_)));
    }
}
