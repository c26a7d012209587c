use std::fmt;

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::FILE_CHUNK_SIZE;

/// Monotonic chain block height.
pub type BlockNumber = u64;

/// 32-byte identifier: file key, fingerprint, bucket id, provider id, chunk hash.
pub type Hash32 = [u8; 32];

/// 20-byte account address (Ethereum-style, matching the owner/signer address width used
/// throughout the data model).
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

/// Identifier of a Backup Storage Provider.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BspId(pub Hash32);

impl fmt::Debug for BspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bsp(0x{})", hex::encode(self.0))
    }
}

/// Identifier of a bucket, managed by exactly one Managed Storage Provider at a time.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketId(pub Hash32);

impl fmt::Debug for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bucket(0x{})", hex::encode(self.0))
    }
}

/// Identifier of a Managed Storage Provider.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MspId(pub Hash32);

impl fmt::Debug for MspId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Msp(0x{})", hex::encode(self.0))
    }
}

/// A deletion target, either a BSP's own forest or a bucket's forest (managed by its MSP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionTarget {
    Bsp(BspId),
    Bucket(BucketId),
}

/// Typed index of a file chunk, 0-based.
pub type ChunkId = u64;

/// A chunk of plaintext file content, sized at most [`FILE_CHUNK_SIZE`].
pub type Chunk = Vec<u8>;

/// Metadata describing a content-addressed file, mirroring the columns persisted in the
/// `file` table (§3.3 of the spec).
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub owner: Address,
    pub bucket_id: BucketId,
    pub location: String,
    pub size: u64,
    pub fingerprint: Hash32,
}

impl FileMetadata {
    pub fn new(
        owner: Address,
        bucket_id: BucketId,
        location: String,
        size: u64,
        fingerprint: Hash32,
    ) -> Self {
        Self {
            owner,
            bucket_id,
            location,
            size,
            fingerprint,
        }
    }

    /// Number of [`FILE_CHUNK_SIZE`]-sized chunks this file's content is split into.
    pub fn chunk_count(&self) -> u64 {
        let full_chunks = self.size / (FILE_CHUNK_SIZE as u64);
        if self.size % (FILE_CHUNK_SIZE as u64) > 0 {
            full_chunks + 1
        } else {
            full_chunks
        }
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = ChunkId> {
        0..self.chunk_count()
    }

    /// The chain-visible file key: the hash of the SCALE-encoded metadata.
    ///
    /// The glossary defines the file key as "a hash over fingerprint, bucket, location,
    /// owner, size"; this binds all five fields by hashing their SCALE encoding as a whole,
    /// so any field change yields a different key.
    pub fn file_key(&self) -> Hash32 {
        let mut hasher = Sha256::new();
        hasher.update(self.encode());
        hasher.finalize().into()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, codec::Error> {
        Self::decode(&mut &bytes[..])
    }
}

/// Merkle root over a file's chunked plaintext content, computed by the client SDK (C7)
/// before issuing a storage request.
pub fn merkle_fingerprint(chunks: &[Chunk]) -> Hash32 {
    if chunks.is_empty() {
        return Sha256::digest(b"").into();
    }

    let mut level: Vec<Hash32> = chunks
        .iter()
        .map(|chunk| {
            let mut hasher = Sha256::new();
            hasher.update([0u8]); // leaf domain tag
            hasher.update(chunk);
            hasher.finalize().into()
        })
        .collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update([1u8]); // internal-node domain tag
            hasher.update(pair[0]);
            hasher.update(pair.get(1).copied().unwrap_or(pair[0]));
            next.push(hasher.finalize().into());
        }
        level = next;
    }
    level[0]
}

/// An operation a user can express intent for and sign off-chain.
#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOperation {
    Delete,
}

/// The payload a user signs to authorize an operation on a file they own. Bound to the file
/// key and the operation only; the signature is later checked against this exact SCALE
/// encoding (open question in the spec's design notes, resolved in DESIGN.md).
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct FileOperationIntention {
    pub file_key: Hash32,
    pub operation: FileOperation,
}

/// An ECDSA (secp256k1) signature over a [`FileOperationIntention`], recoverable to an
/// [`Address`] for verification against the file's recorded owner.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffchainSignature(pub [u8; 65]);

impl fmt::Debug for OffchainSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(self.0))
    }
}

impl Encode for OffchainSignature {
    fn encode(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Decode for OffchainSignature {
    fn decode<I: codec::Input>(input: &mut I) -> Result<Self, codec::Error> {
        let mut bytes = [0u8; 65];
        input.read(&mut bytes)?;
        Ok(OffchainSignature(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_key_is_deterministic_and_sensitive_to_every_field() {
        let base = FileMetadata::new(
            Address([1u8; 20]),
            BucketId([2u8; 32]),
            "a/b.txt".to_string(),
            1024,
            [3u8; 32],
        );
        let key = base.file_key();
        assert_eq!(key, base.file_key());

        let mut changed = base.clone();
        changed.size += 1;
        assert_ne!(key, changed.file_key());
    }

    #[test]
    fn chunk_count_rounds_up() {
        let m = FileMetadata::new(
            Address([0u8; 20]),
            BucketId([0u8; 32]),
            "f".into(),
            FILE_CHUNK_SIZE as u64 + 1,
            [0u8; 32],
        );
        assert_eq!(m.chunk_count(), 2);
    }

    #[test]
    fn merkle_fingerprint_is_order_sensitive() {
        let a = vec![b"chunk-a".to_vec(), b"chunk-b".to_vec()];
        let b = vec![b"chunk-b".to_vec(), b"chunk-a".to_vec()];
        assert_ne!(merkle_fingerprint(&a), merkle_fingerprint(&b));
    }
}
