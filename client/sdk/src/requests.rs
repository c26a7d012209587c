use std::sync::Arc;

use codec::Encode;
use fisherman_chain_rpc::{ChainClient, SignedExtrinsic};
use fisherman_common::crypto::EcdsaKeypair;
use fisherman_common::types::{
    BucketId, FileOperation, FileOperationIntention, Hash32, OffchainSignature,
};

use crate::error::SdkError;

/// The two user-originated mutations the client SDK issues. Mirrors the shape of the Fisherman
/// scheduler's own `Call` enum (`client/fisherman-service/src/handler.rs`): a SCALE-encoded
/// payload signed by appending the signer's recoverable ECDSA signature, submitted as an opaque
/// [`SignedExtrinsic`] through C1.
#[derive(Debug, Clone, Encode)]
enum Call {
    IssueStorageRequest {
        bucket_id: Hash32,
        location: String,
        fingerprint: Hash32,
        size: u64,
    },
    RequestFileDeletion {
        file_key: Hash32,
        signature: OffchainSignature,
    },
}

fn sign_extrinsic(signing_key: &EcdsaKeypair, call: &Call) -> SignedExtrinsic {
    let payload = call.encode();
    let signature = signing_key.sign(&payload);
    let mut bytes = payload;
    bytes.extend_from_slice(&signature.0);
    SignedExtrinsic(bytes)
}

/// Issues a storage request for a file already fingerprinted via
/// [`crate::fingerprint::fingerprint_reader`]. The caller's own Indexer (C3) observes the
/// resulting `NewStorageRequest` event and creates the `file` row; this function does not
/// write to the event store directly.
pub async fn issue_storage_request(
    chain: &Arc<dyn ChainClient>,
    signing_key: &EcdsaKeypair,
    bucket_id: BucketId,
    location: String,
    fingerprint: Hash32,
    size: u64,
) -> Result<(), SdkError> {
    let call = Call::IssueStorageRequest {
        bucket_id: bucket_id.0,
        location,
        fingerprint,
        size,
    };
    chain.submit_and_watch(sign_extrinsic(signing_key, &call)).await?;
    Ok(())
}

/// Signs a [`FileOperationIntention`] authorizing deletion of `file_key` and submits it. The
/// returned signature is the same bytes the Indexer later persists on the `file` row and the
/// Fisherman scheduler (C5) embeds, unmodified, in its `deleteFiles` extrinsic for each
/// provider target (§3.1 `DeletionIntent`/User).
pub async fn request_file_deletion(
    chain: &Arc<dyn ChainClient>,
    signing_key: &EcdsaKeypair,
    file_key: Hash32,
) -> Result<OffchainSignature, SdkError> {
    let intention = FileOperationIntention {
        file_key,
        operation: FileOperation::Delete,
    };
    let signature = signing_key.sign(&intention.encode());
    let call = Call::RequestFileDeletion {
        file_key,
        signature: signature.clone(),
    };
    chain.submit_and_watch(sign_extrinsic(signing_key, &call)).await?;
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fisherman_chain_rpc::MockChainClient;

    use super::*;

    #[tokio::test]
    async fn issuing_a_storage_request_submits_one_extrinsic() {
        let mock = MockChainClient::new();
        mock.finalize_block([1u8; 32], vec![]);
        let chain: Arc<dyn ChainClient> = Arc::new(mock.clone());
        let signing_key = EcdsaKeypair::from_bytes(&[4u8; 32]).unwrap();

        issue_storage_request(
            &chain,
            &signing_key,
            BucketId([5u8; 32]),
            "docs/report.pdf".into(),
            [6u8; 32],
            2048,
        )
        .await
        .unwrap();

        assert_eq!(mock.submitted_extrinsics().len(), 1);
    }

    #[tokio::test]
    async fn deletion_request_signature_recovers_to_the_signer() {
        let mock = MockChainClient::new();
        mock.finalize_block([2u8; 32], vec![]);
        let chain: Arc<dyn ChainClient> = Arc::new(mock);
        let signing_key = EcdsaKeypair::from_bytes(&[8u8; 32]).unwrap();
        let file_key = [3u8; 32];

        let signature = request_file_deletion(&chain, &signing_key, file_key)
            .await
            .unwrap();

        let intention = FileOperationIntention {
            file_key,
            operation: FileOperation::Delete,
        };
        assert!(fisherman_common::crypto::verify(
            &signature,
            &intention.encode(),
            &signing_key.address(),
        ));
    }
}
