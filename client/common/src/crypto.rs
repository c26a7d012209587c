//! ECDSA (secp256k1) signing and address derivation.
//!
//! The chain runtime is treated as a black box that only understands Ethereum-style 20-byte
//! addresses and ECDSA signatures; this module mirrors the `EthereumSignature`/`k256`
//! implementation the chain client uses, generalized away from a substrate keystore so it can
//! be used directly by the client SDK (C7) and by the envelope library's signature-derived IKM
//! (C6).

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::types::{Address, OffchainSignature};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed signature bytes")]
    MalformedSignature,
    #[error("signature does not recover to a valid public key")]
    RecoveryFailed,
}

/// Keccak-256 of the message, the prehash signed and verified throughout this module.
fn prehash(msg: &[u8]) -> [u8; 32] {
    Keccak256::digest(msg).into()
}

/// Ethereum-style address: the last 20 bytes of Keccak-256 of the uncompressed public key.
pub fn public_to_address(public: &VerifyingKey) -> Address {
    let uncompressed = public.to_encoded_point(false);
    let bytes = uncompressed.as_bytes(); // 65 bytes, leading 0x04
    let hash = Keccak256::digest(&bytes[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Address(addr)
}

/// A holder of a secp256k1 signing key, used by the client SDK to sign deletion intentions
/// and by test fixtures to sign envelope challenges. `secret_bytes` is zeroized on drop.
pub struct EcdsaKeypair {
    signing_key: SigningKey,
    /// Never read; kept only so its backing memory is zeroized when this keypair drops.
    #[allow(dead_code)]
    secret_bytes: Zeroizing<[u8; 32]>,
}

impl EcdsaKeypair {
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes(secret.into()).map_err(|_| CryptoError::MalformedSignature)?;
        Ok(Self {
            signing_key,
            secret_bytes: Zeroizing::new(*secret),
        })
    }

    pub fn address(&self) -> Address {
        public_to_address(self.signing_key.verifying_key())
    }

    /// Deterministic (RFC 6979) ECDSA signature over Keccak-256(msg), recoverable to an
    /// [`Address`] without needing the public key on hand.
    pub fn sign(&self, msg: &[u8]) -> OffchainSignature {
        let digest = prehash(msg);
        let (signature, recovery_id): (Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .expect("signing a 32-byte prehash never fails");

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        OffchainSignature(bytes)
    }
}

/// Recover the signer's address from a signature and the message it was signed over.
pub fn recover_address(
    sig: &OffchainSignature,
    msg: &[u8],
) -> Result<Address, CryptoError> {
    let digest = prehash(msg);
    let signature = Signature::from_slice(&sig.0[..64]).map_err(|_| CryptoError::MalformedSignature)?;
    let recovery_id =
        RecoveryId::from_byte(sig.0[64]).ok_or(CryptoError::MalformedSignature)?;
    let public = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(public_to_address(&public))
}

/// Verify a signature was produced by `expected` over `msg`, without needing the public key.
pub fn verify(sig: &OffchainSignature, msg: &[u8], expected: &Address) -> bool {
    match recover_address(sig, msg) {
        Ok(recovered) => recovered == *expected,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_recover_round_trips_to_the_signer_address() {
        let keypair = EcdsaKeypair::from_bytes(&[7u8; 32]).unwrap();
        let msg = b"delete file 0xdead";
        let sig = keypair.sign(msg);

        assert!(verify(&sig, msg, &keypair.address()));
        assert_eq!(recover_address(&sig, msg).unwrap(), keypair.address());
    }

    #[test]
    fn signature_over_a_different_message_does_not_verify() {
        let keypair = EcdsaKeypair::from_bytes(&[9u8; 32]).unwrap();
        let sig = keypair.sign(b"delete file A");
        assert!(!verify(&sig, b"delete file B", &keypair.address()));
    }

    #[test]
    fn signing_is_deterministic() {
        let keypair = EcdsaKeypair::from_bytes(&[3u8; 32]).unwrap();
        let a = keypair.sign(b"same message");
        let b = keypair.sign(b"same message");
        assert_eq!(a.0, b.0);
    }
}
