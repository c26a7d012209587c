use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::challenge::SignatureChallenge;
use crate::error::EnvelopeError;

/// Passphrases shorter than this are rejected rather than silently used as weak IKM.
pub const MIN_PASSWORD_LEN: usize = 16;

pub const IKM_KIND_PASSWORD: u8 = 0;
pub const IKM_KIND_SIGNATURE: u8 = 1;

/// Where the envelope's key material comes from.
#[derive(Debug, Clone)]
pub enum IkmSource {
    Password(String),
    /// `signature_hex` is the wallet's ECDSA signature (65 bytes, hex-encoded, optionally
    /// `0x`-prefixed) over `challenge.message_bytes()`. The signature bytes themselves are the
    /// IKM: deterministic (RFC 6979) signing means the same key + challenge always derives the
    /// same DEK, matching the contract's "same inputs ⇒ same DEK" requirement.
    Signature {
        signature_hex: String,
        challenge: SignatureChallenge,
    },
}

impl IkmSource {
    pub fn ikm_kind(&self) -> u8 {
        match self {
            IkmSource::Password(_) => IKM_KIND_PASSWORD,
            IkmSource::Signature { .. } => IKM_KIND_SIGNATURE,
        }
    }

    pub fn challenge_bytes(&self) -> Option<[u8; 32]> {
        match self {
            IkmSource::Password(_) => None,
            IkmSource::Signature { challenge, .. } => challenge.challenge,
        }
    }

    pub(crate) fn derive_ikm(&self) -> Result<zeroize::Zeroizing<Vec<u8>>, EnvelopeError> {
        match self {
            IkmSource::Password(password) => {
                if password.as_bytes().len() < MIN_PASSWORD_LEN {
                    return Err(EnvelopeError::InvalidInput(format!(
                        "passphrase must be at least {MIN_PASSWORD_LEN} bytes"
                    )));
                }
                Ok(zeroize::Zeroizing::new(password.as_bytes().to_vec()))
            }
            IkmSource::Signature { signature_hex, .. } => {
                let trimmed = signature_hex.trim_start_matches("0x");
                let bytes = hex::decode(trimmed)
                    .map_err(|_| EnvelopeError::InvalidInput("signature is not valid hex".into()))?;
                if bytes.len() != 65 {
                    return Err(EnvelopeError::InvalidInput(format!(
                        "signature must be 65 bytes, got {}",
                        bytes.len()
                    )));
                }
                Ok(zeroize::Zeroizing::new(bytes))
            }
        }
    }
}

/// DEK and base nonce derived from a salt and IKM. Zeroized on drop; never logged or persisted
/// beyond the lifetime of one envelope read/write.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeys {
    pub dek: [u8; 32],
    pub base_nonce: [u8; 12],
}

/// HKDF-Extract(salt, ikm) once, then two HKDF-Expand calls with distinct `info` labels, per
/// the key-derivation contract.
pub fn derive_keys(salt: &[u8; 32], ikm: &[u8]) -> DerivedKeys {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut dek = [0u8; 32];
    hk.expand(b"dek", &mut dek)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    let mut base_nonce = [0u8; 12];
    hk.expand(b"base-nonce", &mut base_nonce)
        .expect("12 bytes is a valid HKDF-SHA256 output length");
    DerivedKeys { dek, base_nonce }
}

/// `BaseNonce XOR BE64(chunk_index)`, the 8-byte index left-padded with four zero bytes to the
/// nonce's 12-byte width. Chunk 0's nonce is bit-identical to `base_nonce`.
pub fn chunk_nonce(base_nonce: &[u8; 12], chunk_index: u64) -> [u8; 12] {
    let index_bytes = chunk_index.to_be_bytes();
    let mut nonce = *base_nonce;
    for i in 0..8 {
        nonce[4 + i] ^= index_bytes[i];
    }
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        let source = IkmSource::Password("too-short".into());
        assert!(matches!(
            source.derive_ikm(),
            Err(EnvelopeError::InvalidInput(_))
        ));
    }

    #[test]
    fn same_salt_and_ikm_derive_the_same_keys() {
        let salt = [1u8; 32];
        let ikm = b"a passphrase long enough".to_vec();
        let a = derive_keys(&salt, &ikm);
        let b = derive_keys(&salt, &ikm);
        assert_eq!(a.dek, b.dek);
        assert_eq!(a.base_nonce, b.base_nonce);
    }

    #[test]
    fn chunk_zero_nonce_equals_base_nonce() {
        let base_nonce = [0xAB; 12];
        assert_eq!(chunk_nonce(&base_nonce, 0), base_nonce);
    }

    #[test]
    fn consecutive_chunk_nonces_differ() {
        let base_nonce = [0x11; 12];
        assert_ne!(chunk_nonce(&base_nonce, 1), chunk_nonce(&base_nonce, 2));
    }
}
