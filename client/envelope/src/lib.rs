//! Streaming authenticated-encryption file format (C6): a client encrypts a file chunk by
//! chunk before uploading it to a storage provider, and decrypts it the same way on download.
//! Key material is derived deterministically from either a passphrase or a wallet signature
//! over an application-bound challenge, so the same inputs always reproduce the same key —
//! there is no separate key-storage concern for this crate to own.

pub mod challenge;
pub mod error;
pub mod header;
pub mod keys;
pub mod stream;

pub use challenge::SignatureChallenge;
pub use error::EnvelopeError;
pub use header::{read_encryption_header, EnvelopeHeader};
pub use keys::{derive_keys, DerivedKeys, IkmSource, MIN_PASSWORD_LEN};
pub use stream::{EnvelopeReader, EnvelopeWriter};
