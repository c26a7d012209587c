//! Client SDK surface (C7): file fingerprinting, bucket lookups against the event store, and
//! signed storage-request/deletion-request issuance against the chain. No background tasks —
//! every function here is a one-shot call a CLI or embedding application drives directly.

pub mod buckets;
pub mod error;
pub mod fingerprint;
pub mod requests;

pub use buckets::{get_bucket, list_bucket_files};
pub use error::SdkError;
pub use fingerprint::fingerprint_reader;
pub use requests::{issue_storage_request, request_file_deletion};
