//! Shared error taxonomy.
//!
//! Every component-level error enum in this workspace (chain-rpc, indexer, scheduler, envelope)
//! implements [`Classified`] so that the scheduler and indexer loops can branch on taxonomy class
//! rather than string-matching `Display` output.

/// The four error classes named by the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input supplied by a caller (short passphrase, bad signature hex, truncated
    /// header). Surfaced to the caller verbatim, never retried.
    InvalidInput,
    /// RPC timeout, DB connection loss, mempool rejection due to staleness. Absorbed and
    /// retried by the scheduler/indexer loops.
    Transient,
    /// A post-extrinsic forest root disagreed with the completion event. Fatal for the
    /// current tick only: the intent stays pending and the next tick recomputes from scratch.
    Inconsistent,
    /// On-chain runtime incompatibility (decoding failure). The process exits non-zero for
    /// operator intervention.
    Fatal,
}

/// Implemented by every component error enum so call sites can decide whether to retry.
pub trait Classified {
    fn class(&self) -> ErrorClass;

    fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }
}
