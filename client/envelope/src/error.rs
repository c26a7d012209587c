use fisherman_common::error::{Classified, ErrorClass};

/// Errors surfaced by the envelope reader/writer and key-derivation helpers.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("malformed envelope header: {0}")]
    MalformedHeader(String),
    #[error("chunk {index} failed authentication or does not match the expected running counter")]
    TagMismatch { index: u64 },
    #[error("chunk length does not fit in a 32-bit frame")]
    ChunkTooLarge,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classified for EnvelopeError {
    fn class(&self) -> ErrorClass {
        match self {
            EnvelopeError::InvalidInput(_)
            | EnvelopeError::MalformedHeader(_)
            | EnvelopeError::TagMismatch { .. }
            | EnvelopeError::ChunkTooLarge => ErrorClass::InvalidInput,
            EnvelopeError::Io(_) => ErrorClass::Transient,
        }
    }
}
