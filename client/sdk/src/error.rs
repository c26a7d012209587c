use fisherman_common::error::{Classified, ErrorClass};

/// Errors surfaced by the client SDK surface.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("event store error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("chain RPC error: {0}")]
    Chain(#[from] fisherman_chain_rpc::ChainClientError),
    #[error("I/O error reading file content: {0}")]
    Io(#[from] std::io::Error),
}

impl Classified for SdkError {
    fn class(&self) -> ErrorClass {
        match self {
            SdkError::InvalidInput(_) => ErrorClass::InvalidInput,
            SdkError::Database(_) => ErrorClass::Transient,
            SdkError::Chain(e) => e.class(),
            SdkError::Io(_) => ErrorClass::Transient,
        }
    }
}
