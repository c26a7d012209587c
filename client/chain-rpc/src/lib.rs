pub mod client;
pub mod events;
pub mod mock;

pub use client::{
    ChainClient, ChainClientError, DeletionTarget, ExtrinsicOutcome, FinalizedHead,
    SignedExtrinsic,
};
pub use events::ChainEvent;
pub use mock::MockChainClient;
