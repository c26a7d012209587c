/// Errors surfaced by a [`crate::ForestProofProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ForestManagerError {
    /// One or more requested file keys are not present under the given forest root.
    #[error("one or more file keys are not present under the given forest root")]
    KeyNotInForest,
    /// The external forest-proof capability could not be reached or timed out.
    #[error("forest-proof provider unavailable: {0}")]
    Unavailable(String),
}

impl fisherman_common::error::Classified for ForestManagerError {
    fn class(&self) -> fisherman_common::error::ErrorClass {
        use fisherman_common::error::ErrorClass;
        match self {
            ForestManagerError::KeyNotInForest => ErrorClass::Inconsistent,
            ForestManagerError::Unavailable(_) => ErrorClass::Transient,
        }
    }
}
