//! Error types for the pCloud provider

use bridge_traits::error::BridgeError;
use core_call::CallError;
use thiserror::Error;

/// pCloud provider errors
#[derive(Error, Debug)]
pub enum PCloudError {
    /// Text that is not an `f<id>` / `d<id>` identifier
    #[error("'{0}' is not a valid pCloud file identifier")]
    InvalidEntryId(String),

    /// Argument rejected before any request was built
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Client settings or runtime dependencies are missing or invalid
    #[error(transparent)]
    Config(#[from] core_runtime::Error),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for pCloud operations
pub type Result<T> = std::result::Result<T, PCloudError>;

impl From<PCloudError> for CallError {
    fn from(error: PCloudError) -> Self {
        match error {
            PCloudError::BridgeError(e) => CallError::from(e),
            other => CallError::InvalidArgument(other.to_string()),
        }
    }
}
