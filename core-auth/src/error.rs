use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("Authorization state mismatch")]
    StateMismatch,

    #[error("Invalid authorization request: {0}")]
    InvalidRequest(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl From<AuthError> for BridgeError {
    fn from(err: AuthError) -> Self {
        BridgeError::Credentials(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
