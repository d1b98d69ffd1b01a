use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Failure below the API layer: the exchange itself did not produce a usable
/// reply.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("call was canceled")]
    Canceled,

    #[error("HTTP {code}: {message}")]
    HttpStatus { code: u16, message: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("API error {code}: {message}")]
    Api { code: u64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Call has already been executed")]
    AlreadyExecuted,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CallError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, CallError::Transport(TransportError::Canceled))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }

    /// API result code, for [`CallError::Api`]
    pub fn api_code(&self) -> Option<u64> {
        match self {
            CallError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// HTTP status, for non-2xx replies without an API envelope
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CallError::Transport(TransportError::HttpStatus { code, .. }) => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn canceled() -> Self {
        CallError::Transport(TransportError::Canceled)
    }
}

impl From<BridgeError> for CallError {
    fn from(err: BridgeError) -> Self {
        CallError::Transport(TransportError::Bridge(err))
    }
}

impl From<std::io::Error> for CallError {
    fn from(err: std::io::Error) -> Self {
        CallError::Transport(TransportError::Bridge(BridgeError::Io(err)))
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
