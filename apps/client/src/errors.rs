use thiserror::Error;

use crate::api::ApiError;

/// Client-level error type.
///
/// Every fallible operation that crosses a module boundary returns this.
/// The variants separate what the caller should do about the failure:
/// `Input` is shown inline next to the offending field, `Network` and
/// `Server` are dismissible and may be retried manually, `Export` leaves
/// document state untouched, `Internal` indicates a bug.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Input(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// True for errors whose recovery path is dismiss-and-retry. Nothing
    /// here retries automatically; the caller owns the retry decision.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Server { .. })
    }

    /// The message to show the user, without transport or status prefixes.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Input(msg)
            | ClientError::Network(msg)
            | ClientError::Export(msg) => msg.clone(),
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Internal(e) => e.to_string(),
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http(e) => ClientError::Network(e.to_string()),
            ApiError::Api { status, message } => ClientError::Server { status, message },
            ApiError::Parse(e) => ClientError::Network(format!("Malformed response: {e}")),
        }
    }
}
