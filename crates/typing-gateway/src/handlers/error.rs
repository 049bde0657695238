//! Handler error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Invalid payload received
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Typing op before Identify
    #[error("Not identified")]
    NotIdentified,

    /// The socket writer is gone
    #[error("Connection closed")]
    ConnectionClosed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Convert to a close code (if applicable)
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::InvalidPayload(_) => Some(CloseCode::DecodeError),
            Self::NotIdentified => Some(CloseCode::NotIdentified),
            Self::ConnectionClosed => None,
            Self::Internal(_) => Some(CloseCode::UnknownError),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Failed to encode event: {err}"))
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
