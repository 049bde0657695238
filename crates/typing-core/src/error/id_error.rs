//! Identifier parsing errors

use thiserror::Error;

/// Error when parsing an identifier from its wire representation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("conversation id must not be empty")]
    EmptyConversationId,

    #[error("invalid participant id format: {0}")]
    InvalidParticipantId(String),
}
