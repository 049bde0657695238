//! Event payload definitions

use serde::{Deserialize, Serialize};
use typing_core::{ConversationId, ParticipantId, TypingIndicator};

/// READY event payload
///
/// Sent after successful Identify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Session ID of this connection
    pub session_id: String,

    /// Participant the connection identified as
    pub participant_id: ParticipantId,
}

/// TYPING_UPDATE event payload
///
/// Sent on Subscribe with the current state, then whenever the
/// conversation's indicator list changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingUpdateEvent {
    pub conversation_id: ConversationId,
    pub typing: Vec<TypingIndicator>,
}
