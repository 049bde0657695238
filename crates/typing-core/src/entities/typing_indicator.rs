//! Typing indicator entity - an ephemeral "participant is composing" signal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ConversationId, ParticipantId};

/// Typing indicator entity
///
/// Only indicators with `is_typing == true` are ever stored; stopping is
/// represented by removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub conversation_id: ConversationId,
    pub participant_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub is_typing: bool,
    pub last_updated: DateTime<Utc>,
}

impl TypingIndicator {
    /// Create a new indicator stamped with the current time
    pub fn new(
        conversation_id: ConversationId,
        participant_id: ParticipantId,
        display_name: Option<String>,
    ) -> Self {
        Self {
            conversation_id,
            participant_id,
            display_name,
            is_typing: true,
            last_updated: Utc::now(),
        }
    }

    /// Name shown in a "X is typing" banner
    ///
    /// Falls back to `User {participant_id}` when no display name is known.
    pub fn label(&self) -> String {
        match self.display_name.as_deref() {
            Some(name) => name.to_string(),
            None => format!("User {}", self.participant_id),
        }
    }
}
