//! Payload definitions
//!
//! Defines the payload structures carried in the `d` field of non-dispatch messages.

use serde::{Deserialize, Serialize};
use typing_core::{ConversationId, ParticipantId};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
    /// Quiet period in milliseconds after which a typing indicator expires
    pub typing_timeout: u64,
}

impl HelloPayload {
    /// Create a Hello payload with custom values
    #[must_use]
    pub fn with_intervals(heartbeat_interval: u64, typing_timeout: u64) -> Self {
        Self {
            heartbeat_interval,
            typing_timeout,
        }
    }
}

/// Payload for op 2 (Identify)
///
/// Declares the participant behind the socket. The gateway trusts it as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Participant ID (string or integer)
    pub participant_id: ParticipantId,

    /// Name shown in other participants' typing banners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl IdentifyPayload {
    /// Display name with surrounding whitespace removed, `None` if blank
    #[must_use]
    pub fn normalized_display_name(&self) -> Option<String> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Payload for ops 3-6 (TypingStart, TypingStop, Subscribe, Unsubscribe)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPayload {
    /// Target conversation
    pub conversation_id: ConversationId,
}
