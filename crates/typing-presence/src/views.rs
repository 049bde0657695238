//! Query views over a snapshot.
//!
//! Stateless projections used by synchronous reads and projected
//! subscriptions alike.

use typing_core::{ConversationId, Snapshot, TypingIndicator};

/// Indicators of a conversation in store order, empty if absent
pub fn list(snapshot: &Snapshot, conversation_id: &ConversationId) -> Vec<TypingIndicator> {
    snapshot.conversation(conversation_id).to_vec()
}

/// Whether anyone is typing in a conversation
pub fn any_typing(snapshot: &Snapshot, conversation_id: &ConversationId) -> bool {
    !snapshot.conversation(conversation_id).is_empty()
}

/// Banner labels for a conversation
///
/// Uses the display name when one was given and `"User {id}"` otherwise.
pub fn typing_display_names(snapshot: &Snapshot, conversation_id: &ConversationId) -> Vec<String> {
    snapshot
        .conversation(conversation_id)
        .iter()
        .map(TypingIndicator::label)
        .collect()
}
