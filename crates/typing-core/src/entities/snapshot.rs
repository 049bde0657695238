//! Snapshot - point-in-time copy of every conversation's typing indicators

use serde::Serialize;
use std::collections::BTreeMap;

use super::TypingIndicator;
use crate::value_objects::{ConversationId, ParticipantId};

/// All indicators across all conversations
///
/// Within a conversation, entries keep the order in which each participant
/// first started typing. Empty conversations are never retained, so an absent
/// key and an empty list are indistinguishable to readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    conversations: BTreeMap<ConversationId, Vec<TypingIndicator>>,
}

impl Snapshot {
    /// Create an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indicators for a conversation (empty if absent)
    pub fn conversation(&self, conversation_id: &ConversationId) -> &[TypingIndicator] {
        self.conversations
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up a single participant's indicator
    pub fn get(
        &self,
        conversation_id: &ConversationId,
        participant_id: ParticipantId,
    ) -> Option<&TypingIndicator> {
        self.conversation(conversation_id)
            .iter()
            .find(|i| i.participant_id == participant_id)
    }

    /// Iterate over non-empty conversations
    pub fn conversations(&self) -> impl Iterator<Item = (&ConversationId, &[TypingIndicator])> {
        self.conversations.iter().map(|(id, v)| (id, v.as_slice()))
    }

    /// Number of conversations with at least one typing participant
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Total number of stored indicators
    pub fn indicator_count(&self) -> usize {
        self.conversations.values().map(Vec::len).sum()
    }

    /// Check if nobody is typing anywhere
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Insert or replace the indicator for its (conversation, participant) pair
    ///
    /// A replaced entry keeps its position. Returns `true` if the pair was new.
    pub fn upsert(&mut self, indicator: TypingIndicator) -> bool {
        let entries = self
            .conversations
            .entry(indicator.conversation_id.clone())
            .or_default();

        match entries
            .iter_mut()
            .find(|i| i.participant_id == indicator.participant_id)
        {
            Some(existing) => {
                *existing = indicator;
                false
            }
            None => {
                entries.push(indicator);
                true
            }
        }
    }

    /// Remove a participant's indicator, pruning the conversation if it empties
    pub fn remove(
        &mut self,
        conversation_id: &ConversationId,
        participant_id: ParticipantId,
    ) -> Option<TypingIndicator> {
        let entries = self.conversations.get_mut(conversation_id)?;
        let pos = entries
            .iter()
            .position(|i| i.participant_id == participant_id)?;
        let removed = entries.remove(pos);

        if entries.is_empty() {
            self.conversations.remove(conversation_id);
        }

        Some(removed)
    }

    /// Remove every indicator of a conversation
    pub fn remove_conversation(&mut self, conversation_id: &ConversationId) -> Vec<TypingIndicator> {
        self.conversations
            .remove(conversation_id)
            .unwrap_or_default()
    }

    /// Remove everything, returning what was stored
    pub fn clear(&mut self) -> Vec<TypingIndicator> {
        std::mem::take(&mut self.conversations)
            .into_values()
            .flatten()
            .collect()
    }
}
