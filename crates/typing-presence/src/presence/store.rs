//! Typing indicator store.
//!
//! The single source of truth for who is typing where. One mutex serializes
//! every mutation, timer firings included, and the resulting snapshot is
//! published before the lock is released so observers see mutations in the
//! order they were applied.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use typing_core::{ConversationId, ParticipantId, Snapshot, TypingIndicator};

use super::expiry::{ExpiryScheduler, ExpiryTicket, PresenceKey};
use crate::pubsub::Notifier;

struct StoreInner {
    state: Mutex<Snapshot>,
    scheduler: ExpiryScheduler,
    notifier: Notifier,
}

/// Typing indicator store
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct PresenceStore {
    inner: Arc<StoreInner>,
}

impl PresenceStore {
    /// Create a store whose indicators expire after `timeout` without refresh
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Snapshot::new()),
                scheduler: ExpiryScheduler::new(timeout),
                notifier: Notifier::new(),
            }),
        }
    }

    /// Notifier publishing this store's snapshots
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Expiry timeout
    pub fn timeout(&self) -> Duration {
        self.inner.scheduler.delay()
    }

    /// Insert or refresh a participant's indicator and re-arm its expiry
    ///
    /// Must be called from within a tokio runtime.
    pub fn upsert(
        &self,
        conversation_id: ConversationId,
        participant_id: ParticipantId,
        display_name: Option<String>,
    ) {
        let key: PresenceKey = (conversation_id.clone(), participant_id);
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);

        let mut state = self.inner.state.lock();
        let created = state.upsert(TypingIndicator::new(
            conversation_id.clone(),
            participant_id,
            display_name,
        ));

        let timer_key = key.clone();
        let ticket = self.inner.scheduler.reschedule(key, move |ticket| {
            if let Some(inner) = weak.upgrade() {
                inner.expire(&timer_key, ticket);
            }
        });

        self.inner.publish(&state);

        tracing::debug!(
            conversation_id = %conversation_id,
            participant_id = %participant_id,
            created,
            ticket = %ticket,
            "Typing indicator upserted"
        );
    }

    /// Remove a participant's indicator and cancel its timer
    ///
    /// Returns `false` (and publishes nothing) if the pair was not present.
    pub fn remove(&self, conversation_id: &ConversationId, participant_id: ParticipantId) -> bool {
        let mut state = self.inner.state.lock();
        let key: PresenceKey = (conversation_id.clone(), participant_id);
        self.inner.scheduler.cancel(&key);

        if state.remove(conversation_id, participant_id).is_none() {
            return false;
        }

        self.inner.publish(&state);

        tracing::debug!(
            conversation_id = %conversation_id,
            participant_id = %participant_id,
            "Typing indicator removed"
        );

        true
    }

    /// Remove every indicator in a conversation
    ///
    /// Returns how many indicators were removed.
    pub fn clear_conversation(&self, conversation_id: &ConversationId) -> usize {
        let mut state = self.inner.state.lock();
        let removed = state.remove_conversation(conversation_id);
        self.inner.scheduler.cancel_conversation(conversation_id);

        if removed.is_empty() {
            return 0;
        }

        self.inner.publish(&state);

        tracing::debug!(
            conversation_id = %conversation_id,
            removed = removed.len(),
            "Conversation typing indicators cleared"
        );

        removed.len()
    }

    /// Remove every indicator in every conversation
    ///
    /// Returns how many indicators were removed.
    pub fn clear_all(&self) -> usize {
        let mut state = self.inner.state.lock();
        let cancelled = self.inner.scheduler.cancel_all();
        let removed = state.clear().len();

        if removed == 0 {
            return 0;
        }

        self.inner.publish(&state);

        tracing::info!(removed, cancelled, "All typing indicators cleared");

        removed
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.notifier.latest()
    }

    /// Number of armed expiry timers
    pub fn pending_expiries(&self) -> usize {
        self.inner.scheduler.pending_count()
    }
}

impl StoreInner {
    /// Publish the current state; the caller holds the state lock
    fn publish(&self, state: &Snapshot) {
        self.notifier.publish(Arc::new(state.clone()));
    }

    /// Timer callback: remove the pair if `ticket` is still its current arming
    fn expire(&self, key: &PresenceKey, ticket: ExpiryTicket) {
        let mut state = self.state.lock();

        if !self.scheduler.claim(key, ticket) {
            tracing::trace!(
                conversation_id = %key.0,
                participant_id = %key.1,
                ticket = %ticket,
                "Ignoring superseded expiry timer"
            );
            return;
        }

        if state.remove(&key.0, key.1).is_some() {
            self.publish(&state);

            tracing::debug!(
                conversation_id = %key.0,
                participant_id = %key.1,
                ticket = %ticket,
                "Typing indicator expired"
            );
        }
    }
}

impl fmt::Debug for PresenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceStore")
            .field("scheduler", &self.inner.scheduler)
            .field("notifier", &self.inner.notifier)
            .finish()
    }
}
