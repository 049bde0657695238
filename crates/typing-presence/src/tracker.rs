//! Typing tracker facade.
//!
//! Owns one presence store and exposes the operations producers (local input,
//! the realtime gateway) and consumers (typing banners) use.

use std::sync::Arc;
use std::time::Duration;
use typing_common::TypingConfig;
use typing_core::{ConversationId, ParticipantId, Snapshot, TypingIndicator};

use crate::presence::PresenceStore;
use crate::pubsub::SubscriptionToken;
use crate::views;

/// Typing indicator tracker
///
/// Cheap to clone; every clone drives the same store. All methods that arm
/// timers or register observers must be called from within a tokio runtime.
///
/// Conversation ids are taken as `impl Into<ConversationId>` and are not
/// validated here, so `""` is tracked like any other key. Callers handling
/// untrusted input validate with `ConversationId::parse` first, as the
/// gateway's payload decoding does.
#[derive(Debug, Clone)]
pub struct TypingTracker {
    store: PresenceStore,
}

impl TypingTracker {
    /// Create a tracker from configuration
    #[must_use]
    pub fn new(config: TypingConfig) -> Self {
        Self::with_timeout(config.timeout())
    }

    /// Create a tracker with an explicit expiry timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            store: PresenceStore::new(timeout),
        }
    }

    /// Expiry timeout
    pub fn timeout(&self) -> Duration {
        self.store.timeout()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Mark a participant as typing, or refresh their indicator
    pub fn start_typing(
        &self,
        conversation_id: impl Into<ConversationId>,
        participant_id: ParticipantId,
        display_name: Option<String>,
    ) {
        self.store
            .upsert(conversation_id.into(), participant_id, display_name);
    }

    /// Mark a participant as no longer typing
    ///
    /// Returns `false` if they were not typing.
    pub fn stop_typing(
        &self,
        conversation_id: impl Into<ConversationId>,
        participant_id: ParticipantId,
    ) -> bool {
        self.store.remove(&conversation_id.into(), participant_id)
    }

    /// Remove every indicator in a conversation
    pub fn clear_conversation(&self, conversation_id: impl Into<ConversationId>) -> usize {
        self.store.clear_conversation(&conversation_id.into())
    }

    /// Remove every indicator
    pub fn clear_all(&self) -> usize {
        self.store.clear_all()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Observe the full snapshot
    ///
    /// The callback receives the current snapshot right away and then every
    /// change, in mutation order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionToken
    where
        F: FnMut(Arc<Snapshot>) + Send + 'static,
    {
        self.store.notifier().subscribe(callback)
    }

    /// Observe one conversation's indicators
    pub fn subscribe_conversation<F>(
        &self,
        conversation_id: impl Into<ConversationId>,
        callback: F,
    ) -> SubscriptionToken
    where
        F: FnMut(Vec<TypingIndicator>) + Send + 'static,
    {
        self.subscribe_projection(conversation_id.into(), views::list, callback)
    }

    /// Observe whether anyone is typing in a conversation
    pub fn subscribe_any_typing<F>(
        &self,
        conversation_id: impl Into<ConversationId>,
        callback: F,
    ) -> SubscriptionToken
    where
        F: FnMut(bool) + Send + 'static,
    {
        self.subscribe_projection(conversation_id.into(), views::any_typing, callback)
    }

    /// Observe the banner labels of a conversation
    pub fn subscribe_typing_names<F>(
        &self,
        conversation_id: impl Into<ConversationId>,
        callback: F,
    ) -> SubscriptionToken
    where
        F: FnMut(Vec<String>) + Send + 'static,
    {
        self.subscribe_projection(
            conversation_id.into(),
            views::typing_display_names,
            callback,
        )
    }

    /// Stop a subscription
    ///
    /// Returns `false` if the token is unknown or was already released.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.store.notifier().unsubscribe(token)
    }

    /// Deliver `project(snapshot)` initially and whenever it changes
    fn subscribe_projection<T, P, F>(
        &self,
        conversation_id: ConversationId,
        project: P,
        mut callback: F,
    ) -> SubscriptionToken
    where
        T: Clone + PartialEq + Send + 'static,
        P: Fn(&Snapshot, &ConversationId) -> T + Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let mut last: Option<T> = None;

        self.store.notifier().subscribe(move |snapshot| {
            let value = project(&snapshot, &conversation_id);
            if last.as_ref() == Some(&value) {
                return;
            }
            last = Some(value.clone());
            callback(value);
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Latest snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    /// Indicators of a conversation in store order
    pub fn list(&self, conversation_id: impl Into<ConversationId>) -> Vec<TypingIndicator> {
        views::list(&self.snapshot(), &conversation_id.into())
    }

    /// Whether anyone is typing in a conversation
    pub fn any_typing(&self, conversation_id: impl Into<ConversationId>) -> bool {
        views::any_typing(&self.snapshot(), &conversation_id.into())
    }

    /// Banner labels of a conversation
    pub fn typing_display_names(&self, conversation_id: impl Into<ConversationId>) -> Vec<String> {
        views::typing_display_names(&self.snapshot(), &conversation_id.into())
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.store.notifier().observer_count()
    }

    /// Number of armed expiry timers
    pub fn pending_expiries(&self) -> usize {
        self.store.pending_expiries()
    }
}
