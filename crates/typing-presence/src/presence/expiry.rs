//! Expiry timers for typing indicators.
//!
//! Every (conversation, participant) pair has at most one pending timer.
//! Re-arming replaces and aborts the previous one, and each timer carries a
//! ticket so a timer that already woke up can tell it has been superseded.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use typing_core::{ConversationId, ParticipantId};

/// Key of a single typing session
pub type PresenceKey = (ConversationId, ParticipantId);

/// Identifies one arming of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpiryTicket(pub(crate) u64);

impl fmt::Display for ExpiryTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct PendingExpiry {
    ticket: ExpiryTicket,
    handle: JoinHandle<()>,
}

/// One-shot, cancellable auto-removal timers keyed by presence pair
pub struct ExpiryScheduler {
    delay: Duration,
    pending: DashMap<PresenceKey, PendingExpiry>,
    next_ticket: AtomicU64,
}

impl ExpiryScheduler {
    /// Create a scheduler whose timers fire after `delay`
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: DashMap::new(),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Quiet period before a timer fires
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending timer for `key` and arm a fresh one
    ///
    /// `on_fire` runs on a runtime task once the delay elapses, receiving the
    /// ticket of this arming. Must be called from within a tokio runtime.
    pub fn reschedule<F>(&self, key: PresenceKey, on_fire: F) -> ExpiryTicket
    where
        F: FnOnce(ExpiryTicket) + Send + 'static,
    {
        let ticket = ExpiryTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1);
        let deadline = Instant::now() + self.delay;

        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            on_fire(ticket);
        });

        if let Some(previous) = self.pending.insert(key, PendingExpiry { ticket, handle }) {
            previous.handle.abort();
            tracing::trace!(
                replaced = %previous.ticket,
                ticket = %ticket,
                "Expiry timer rescheduled"
            );
        }

        ticket
    }

    /// Cancel the pending timer for `key`, if any
    pub fn cancel(&self, key: &PresenceKey) -> bool {
        match self.pending.remove(key) {
            Some((_, pending)) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer belonging to a conversation
    pub fn cancel_conversation(&self, conversation_id: &ConversationId) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|(conversation, _), pending| {
            if conversation == conversation_id {
                pending.handle.abort();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        cancelled
    }

    /// Cancel every pending timer
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|_, pending| {
            pending.handle.abort();
            cancelled += 1;
            false
        });
        cancelled
    }

    /// Claim a fired timer
    ///
    /// Returns `true` and forgets the timer only if `ticket` is still the
    /// current arming for `key`. A superseded or cancelled timer gets `false`.
    pub fn claim(&self, key: &PresenceKey, ticket: ExpiryTicket) -> bool {
        self.pending
            .remove_if(key, |_, pending| pending.ticket == ticket)
            .is_some()
    }

    /// Check whether a timer is armed for `key`
    pub fn is_pending(&self, key: &PresenceKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of armed timers
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        for entry in &self.pending {
            entry.handle.abort();
        }
    }
}

impl fmt::Debug for ExpiryScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiryScheduler")
            .field("delay", &self.delay)
            .field("pending", &self.pending.len())
            .finish()
    }
}
