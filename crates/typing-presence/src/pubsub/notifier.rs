//! Snapshot notifier.
//!
//! Keeps the most recently published snapshot and a registry of observers.
//! Each observer owns an unbounded queue drained by its own task, so
//! publishing only enqueues and never runs observer code.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use typing_core::Snapshot;

/// Handle returned by `subscribe`, used to stop delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Raw token value
    #[inline]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct ObserverSlot {
    sender: mpsc::UnboundedSender<Arc<Snapshot>>,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ObserverSlot {
    fn release(self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }
}

struct NotifierState {
    latest: Arc<Snapshot>,
    observers: HashMap<SubscriptionToken, ObserverSlot>,
}

/// Publishes snapshots to registered observers
///
/// Delivery after `unsubscribe`: queued snapshots are discarded, but the
/// observer task checks its flag before each callback, so an `unsubscribe`
/// landing between that check and the call lets at most one additional
/// delivery start after it returns. An invocation already running is
/// allowed to finish.
pub struct Notifier {
    state: Mutex<NotifierState>,
    next_token: AtomicU64,
}

impl Notifier {
    /// Create a notifier whose cached snapshot is empty
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NotifierState {
                latest: Arc::new(Snapshot::new()),
                observers: HashMap::new(),
            }),
            next_token: AtomicU64::new(0),
        }
    }

    /// Register an observer
    ///
    /// The current snapshot is queued for the observer immediately, followed
    /// by every later snapshot in publish order. Must be called from within a
    /// tokio runtime; the callback runs on a dedicated task.
    pub fn subscribe<F>(&self, mut callback: F) -> SubscriptionToken
    where
        F: FnMut(Arc<Snapshot>) + Send + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, mut receiver) = mpsc::unbounded_channel::<Arc<Snapshot>>();
        let active = Arc::new(AtomicBool::new(true));

        let running = Arc::clone(&active);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = receiver.recv().await {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                callback(snapshot);
            }
        });

        let mut state = self.state.lock();
        // The receiver is alive until the task ends, which cannot happen
        // before the first message is taken.
        let _ = sender.send(Arc::clone(&state.latest));
        state.observers.insert(
            token,
            ObserverSlot {
                sender,
                active,
                task,
            },
        );

        tracing::debug!(
            token = %token,
            observers = state.observers.len(),
            "Observer subscribed"
        );

        token
    }

    /// Stop delivering to an observer
    ///
    /// Returns `false` if the token was not registered (already unsubscribed
    /// or never issued by this notifier).
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let slot = self.state.lock().observers.remove(&token);

        match slot {
            Some(slot) => {
                slot.release();
                tracing::debug!(token = %token, "Observer unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Replace the cached snapshot and queue it for every observer
    pub(crate) fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut state = self.state.lock();
        state.latest = Arc::clone(&snapshot);

        // A closed queue means the observer task died (its callback panicked)
        state.observers.retain(|token, slot| {
            if slot.sender.send(Arc::clone(&snapshot)).is_ok() {
                true
            } else {
                tracing::warn!(token = %token, "Dropping observer with closed queue");
                slot.active.store(false, Ordering::Release);
                false
            }
        });

        tracing::trace!(
            observers = state.observers.len(),
            conversations = snapshot.conversation_count(),
            "Snapshot published"
        );
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.lock().latest)
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        for (_, slot) in self.state.get_mut().observers.drain() {
            slot.release();
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}
