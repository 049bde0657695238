//! Snapshot publish/subscribe.
//!
//! Fans each new snapshot out to observers without running observer code on
//! the mutating thread.

mod notifier;

pub use notifier::{Notifier, SubscriptionToken};
