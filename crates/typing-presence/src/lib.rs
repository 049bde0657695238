//! # typing-presence
//!
//! In-memory typing indicator tracking with auto-expiry and snapshot fan-out.
//!
//! ## Components
//!
//! - **PresenceStore**: source of truth, one lock serializing every mutation
//! - **ExpiryScheduler**: one cancellable timer per (conversation, participant)
//! - **Notifier**: caches the latest snapshot and posts each new one to observers
//! - **views**: pure projections over a snapshot
//! - **TypingTracker**: the facade producers and UI consumers talk to
//!
//! ## Example
//!
//! ```ignore
//! use typing_presence::TypingTracker;
//! use typing_core::ParticipantId;
//!
//! let tracker = TypingTracker::new(config.typing);
//!
//! let token = tracker.subscribe_typing_names("c1", |names| {
//!     println!("typing: {names:?}");
//! });
//!
//! tracker.start_typing("c1", ParticipantId::new(5), Some("alice".to_string()));
//! tracker.unsubscribe(token);
//! ```

pub mod presence;
pub mod pubsub;
pub mod tracker;
pub mod views;

pub use presence::{ExpiryScheduler, ExpiryTicket, PresenceKey, PresenceStore};
pub use pubsub::{Notifier, SubscriptionToken};
pub use tracker::TypingTracker;
