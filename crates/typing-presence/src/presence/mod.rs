//! Presence storage module.
//!
//! Holds the typing indicators and the timers that expire them.

mod expiry;
mod store;

pub use expiry::{ExpiryScheduler, ExpiryTicket, PresenceKey};
pub use store::PresenceStore;
