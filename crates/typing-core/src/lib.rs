//! # typing-core
//!
//! Domain layer for the typing presence tracker: identifiers, typing indicators,
//! and the immutable snapshot handed to observers.
//! This crate has zero dependencies on infrastructure (runtime, transport, etc.).

pub mod entities;
pub mod error;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Snapshot, TypingIndicator};
pub use error::IdParseError;
pub use value_objects::{ConversationId, ParticipantId};
