//! Domain entities

mod snapshot;
mod typing_indicator;

pub use snapshot::Snapshot;
pub use typing_indicator::TypingIndicator;
