//! Value objects - immutable identifiers used as map keys throughout the tracker

mod conversation_id;
mod participant_id;

pub use conversation_id::ConversationId;
pub use participant_id::ParticipantId;
