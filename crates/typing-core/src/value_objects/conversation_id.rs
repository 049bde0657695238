//! Conversation identifier

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use crate::error::IdParseError;

/// Opaque identifier of a multi-party chat context
///
/// Backed by an `Arc<str>` so the id can be cloned into timer tasks and
/// snapshot keys without reallocating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConversationId(Arc<str>);

impl ConversationId {
    /// Create a conversation id, rejecting the empty string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        if s.is_empty() {
            return Err(IdParseError::EmptyConversationId);
        }
        Ok(Self(Arc::from(s)))
    }

    /// Get the id as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Unchecked conversions: the empty string becomes an ordinary id. Untrusted
// input goes through `parse`.
impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::str::FromStr for ConversationId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for ConversationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
