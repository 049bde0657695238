//! Participant identifier
//!
//! A 64-bit user id. Serialized as a string on the wire (JavaScript BigInt
//! safety) and accepted as either a string or an integer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::IdParseError;

/// Opaque identifier of a user taking part in conversations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ParticipantId(i64);

impl ParticipantId {
    /// Create a new participant id from a raw value
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.trim()
            .parse::<i64>()
            .map(ParticipantId)
            .map_err(|_| IdParseError::InvalidParticipantId(s.to_string()))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ParticipantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ParticipantId> for i64 {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParticipantId::parse(s)
    }
}

impl Serialize for ParticipantId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ParticipantIdVisitor;

        impl Visitor<'_> for ParticipantIdVisitor {
            type Value = ParticipantId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a participant id")
            }

            fn visit_i64<E>(self, value: i64) -> Result<ParticipantId, E>
            where
                E: de::Error,
            {
                Ok(ParticipantId(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<ParticipantId, E>
            where
                E: de::Error,
            {
                i64::try_from(value)
                    .map(ParticipantId)
                    .map_err(|_| de::Error::custom("participant id out of range"))
            }

            fn visit_str<E>(self, value: &str) -> Result<ParticipantId, E>
            where
                E: de::Error,
            {
                ParticipantId::parse(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(ParticipantIdVisitor)
    }
}
