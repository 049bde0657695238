//! Gateway message format
//!
//! Defines the structure for all WebSocket messages.

use super::{CloseCode, ConversationPayload, HelloPayload, IdentifyPayload, OpCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message format
///
/// All messages sent over the WebSocket connection follow this format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Client frame before its op code is validated
#[derive(Deserialize)]
struct RawFrame {
    op: u64,
    #[serde(default)]
    d: Option<Value>,
}

impl GatewayMessage {
    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    ///
    /// The sequence number is left empty; the connection writer stamps it
    /// when the frame goes out.
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: None,
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    // === Parsing Client Messages ===

    /// Parse a client frame
    ///
    /// Malformed JSON maps to `DecodeError`, a well-formed frame with an op
    /// code outside the protocol maps to `UnknownOpcode`.
    pub fn parse_client(text: &str) -> Result<Self, CloseCode> {
        let raw: RawFrame = serde_json::from_str(text).map_err(|_| CloseCode::DecodeError)?;
        let op = u8::try_from(raw.op)
            .ok()
            .and_then(OpCode::from_u8)
            .ok_or(CloseCode::UnknownOpcode)?;

        Ok(Self {
            op,
            t: None,
            s: None,
            d: raw.d,
        })
    }

    /// Try to parse as an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as a conversation payload (ops 3-6)
    pub fn as_conversation(&self) -> Option<ConversationPayload> {
        if !matches!(
            self.op,
            OpCode::TypingStart | OpCode::TypingStop | OpCode::Subscribe | OpCode::Unsubscribe
        ) {
            return None;
        }
        self.d.as_ref().and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    // === Utilities ===

    /// Check if this is a valid client message
    #[must_use]
    pub fn is_valid_client_message(&self) -> bool {
        self.op.is_client_op()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
