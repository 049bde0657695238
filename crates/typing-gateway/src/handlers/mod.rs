//! Op code handlers
//!
//! Handles incoming WebSocket messages based on their operation code.

mod error;
mod heartbeat;
mod identify;
mod subscribe;
mod typing;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use subscribe::SubscriptionHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, ConversationPayload, GatewayMessage, OpCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        // Validate that this is a client-sendable op code
        if !message.is_valid_client_message() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        if message.op.requires_identify() && !connection.is_identified().await {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Typing op before Identify"
            );
            return Ok(Some(CloseCode::NotIdentified));
        }

        match message.op {
            OpCode::Identify => {
                let payload = message.as_identify().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Identify payload".to_string())
                })?;

                IdentifyHandler::handle(connection, payload).await
            }
            OpCode::Heartbeat => {
                let seq = message.as_heartbeat_seq().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Heartbeat payload".to_string())
                })?;

                HeartbeatHandler::handle(connection, seq).await
            }
            OpCode::TypingStart => {
                TypingHandler::start(state, connection, Self::conversation(&message)?).await
            }
            OpCode::TypingStop => {
                TypingHandler::stop(state, connection, Self::conversation(&message)?).await
            }
            OpCode::Subscribe => {
                SubscriptionHandler::subscribe(state, connection, Self::conversation(&message)?)
                    .await
            }
            OpCode::Unsubscribe => {
                SubscriptionHandler::unsubscribe(state, connection, Self::conversation(&message)?)
                    .await
            }
            // These ops should never reach here due to is_client_op check
            _ => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }

    fn conversation(message: &GatewayMessage) -> HandlerResult<ConversationPayload> {
        message.as_conversation().ok_or_else(|| {
            HandlerError::InvalidPayload(format!("Invalid {} payload", message.op.name()))
        })
    }
}
