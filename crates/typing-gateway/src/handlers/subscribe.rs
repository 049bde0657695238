//! Subscription handlers (ops 5 and 6)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::events::{GatewayEventType, TypingUpdateEvent};
use crate::protocol::{CloseCode, ConversationPayload};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles Subscribe and Unsubscribe messages
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    /// Start forwarding a conversation's typing updates to the connection
    ///
    /// The current indicator list is dispatched right away. Subscribing twice
    /// to the same conversation is a no-op.
    pub async fn subscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ConversationPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let conversation_id = payload.conversation_id;

        if connection.is_disconnected().await {
            return Err(HandlerError::ConnectionClosed);
        }

        if connection.is_subscribed_to(&conversation_id).await {
            tracing::debug!(
                session_id = %connection.session_id(),
                conversation_id = %conversation_id,
                "Already subscribed"
            );
            return Ok(None);
        }

        let target = Arc::downgrade(connection);
        let forwarded = conversation_id.clone();
        let token = state
            .tracker()
            .subscribe_conversation(conversation_id.clone(), move |typing| {
                let Some(connection) = target.upgrade() else {
                    return;
                };

                let event = TypingUpdateEvent {
                    conversation_id: forwarded.clone(),
                    typing,
                };
                match serde_json::to_value(&event) {
                    Ok(data) => {
                        let _ = connection.dispatch(GatewayEventType::TypingUpdate, data);
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %connection.session_id(),
                            error = %e,
                            "Failed to encode TYPING_UPDATE"
                        );
                    }
                }
            });

        match connection
            .add_subscription(conversation_id.clone(), token)
            .await
        {
            Ok(Some(previous)) => {
                state.tracker().unsubscribe(previous);
            }
            Ok(None) => {}
            Err(_) => {
                // Cleanup already drained the subscriptions; nobody else will release this one
                state.tracker().unsubscribe(token);
                return Err(HandlerError::ConnectionClosed);
            }
        }

        tracing::debug!(
            session_id = %connection.session_id(),
            conversation_id = %conversation_id,
            token = %token,
            "Subscribed to conversation"
        );

        Ok(None)
    }

    /// Stop forwarding a conversation's typing updates
    pub async fn unsubscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ConversationPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let conversation_id = payload.conversation_id;

        if let Some(token) = connection.remove_subscription(&conversation_id).await {
            state.tracker().unsubscribe(token);

            tracing::debug!(
                session_id = %connection.session_id(),
                conversation_id = %conversation_id,
                token = %token,
                "Unsubscribed from conversation"
            );
        }

        Ok(None)
    }
}
