//! Typing handlers (ops 3 and 4)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, ConversationPayload};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles TypingStart and TypingStop messages
pub struct TypingHandler;

impl TypingHandler {
    /// Start or refresh typing for the connection's participant
    pub async fn start(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ConversationPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let participant = connection
            .participant()
            .await
            .ok_or(HandlerError::NotIdentified)?;
        let conversation_id = payload.conversation_id;

        if connection.is_disconnected().await {
            return Err(HandlerError::ConnectionClosed);
        }

        state.tracker().start_typing(
            conversation_id.clone(),
            participant.id,
            participant.display_name,
        );
        if connection.mark_typing(conversation_id.clone()).await.is_err() {
            // Cleanup already ran its stop pass; undo the start ourselves
            state.tracker().stop_typing(conversation_id, participant.id);
            return Err(HandlerError::ConnectionClosed);
        }

        tracing::trace!(
            session_id = %connection.session_id(),
            conversation_id = %conversation_id,
            participant_id = %participant.id,
            "Typing started"
        );

        Ok(None)
    }

    /// Stop typing for the connection's participant
    pub async fn stop(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: ConversationPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let participant = connection
            .participant()
            .await
            .ok_or(HandlerError::NotIdentified)?;
        let conversation_id = payload.conversation_id;

        let removed = state
            .tracker()
            .stop_typing(conversation_id.clone(), participant.id);
        connection.unmark_typing(&conversation_id).await;

        tracing::trace!(
            session_id = %connection.session_id(),
            conversation_id = %conversation_id,
            participant_id = %participant.id,
            removed,
            "Typing stopped"
        );

        Ok(None)
    }
}
