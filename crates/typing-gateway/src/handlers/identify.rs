//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, Participant};
use crate::events::{GatewayEventType, ReadyEvent};
use crate::protocol::{CloseCode, IdentifyPayload};
use std::sync::Arc;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Handle an Identify message
    ///
    /// The declared participant is trusted; authentication happens upstream
    /// of the gateway.
    pub async fn handle(
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let participant = Participant {
            id: payload.participant_id,
            display_name: payload.normalized_display_name(),
        };

        if !connection.identify(participant.clone()).await {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Client sent Identify while already identified"
            );
            return Ok(Some(CloseCode::AlreadyIdentified));
        }

        let ready = ReadyEvent {
            session_id: connection.session_id().to_string(),
            participant_id: participant.id,
        };

        connection
            .dispatch(GatewayEventType::Ready, serde_json::to_value(&ready)?)
            .map_err(|_| HandlerError::ConnectionClosed)?;

        tracing::info!(
            session_id = %connection.session_id(),
            participant_id = %participant.id,
            display_name = ?participant.display_name,
            "Client identified"
        );

        Ok(None)
    }
}
