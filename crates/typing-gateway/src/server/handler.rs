//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, ConnectionState, Outbound};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload, OpCode};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use uuid::Uuid;

/// How long the writer may take to flush and close after the session ends
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = Uuid::new_v4().to_string();

    // Create message channel for outgoing frames
    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();

    let connection = state
        .connection_manager()
        .add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (ws_sink, ws_stream) = socket.split();

    // Hello goes out first: it is the first frame queued
    let hello = GatewayMessage::hello(HelloPayload::with_intervals(
        duration_ms(state.heartbeat_interval()),
        duration_ms(state.tracker().timeout()),
    ));
    if connection.send(hello).is_err() {
        tracing::warn!(session_id = %session_id, "Failed to queue Hello message");
    }

    let mut send_task = tokio::spawn(write_loop(ws_sink, rx, connection.clone()));
    let mut recv_task = tokio::spawn(read_loop(state.clone(), connection.clone(), ws_stream));
    let mut heartbeat_task = tokio::spawn(heartbeat_monitor(
        connection.clone(),
        state.heartbeat_interval(),
        state.heartbeat_timeout(),
    ));

    // Wait for any task to complete
    let (close_code, writer_done) = tokio::select! {
        result = &mut recv_task => (result.ok().flatten(), false),
        _ = &mut send_task => {
            tracing::debug!(session_id = %session_id, "Send task ended");
            (None, true)
        }
        result = &mut heartbeat_task => (result.ok().flatten(), false),
    };

    // Both tasks must be gone before cleanup so no handler runs after it
    stop_task(&mut recv_task).await;
    stop_task(&mut heartbeat_task).await;

    if let Some(code) = close_code {
        tracing::debug!(
            session_id = %session_id,
            close_code = %code,
            "Closing connection"
        );
    }

    cleanup_connection(&state, &connection).await;

    if !writer_done {
        connection.close(close_code);
        if timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
            send_task.abort();
        }
    }
}

/// Read client frames until the socket closes or a frame violates the protocol
async fn read_loop(
    state: GatewayState,
    connection: Arc<Connection>,
    mut ws_stream: SplitStream<WebSocket>,
) -> Option<CloseCode> {
    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(close_code) = handle_text_message(&state, &connection, &text).await {
                    return close_code;
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    "Binary messages not supported"
                );
                return Some(CloseCode::DecodeError);
            }
            Ok(Message::Ping(_)) => {
                tracing::trace!(session_id = %connection.session_id(), "Ping received");
                // Pong is handled automatically by axum
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!(session_id = %connection.session_id(), "Pong received");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(session_id = %connection.session_id(), "Client closed connection");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    error = %e,
                    "WebSocket error"
                );
                return None;
            }
        }
    }
    None
}

/// Drain the outgoing queue into the socket
///
/// Dispatch frames get their sequence number here so the numbers follow
/// the order frames actually go out in.
async fn write_loop(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    connection: Arc<Connection>,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Message(mut message) => {
                if message.op == OpCode::Dispatch {
                    message.s = Some(connection.next_sequence());
                }

                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(
                            session_id = %connection.session_id(),
                            error = %e,
                            "Failed to encode outgoing message"
                        );
                        continue;
                    }
                };

                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::warn!(
                        session_id = %connection.session_id(),
                        "Failed to send message to WebSocket"
                    );
                    break;
                }
            }
            Outbound::Close(code) => {
                let frame = code.map(|code| CloseFrame {
                    code: code.as_u16(),
                    reason: Cow::Borrowed(code.description()),
                });
                let _ = ws_sink.send(Message::Close(frame)).await;
                break;
            }
        }
    }

    let _ = ws_sink.close().await;
}

/// Close connections that stop heartbeating
async fn heartbeat_monitor(
    connection: Arc<Connection>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
) -> Option<CloseCode> {
    let mut check_interval = interval(heartbeat_interval / 2);

    loop {
        check_interval.tick().await;

        let time_since = connection.time_since_heartbeat().await;
        if time_since > heartbeat_timeout {
            tracing::warn!(
                session_id = %connection.session_id(),
                time_since_ms = time_since.as_millis(),
                "Connection timed out (no heartbeat)"
            );
            return Some(CloseCode::SessionTimeout);
        }
    }
}

/// Handle a text message from the client
///
/// `Err` ends the session, closing with the given code if there is one.
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), Option<CloseCode>> {
    let message = GatewayMessage::parse_client(text).map_err(|close_code| {
        tracing::debug!(
            session_id = %connection.session_id(),
            close_code = %close_code,
            "Failed to parse message"
        );
        Some(close_code)
    })?;

    tracing::trace!(
        session_id = %connection.session_id(),
        op = %message.op,
        "Received message"
    );

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(Some(close_code)),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Handler error"
            );
            Err(e.to_close_code())
        }
    }
}

/// Release everything a connection owns in the tracker
///
/// Indicators are keyed by participant, not by connection, so this ends the
/// participant's typing in every conversation this connection started it in,
/// even if another of their connections refreshed it since. That matches what
/// a TypingStop from either connection would do. Conversations whose
/// indicator already expired or was cleared are skipped by the tracker and
/// publish nothing.
///
/// Returns how many indicators were actually removed.
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) -> usize {
    connection.set_state(ConnectionState::Disconnected).await;

    let tokens = connection.take_subscriptions().await;
    for token in &tokens {
        state.tracker().unsubscribe(*token);
    }

    let mut stopped = 0;
    if let Some(participant) = connection.participant().await {
        for conversation_id in connection.take_typing().await {
            if state.tracker().stop_typing(conversation_id, participant.id) {
                stopped += 1;
            }
        }
    }

    state
        .connection_manager()
        .remove_connection(connection.session_id());

    tracing::info!(
        session_id = %connection.session_id(),
        subscriptions = tokens.len(),
        stopped_typing = stopped,
        age_ms = connection.age().as_millis(),
        "Connection cleaned up"
    );

    stopped
}

/// Abort a task and wait until it has actually stopped
///
/// A handle that already yielded its output (the `select!` winner) must not
/// be polled again.
async fn stop_task<T>(task: &mut JoinHandle<T>) {
    task.abort();
    if !task.is_finished() {
        let _ = task.await;
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
