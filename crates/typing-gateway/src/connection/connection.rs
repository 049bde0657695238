//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and the typing state it owns.

use crate::events::GatewayEventType;
use crate::protocol::{CloseCode, GatewayMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use typing_core::{ConversationId, ParticipantId};
use typing_presence::SubscriptionToken;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connection established, waiting for Identify
    Connecting,
    /// Participant identified
    Connected,
    /// Connection is closed
    Disconnected,
}

/// Identity declared by the client in Identify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: Option<String>,
}

/// Frame queued for the socket writer
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A protocol message
    Message(GatewayMessage),
    /// Close the socket; `None` closes normally
    Close(Option<CloseCode>),
}

/// The connection was torn down before the operation could be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection is disconnected")]
pub struct Disconnected;

/// A single WebSocket connection
pub struct Connection {
    /// Unique session ID
    session_id: String,

    /// Identified participant (None until Identify)
    participant: RwLock<Option<Participant>>,

    /// Current connection state
    state: RwLock<ConnectionState>,

    /// Queue drained by the socket writer
    sender: mpsc::UnboundedSender<Outbound>,

    /// Last sequence number sent
    sequence: AtomicU64,

    /// Last heartbeat received
    last_heartbeat: RwLock<Instant>,

    /// Conversation subscriptions and the tracker tokens backing them
    subscriptions: RwLock<HashMap<ConversationId, SubscriptionToken>>,

    /// Conversations this connection started typing in
    typing_in: RwLock<HashSet<ConversationId>>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(session_id: String, sender: mpsc::UnboundedSender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            participant: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            sequence: AtomicU64::new(0),
            last_heartbeat: RwLock::new(Instant::now()),
            subscriptions: RwLock::new(HashMap::new()),
            typing_in: RwLock::new(HashSet::new()),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the identified participant
    pub async fn participant(&self) -> Option<Participant> {
        self.participant.read().await.clone()
    }

    /// Record the identified participant
    ///
    /// Returns `false` if the connection was already identified.
    pub async fn identify(&self, participant: Participant) -> bool {
        let mut slot = self.participant.write().await;
        if slot.is_some() {
            return false;
        }
        *slot = Some(participant);
        drop(slot);

        let mut state = self.state.write().await;
        if *state == ConnectionState::Connecting {
            *state = ConnectionState::Connected;
        }
        true
    }

    /// Check if the connection has identified
    pub async fn is_identified(&self) -> bool {
        self.participant.read().await.is_some()
    }

    /// Get the current state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Set the connection state
    pub async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    /// Get the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get the current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Record a heartbeat received
    pub async fn record_heartbeat(&self) {
        *self.last_heartbeat.write().await = Instant::now();
    }

    /// Get time since last heartbeat
    pub async fn time_since_heartbeat(&self) -> std::time::Duration {
        self.last_heartbeat.read().await.elapsed()
    }

    /// Check if the connection has been torn down
    pub async fn is_disconnected(&self) -> bool {
        self.state().await == ConnectionState::Disconnected
    }

    /// Remember a conversation subscription
    ///
    /// Returns the token it replaced, if any. Refused once the connection is
    /// `Disconnected`; the caller still owns `token` and must release it.
    pub async fn add_subscription(
        &self,
        conversation_id: ConversationId,
        token: SubscriptionToken,
    ) -> Result<Option<SubscriptionToken>, Disconnected> {
        // Checked under the map lock so cleanup's drain cannot miss the insert
        let mut subscriptions = self.subscriptions.write().await;
        if self.is_disconnected().await {
            return Err(Disconnected);
        }
        Ok(subscriptions.insert(conversation_id, token))
    }

    /// Check if subscribed to a conversation
    pub async fn is_subscribed_to(&self, conversation_id: &ConversationId) -> bool {
        self.subscriptions.read().await.contains_key(conversation_id)
    }

    /// Forget a conversation subscription, returning its token
    pub async fn remove_subscription(
        &self,
        conversation_id: &ConversationId,
    ) -> Option<SubscriptionToken> {
        self.subscriptions.write().await.remove(conversation_id)
    }

    /// Take every subscription token
    pub async fn take_subscriptions(&self) -> Vec<SubscriptionToken> {
        self.subscriptions
            .write()
            .await
            .drain()
            .map(|(_, token)| token)
            .collect()
    }

    /// Remember that this connection is typing in a conversation
    ///
    /// Refused once the connection is `Disconnected`.
    pub async fn mark_typing(&self, conversation_id: ConversationId) -> Result<(), Disconnected> {
        let mut typing_in = self.typing_in.write().await;
        if self.is_disconnected().await {
            return Err(Disconnected);
        }
        typing_in.insert(conversation_id);
        Ok(())
    }

    /// Forget that this connection is typing in a conversation
    pub async fn unmark_typing(&self, conversation_id: &ConversationId) -> bool {
        self.typing_in.write().await.remove(conversation_id)
    }

    /// Take every conversation this connection is typing in
    pub async fn take_typing(&self) -> Vec<ConversationId> {
        self.typing_in.write().await.drain().collect()
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Queue a message for this connection
    pub fn send(&self, message: GatewayMessage) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Message(message))
    }

    /// Queue a dispatch event
    pub fn dispatch(
        &self,
        event: GatewayEventType,
        data: Value,
    ) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.send(GatewayMessage::dispatch(event.as_str(), data))
    }

    /// Ask the writer to close the socket after flushing queued frames
    pub fn close(&self, code: Option<CloseCode>) {
        let _ = self.sender.send(Outbound::Close(code));
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .field("created_at", &self.created_at)
            .finish()
    }
}
