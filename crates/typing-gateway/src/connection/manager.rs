//! Connection manager
//!
//! Manages all active WebSocket connections using DashMap for thread-safe access.

use super::{Connection, Outbound};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
///
/// Uses `DashMap` for concurrent access to connection state.
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(
        &self,
        session_id: String,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection
    pub fn remove_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(session_id).map(|(_, connection)| connection);

        if removed.is_some() {
            tracing::debug!(session_id = %session_id, "Connection removed");
        }

        removed
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .finish()
    }
}
