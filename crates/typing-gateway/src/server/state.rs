//! Gateway state
//!
//! Application state for the gateway server.

use crate::connection::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use typing_common::AppConfig;
use typing_presence::TypingTracker;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Typing indicator tracker shared by every connection
    tracker: TypingTracker,
    /// Connection manager for WebSocket connections
    connection_manager: Arc<ConnectionManager>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        tracker: TypingTracker,
        connection_manager: Arc<ConnectionManager>,
        config: AppConfig,
    ) -> Self {
        Self {
            tracker,
            connection_manager,
            config: Arc::new(config),
        }
    }

    /// Build the state from configuration
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        let tracker = TypingTracker::new(config.typing);
        Self::new(tracker, ConnectionManager::new_shared(), config)
    }

    /// Get the typing tracker
    pub fn tracker(&self) -> &TypingTracker {
        &self.tracker
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Interval clients are asked to heartbeat at
    pub fn heartbeat_interval(&self) -> Duration {
        self.config.gateway.heartbeat_interval()
    }

    /// Silence after which a connection is considered dead
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_interval() * 2
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("tracker", &self.tracker)
            .field("connection_manager", &self.connection_manager)
            .field("config", &"AppConfig")
            .finish()
    }
}
