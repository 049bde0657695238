//! Connection management
//!
//! Tracks WebSocket connections, their identity, and the typing state they own.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState, Disconnected, Outbound, Participant};
pub use manager::ConnectionManager;
