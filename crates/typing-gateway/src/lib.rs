//! # typing-gateway
//!
//! WebSocket gateway feeding the typing tracker and fanning its updates out
//! to subscribed clients, plus a small admin HTTP surface.

pub mod connection;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, run, serve, GatewayState};
