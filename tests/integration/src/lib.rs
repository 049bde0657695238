//! Integration test utilities for the typing gateway
//!
//! This crate provides helpers for running end-to-end tests against
//! the admin routes and the WebSocket gateway.

pub mod helpers;

pub use helpers::*;
