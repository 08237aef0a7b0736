//! The relay core: connection registry, per-connection ingest loops,
//! and the single-consumer broadcast dispatcher, plus the axum
//! HTTP/WebSocket surface that feeds them.
//!
//! Data flow: upgrade request → identity gate → registry admit →
//! ingest loop → {broadcast queue → dispatcher → privileged
//! connections} and {persistence, fire-and-forget}.

pub mod connection;
pub mod dispatcher;
pub mod persist;
pub mod registry;
pub mod server;

pub use registry::ConnectionRegistry;
pub use server::{start, AppState, ServerConfig, ServerHandle};
