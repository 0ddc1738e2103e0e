//! Wardlink server: WebSocket transport and HTTP surface over the hub.
//!
//! This layer parses frames, runs the connect handshake, and feeds the
//! hub's dispatch table; all presence, routing, triage, and broadcast
//! semantics live in `wardlink-hub`.

pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod ws;

use std::sync::Arc;

use wardlink_auth::CredentialValidator;
use wardlink_hub::Hub;

pub use config::AppConfig;
pub use server::{ServerBuilder, WardlinkServer, build_app};

/// Shared state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub validator: Arc<CredentialValidator>,
    /// Interval between WebSocket heartbeat pings.
    pub heartbeat_secs: u64,
}
