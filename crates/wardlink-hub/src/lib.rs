//! The Wardlink hub: presence, routing, and alert broadcasting.
//!
//! This crate is transport-independent. The [`SessionRegistry`] is the single
//! owner of handle-to-identity bindings; the [`MessageRouter`] and
//! [`AlertManager`] only read handles through it. Inbound traffic enters
//! through [`Hub::dispatch`], an explicit table from event kind to handler,
//! so the transport layer can be swapped without touching triage or routing
//! logic.

pub mod alerts;
pub mod error;
pub mod events;
pub mod hub;
pub mod router;
pub mod session;

pub use alerts::AlertManager;
pub use error::HubError;
pub use events::{ClientEvent, ErrorCode, ServerEvent};
pub use hub::{Hub, SessionContext};
pub use router::MessageRouter;
pub use session::{SessionHandle, SessionRegistry};
