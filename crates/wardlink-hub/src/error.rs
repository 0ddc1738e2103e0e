use thiserror::Error;
use uuid::Uuid;

/// Hub operation errors.
///
/// Never fatal: a missing alert is reported back to the caller as a
/// `not-found` error event with the connection left open. (An offline
/// recipient is not an error at all; routing stores the message and
/// reports zero deliveries.)
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),
}
