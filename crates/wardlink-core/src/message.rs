//! Direct message records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::triage::Priority;

/// An immutable record of a direct staff-to-staff communication.
///
/// A message is created exactly once per send request, whether or not the
/// recipient is reachable. The delivery marker is set at most once, only
/// when the recipient's session had a live handle at push time; there is no
/// retry and no queue for unreachable recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(rename = "to")]
    pub recipient: String,
    #[serde(rename = "content")]
    pub body: String,
    pub priority: Priority,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        rename = "deliveredAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub delivered_at: Option<OffsetDateTime>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
            priority,
            created_at: OffsetDateTime::now_utc(),
            delivered_at: None,
        }
    }

    /// Record the successful push to a live recipient handle.
    ///
    /// Idempotent: the marker keeps its first value.
    pub fn mark_delivered(&mut self) {
        if self.delivered_at.is_none() {
            self.delivered_at = Some(OffsetDateTime::now_utc());
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}
