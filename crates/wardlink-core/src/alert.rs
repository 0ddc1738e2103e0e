//! Broadcast alert records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::triage::Priority;

/// A broadcast clinical event with acknowledgement tracking.
///
/// The acknowledgement set grows monotonically and never contains
/// duplicates. An alert with a resolution marker is closed: it stays
/// readable but accepts no further state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub location: String,
    pub message: String,
    pub priority: Priority,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    #[serde(rename = "acknowledgedBy", default)]
    pub acknowledged_by: Vec<String>,
    #[serde(
        rename = "resolvedAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub resolved_at: Option<OffsetDateTime>,
}

impl Alert {
    pub fn new(
        alert_type: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
        initiator: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type: alert_type.into(),
            location: location.into(),
            message: message.into(),
            priority,
            created_at: OffsetDateTime::now_utc(),
            initiator,
            acknowledged_by: Vec::new(),
            resolved_at: None,
        }
    }

    /// Add an acknowledging identity.
    ///
    /// Returns `true` when the set grew. Re-acknowledging and acknowledging
    /// a closed alert both leave the set untouched.
    pub fn acknowledge(&mut self, identity_id: &str) -> bool {
        if self.is_resolved() || self.acknowledged_by.iter().any(|id| id == identity_id) {
            return false;
        }
        self.acknowledged_by.push(identity_id.to_string());
        true
    }

    /// Set the resolution marker.
    ///
    /// Idempotent: returns `true` only on the open → closed transition.
    pub fn resolve(&mut self) -> bool {
        if self.resolved_at.is_some() {
            return false;
        }
        self.resolved_at = Some(OffsetDateTime::now_utc());
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
