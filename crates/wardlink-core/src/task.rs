//! Triaged task records destined for the event bus.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::triage::{Priority, VitalSigns, classify};

/// A triaged unit of work (bedside or service call) published to the
/// external event bus.
///
/// The resolved priority tier is a pure function of the declared urgency tag
/// and vitals: identical inputs always resolve to the identical tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "patientRef")]
    pub subject: String,
    #[serde(rename = "urgencyTag")]
    pub urgency_tag: String,
    #[serde(default, skip_serializing_if = "VitalSigns::is_empty")]
    pub vitals: VitalSigns,
    pub priority: Priority,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Task {
    /// Create a task, resolving its tier through the triage engine.
    pub fn new(subject: impl Into<String>, urgency_tag: impl Into<String>, vitals: VitalSigns) -> Self {
        let urgency_tag = urgency_tag.into();
        let priority = classify(&urgency_tag, &vitals);
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            urgency_tag,
            vitals,
            priority,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
