//! Staff identity and presence types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Clinical staff role, carried in the authenticated credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Physician,
    Nurse,
    Administrator,
    Dispatcher,
    Technician,
}

impl StaffRole {
    /// Returns the string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Physician => "physician",
            StaffRole::Nurse => "nurse",
            StaffRole::Administrator => "administrator",
            StaffRole::Dispatcher => "dispatcher",
            StaffRole::Technician => "technician",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "physician" => Ok(StaffRole::Physician),
            "nurse" => Ok(StaffRole::Nurse),
            "administrator" => Ok(StaffRole::Administrator),
            "dispatcher" => Ok(StaffRole::Dispatcher),
            "technician" => Ok(StaffRole::Technician),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

/// Observable reachability state of a session.
///
/// `Offline` is forced by the registry on transport close; the other states
/// are set by the session holder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Available,
    Busy,
    Offline,
}

impl PresenceStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Available => "available",
            PresenceStatus::Busy => "busy",
            PresenceStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(PresenceStatus::Available),
            "busy" => Ok(PresenceStatus::Busy),
            "offline" => Ok(PresenceStatus::Offline),
            other => Err(CoreError::invalid_status(other)),
        }
    }
}

/// An authenticated staff identity.
///
/// The id is an opaque user id issued elsewhere; the hub validates the
/// presented credential but never re-derives trust in its claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub role: StaffRole,
    pub department: String,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: StaffRole,
        department: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            department: department.into(),
        }
    }
}

/// Point-in-time presence snapshot entry returned by the session registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSummary {
    pub id: String,
    pub name: String,
    pub role: StaffRole,
    pub department: String,
    pub status: PresenceStatus,
}

impl PresenceSummary {
    pub fn new(identity: &Identity, status: PresenceStatus) -> Self {
        Self {
            id: identity.id.clone(),
            name: identity.name.clone(),
            role: identity.role,
            department: identity.department.clone(),
            status,
        }
    }
}
