//! Wire vocabulary exchanged between clients and the hub.
//!
//! Events are adjacently tagged (`event` / `data`) with kebab-case event
//! names, e.g. `{"event":"send-message","data":{"to":"u-2","content":"hi",
//! "priority":"normal"}}`. The enums are the dispatch surface: adding an
//! event means adding a variant here and an arm in [`crate::hub::Hub`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wardlink_core::{Alert, Identity, Message, PresenceStatus, PresenceSummary, Priority, VitalSigns};

fn default_message_priority() -> Priority {
    Priority::Normal
}

/// Events a client may send to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Connection handshake; must be the first event on a connection.
    Authenticate { token: String },
    /// Change the holder's presence status.
    UpdateStatus { status: PresenceStatus },
    /// Direct message to one recipient.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        to: String,
        content: String,
        #[serde(default = "default_message_priority")]
        priority: Priority,
    },
    TypingStart { to: String },
    TypingStop { to: String },
    /// Emergency broadcast to every admitted session.
    TriggerAlert {
        #[serde(rename = "type")]
        alert_type: String,
        location: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    AcknowledgeAlert { alert_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ResolveAlert { alert_id: Uuid },
    /// Bedside/service call to be triaged and forwarded to the event bus.
    #[serde(rename_all = "camelCase")]
    CreateTask {
        patient_ref: String,
        urgency_tag: String,
        #[serde(default)]
        vitals: VitalSigns,
    },
    ListOnlineIdentities,
    ListActiveAlerts,
}

/// Error codes carried by the `error` server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    MalformedEvent,
    NotFound,
    NotAuthenticated,
}

/// Events the hub pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Admission acknowledgement with the presence snapshot.
    Authenticated {
        identity: Identity,
        online: Vec<PresenceSummary>,
    },
    /// Credential rejected; the connection is not admitted.
    AuthError { message: String },

    IdentityOnline(PresenceSummary),
    IdentityOffline { id: String },
    StatusChanged { id: String, status: PresenceStatus },

    MessageReceived(Message),
    /// Sent to the sender, only if the recipient was reachable.
    #[serde(rename_all = "camelCase")]
    MessageDelivered { message_id: Uuid, to: String },
    #[serde(rename_all = "camelCase")]
    TypingIndicator { from: String, is_typing: bool },

    AlertBroadcast(Alert),
    #[serde(rename_all = "camelCase")]
    AlertAcknowledged {
        alert_id: Uuid,
        by: String,
        acknowledged_by: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    AlertResolved { alert_id: Uuid },

    OnlineIdentities { identities: Vec<PresenceSummary> },
    ActiveAlerts { alerts: Vec<Alert> },

    /// Submission acknowledgement to the task originator.
    TaskCreated { id: Uuid, priority: Priority },

    /// The identity re-authenticated elsewhere; this connection's handle is
    /// no longer live.
    SessionReplaced,

    /// Recoverable request error; the connection stays open.
    Error { code: ErrorCode, message: String },
}
