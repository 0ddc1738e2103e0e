//! Session registry: live connection-to-identity bindings and presence.
//!
//! The registry is the single owner of handle-to-identity bindings and the
//! single source of truth for "is identity X reachable, and through which
//! handle". Mutation happens under one `parking_lot` lock; handles are
//! cloned out of the lock before any push, so the lock is never held across
//! a suspension point.
//!
//! One live handle per identity: re-authenticating supersedes the previous
//! handle (last write wins). The superseded connection is told via
//! `session-replaced`, and its late removal is guarded by connection id so
//! it cannot tear down its successor.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use wardlink_core::{Identity, PresenceStatus, PresenceSummary};

use crate::events::ServerEvent;

/// Handle for pushing server events to one connected client.
///
/// Cloneable; all clones feed the same bounded channel, so pushes to a
/// single recipient stay in invocation order. A push on a handle whose
/// connection ended fails and is treated as "unreachable".
#[derive(Debug, Clone)]
pub struct SessionHandle {
    conn_id: Uuid,
    sender: mpsc::Sender<ServerEvent>,
}

impl SessionHandle {
    pub fn new(sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            sender,
        }
    }

    /// Identifies the connection this handle belongs to, not the identity.
    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Push an event to the client. Returns `false` if the connection is
    /// gone; callers treat that as the normal unreachable branch.
    pub async fn push(&self, event: ServerEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// One authenticated identity's registry entry.
///
/// The entry outlives its transport: on disconnect the handle is cleared
/// and the status forced offline, keeping presence history queryable.
struct Session {
    identity: Identity,
    status: PresenceStatus,
    handle: Option<SessionHandle>,
}

/// Registry of admitted sessions, keyed by identity id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an authenticated connection.
    ///
    /// Binds the handle, marks the identity available, and fans out
    /// `identity-online` to every other admitted session. Any prior handle
    /// for the same identity is superseded: it receives `session-replaced`
    /// and is returned so the transport can retire it.
    pub async fn admit(&self, identity: Identity, handle: SessionHandle) -> Option<SessionHandle> {
        let id = identity.id.clone();
        let summary = PresenceSummary::new(&identity, PresenceStatus::Available);

        let (superseded, peers) = {
            let mut sessions = self.sessions.write();
            let superseded = match sessions.get_mut(&id) {
                Some(session) => {
                    // Credential claims may have changed since last admission.
                    session.identity = identity;
                    session.status = PresenceStatus::Available;
                    session.handle.replace(handle)
                }
                None => {
                    sessions.insert(
                        id.clone(),
                        Session {
                            identity,
                            status: PresenceStatus::Available,
                            handle: Some(handle),
                        },
                    );
                    None
                }
            };
            (superseded, peer_handles(&sessions, &id))
        };

        if let Some(ref old) = superseded {
            tracing::info!(identity_id = %id, "Session superseded by a newer connection");
            old.push(ServerEvent::SessionReplaced).await;
        }

        tracing::debug!(identity_id = %id, "Session admitted");
        fanout(&peers, ServerEvent::IdentityOnline(summary)).await;
        superseded
    }

    /// Update an identity's presence status.
    ///
    /// Idempotent: setting the current status again changes nothing and
    /// fans out nothing. On a change, `status-changed` goes to every
    /// admitted session.
    pub async fn update_status(&self, identity_id: &str, status: PresenceStatus) {
        let recipients = {
            let mut sessions = self.sessions.write();
            match sessions.get_mut(identity_id) {
                Some(session) if session.status != status => {
                    session.status = status;
                    all_handles(&sessions)
                }
                _ => return,
            }
        };

        fanout(
            &recipients,
            ServerEvent::StatusChanged {
                id: identity_id.to_string(),
                status,
            },
        )
        .await;
    }

    /// Transport-close path: clear the handle, force status offline, and
    /// fan out `identity-offline`.
    ///
    /// Only the connection that owns the live handle may remove it, so a
    /// superseded connection's late removal is a no-op. Idempotent.
    pub async fn remove(&self, identity_id: &str, conn_id: Uuid) {
        let peers = {
            let mut sessions = self.sessions.write();
            match sessions.get_mut(identity_id) {
                Some(session)
                    if session.handle.as_ref().is_some_and(|h| h.conn_id() == conn_id) =>
                {
                    session.handle = None;
                    session.status = PresenceStatus::Offline;
                    peer_handles(&sessions, identity_id)
                }
                _ => return,
            }
        };

        tracing::debug!(identity_id = %identity_id, "Session removed");
        fanout(
            &peers,
            ServerEvent::IdentityOffline {
                id: identity_id.to_string(),
            },
        )
        .await;
    }

    /// Point-in-time presence snapshot of reachable identities, ordered by
    /// display name. Not a live view; callers re-query for freshness.
    pub fn list_online(&self) -> Vec<PresenceSummary> {
        let sessions = self.sessions.read();
        let mut online: Vec<PresenceSummary> = sessions
            .values()
            .filter(|s| s.handle.is_some())
            .map(|s| PresenceSummary::new(&s.identity, s.status))
            .collect();
        online.sort_by(|a, b| a.name.cmp(&b.name));
        online
    }

    /// Find the push target for an identity.
    ///
    /// `None` means offline or never admitted; that is an expected branch,
    /// not an error.
    pub fn resolve(&self, identity_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read();
        sessions.get(identity_id).and_then(|s| s.handle.clone())
    }

    /// Snapshot of every live handle, for broadcast fanout.
    pub fn online_handles(&self) -> Vec<SessionHandle> {
        let sessions = self.sessions.read();
        sessions.values().filter_map(|s| s.handle.clone()).collect()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        let sessions = self.sessions.read();
        sessions.values().filter(|s| s.handle.is_some()).count()
    }

}

fn peer_handles(sessions: &HashMap<String, Session>, except_id: &str) -> Vec<SessionHandle> {
    sessions
        .iter()
        .filter(|(id, _)| id.as_str() != except_id)
        .filter_map(|(_, s)| s.handle.clone())
        .collect()
}

fn all_handles(sessions: &HashMap<String, Session>) -> Vec<SessionHandle> {
    sessions.values().filter_map(|s| s.handle.clone()).collect()
}

/// Push an event to a snapshot of handles, dropping unreachable ones.
async fn fanout(handles: &[SessionHandle], event: ServerEvent) {
    for handle in handles {
        if !handle.push(event.clone()).await {
            tracing::debug!(conn_id = %handle.conn_id(), "Dropped event for closed connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardlink_core::StaffRole;

    fn identity(id: &str, name: &str) -> Identity {
        Identity::new(id, name, StaffRole::Nurse, "ICU")
    }

    fn connection() -> (SessionHandle, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(32);
        (SessionHandle::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_admit_makes_identity_resolvable() {
        let registry = SessionRegistry::new();
        let (handle, _rx) = connection();
        registry.admit(identity("u-1", "Dana"), handle).await;

        assert!(registry.resolve("u-1").is_some());
        assert!(registry.resolve("u-2").is_none());
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_admit_notifies_existing_sessions_only() {
        let registry = SessionRegistry::new();
        let (a, mut a_rx) = connection();
        let (b, mut b_rx) = connection();

        registry.admit(identity("u-a", "Avery"), a).await;
        registry.admit(identity("u-b", "Blake"), b).await;

        let a_events = drain(&mut a_rx);
        assert!(matches!(
            a_events.as_slice(),
            [ServerEvent::IdentityOnline(summary)] if summary.id == "u-b"
        ));
        // The newcomer learns about peers from the admission snapshot, not
        // from a fanout event.
        assert!(drain(&mut b_rx).is_empty());
    }

    #[tokio::test]
    async fn test_second_admission_supersedes_first_handle() {
        let registry = SessionRegistry::new();
        let (first, mut first_rx) = connection();
        let first_conn = first.conn_id();
        let (second, _second_rx) = connection();

        registry.admit(identity("u-1", "Dana"), first).await;
        let superseded = registry.admit(identity("u-1", "Dana"), second.clone()).await;

        assert_eq!(superseded.unwrap().conn_id(), first_conn);
        assert!(drain(&mut first_rx).contains(&ServerEvent::SessionReplaced));
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(
            registry.resolve("u-1").unwrap().conn_id(),
            second.conn_id()
        );
    }

    #[tokio::test]
    async fn test_superseded_connection_cannot_remove_successor() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = connection();
        let first_conn = first.conn_id();
        let (second, _rx2) = connection();

        registry.admit(identity("u-1", "Dana"), first).await;
        registry.admit(identity("u-1", "Dana"), second).await;

        // The superseded connection's teardown arrives late.
        registry.remove("u-1", first_conn).await;
        assert!(registry.resolve("u-1").is_some());
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_fans_out_offline() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = connection();
        let a_conn = a.conn_id();
        let (b, mut b_rx) = connection();

        registry.admit(identity("u-a", "Avery"), a).await;
        registry.admit(identity("u-b", "Blake"), b).await;
        drain(&mut b_rx);

        registry.remove("u-a", a_conn).await;
        registry.remove("u-a", a_conn).await;

        assert!(registry.resolve("u-a").is_none());
        let events = drain(&mut b_rx);
        assert_eq!(
            events,
            vec![ServerEvent::IdentityOffline {
                id: "u-a".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_status_update_is_idempotent() {
        let registry = SessionRegistry::new();
        let (a, mut a_rx) = connection();
        registry.admit(identity("u-a", "Avery"), a).await;
        drain(&mut a_rx);

        registry.update_status("u-a", PresenceStatus::Busy).await;
        registry.update_status("u-a", PresenceStatus::Busy).await;

        let events = drain(&mut a_rx);
        assert_eq!(
            events,
            vec![ServerEvent::StatusChanged {
                id: "u-a".to_string(),
                status: PresenceStatus::Busy,
            }]
        );
    }

    #[tokio::test]
    async fn test_list_online_is_ordered_and_excludes_offline() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = connection();
        let (b, _b_rx) = connection();
        let (c, _c_rx) = connection();
        let c_conn = c.conn_id();

        registry.admit(identity("u-z", "Zoe"), a).await;
        registry.admit(identity("u-a", "Avery"), b).await;
        registry.admit(identity("u-m", "Morgan"), c).await;
        registry.remove("u-m", c_conn).await;

        let names: Vec<String> = registry.list_online().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["Avery", "Zoe"]);
    }

    #[test]
    fn test_snapshot_is_not_a_live_view() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = connection();
        let a_conn = a.conn_id();

        tokio_test::block_on(async {
            registry.admit(identity("u-a", "Avery"), a).await;
            let snapshot = registry.list_online();
            registry.remove("u-a", a_conn).await;

            // The earlier snapshot still shows the identity; re-query for
            // freshness.
            assert_eq!(snapshot.len(), 1);
            assert!(registry.list_online().is_empty());
        });
    }

    #[tokio::test]
    async fn test_push_on_closed_handle_fails() {
        let (handle, rx) = connection();
        drop(rx);
        assert!(handle.is_closed());
        assert!(
            !handle
                .push(ServerEvent::IdentityOffline {
                    id: "u-1".to_string()
                })
                .await
        );
    }
}
