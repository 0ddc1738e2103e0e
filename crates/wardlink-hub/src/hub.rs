//! Transport-independent event dispatch.

use std::sync::Arc;

use wardlink_bus::{BusStatus, TaskPublisher, publish_best_effort};
use wardlink_core::{Identity, Priority, Task};

use crate::alerts::AlertManager;
use crate::events::{ClientEvent, ErrorCode, ServerEvent};
use crate::router::MessageRouter;
use crate::session::{SessionHandle, SessionRegistry};

/// An admitted connection, as seen by the dispatch table.
#[derive(Clone)]
pub struct SessionContext {
    pub identity: Identity,
    pub handle: SessionHandle,
}

/// The hub wires the registry, router, alert manager, and bus bridge behind
/// one [`dispatch`](Hub::dispatch) entry point.
///
/// The transport layer only parses frames and feeds this table; swapping
/// the transport touches no triage or routing logic.
pub struct Hub {
    registry: Arc<SessionRegistry>,
    router: MessageRouter,
    alerts: AlertManager,
    bus: Arc<dyn TaskPublisher>,
}

impl Hub {
    pub fn new(default_alert_priority: Priority, bus: Arc<dyn TaskPublisher>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            router: MessageRouter::new(registry.clone()),
            alerts: AlertManager::new(registry.clone(), default_alert_priority),
            registry,
            bus,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    pub fn bus_status(&self) -> BusStatus {
        self.bus.status()
    }

    /// Admit an authenticated connection and send it the admission
    /// acknowledgement with the presence snapshot.
    pub async fn admit(&self, identity: Identity, handle: SessionHandle) -> SessionContext {
        self.registry.admit(identity.clone(), handle.clone()).await;
        handle
            .push(ServerEvent::Authenticated {
                identity: identity.clone(),
                online: self.registry.list_online(),
            })
            .await;
        SessionContext { identity, handle }
    }

    /// Route one inbound event from an admitted connection.
    ///
    /// No branch here is fatal: request errors go back to the originating
    /// connection as `error` events and the connection stays open.
    pub async fn dispatch(&self, ctx: &SessionContext, event: ClientEvent) {
        match event {
            ClientEvent::Authenticate { .. } => {
                ctx.handle
                    .push(ServerEvent::Error {
                        code: ErrorCode::NotAuthenticated,
                        message: "connection is already authenticated".to_string(),
                    })
                    .await;
            }
            ClientEvent::UpdateStatus { status } => {
                self.registry.update_status(&ctx.identity.id, status).await;
            }
            ClientEvent::SendMessage {
                to,
                content,
                priority,
            } => {
                self.router
                    .send(&ctx.identity.id, &to, content, priority)
                    .await;
            }
            ClientEvent::TypingStart { to } => {
                self.router.notify_typing(&ctx.identity.id, &to, true).await;
            }
            ClientEvent::TypingStop { to } => {
                self.router
                    .notify_typing(&ctx.identity.id, &to, false)
                    .await;
            }
            ClientEvent::TriggerAlert {
                alert_type,
                location,
                message,
            } => {
                self.alerts
                    .broadcast(
                        &alert_type,
                        &location,
                        &message,
                        Some(ctx.identity.id.clone()),
                    )
                    .await;
            }
            ClientEvent::AcknowledgeAlert { alert_id } => {
                if let Err(e) = self.alerts.acknowledge(alert_id, &ctx.identity.id).await {
                    self.push_not_found(ctx, e.to_string()).await;
                }
            }
            ClientEvent::ResolveAlert { alert_id } => {
                if let Err(e) = self.alerts.resolve(alert_id).await {
                    self.push_not_found(ctx, e.to_string()).await;
                }
            }
            ClientEvent::CreateTask {
                patient_ref,
                urgency_tag,
                vitals,
            } => {
                let task = Task::new(patient_ref, urgency_tag, vitals);
                ctx.handle
                    .push(ServerEvent::TaskCreated {
                        id: task.id,
                        priority: task.priority,
                    })
                    .await;

                // Publication never blocks the originating request; the
                // in-process side effects above are already complete.
                let bus = Arc::clone(&self.bus);
                tokio::spawn(async move {
                    publish_best_effort(bus.as_ref(), &task).await;
                });
            }
            ClientEvent::ListOnlineIdentities => {
                ctx.handle
                    .push(ServerEvent::OnlineIdentities {
                        identities: self.registry.list_online(),
                    })
                    .await;
            }
            ClientEvent::ListActiveAlerts => {
                ctx.handle
                    .push(ServerEvent::ActiveAlerts {
                        alerts: self.alerts.list_active(),
                    })
                    .await;
            }
        }
    }

    async fn push_not_found(&self, ctx: &SessionContext, message: String) {
        ctx.handle
            .push(ServerEvent::Error {
                code: ErrorCode::NotFound,
                message,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;
    use wardlink_bus::DisabledTaskPublisher;
    use wardlink_core::{StaffRole, VitalSigns};

    fn hub() -> Hub {
        Hub::new(Priority::High, Arc::new(DisabledTaskPublisher))
    }

    async fn connect(hub: &Hub, id: &str, role: StaffRole) -> (SessionContext, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let ctx = hub
            .admit(
                Identity::new(id, id.to_uppercase(), role, "ICU"),
                SessionHandle::new(tx),
            )
            .await;
        (ctx, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_admit_sends_ack_with_snapshot() {
        let hub = hub();
        let (_a, _a_rx) = connect(&hub, "u-a", StaffRole::Physician).await;
        let (_b, mut b_rx) = connect(&hub, "u-b", StaffRole::Nurse).await;

        let events = drain(&mut b_rx);
        let ServerEvent::Authenticated { identity, online } = &events[0] else {
            panic!("expected authenticated ack, got {events:?}");
        };
        assert_eq!(identity.id, "u-b");
        assert_eq!(online.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_authenticate_is_rejected() {
        let hub = hub();
        let (ctx, mut rx) = connect(&hub, "u-a", StaffRole::Nurse).await;
        drain(&mut rx);

        hub.dispatch(
            &ctx,
            ClientEvent::Authenticate {
                token: "whatever".to_string(),
            },
        )
        .await;

        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::Error {
                code: ErrorCode::NotAuthenticated,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_alert_reports_not_found() {
        let hub = hub();
        let (ctx, mut rx) = connect(&hub, "u-a", StaffRole::Nurse).await;
        drain(&mut rx);

        hub.dispatch(
            &ctx,
            ClientEvent::AcknowledgeAlert {
                alert_id: Uuid::new_v4(),
            },
        )
        .await;

        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::Error {
                code: ErrorCode::NotFound,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn test_create_task_acks_with_triaged_priority() {
        let hub = hub();
        let (ctx, mut rx) = connect(&hub, "u-a", StaffRole::Nurse).await;
        drain(&mut rx);

        hub.dispatch(
            &ctx,
            ClientEvent::CreateTask {
                patient_ref: "patient-7".to_string(),
                urgency_tag: "ASSISTANCE".to_string(),
                vitals: VitalSigns {
                    heart_rate: Some(35.0),
                    ..Default::default()
                },
            },
        )
        .await;

        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::TaskCreated {
                priority: Priority::Critical,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn test_queries_have_no_side_effects() {
        let hub = hub();
        let (ctx, mut rx) = connect(&hub, "u-a", StaffRole::Nurse).await;
        drain(&mut rx);

        hub.dispatch(&ctx, ClientEvent::ListOnlineIdentities).await;
        hub.dispatch(&ctx, ClientEvent::ListActiveAlerts).await;
        hub.dispatch(&ctx, ClientEvent::ListOnlineIdentities).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            ServerEvent::OnlineIdentities { identities } if identities.len() == 1
        ));
        assert!(matches!(
            &events[1],
            ServerEvent::ActiveAlerts { alerts } if alerts.is_empty()
        ));
        assert_eq!(events[0], events[2]);
    }

    #[tokio::test]
    async fn test_status_update_flows_through_dispatch() {
        let hub = hub();
        let (a_ctx, mut a_rx) = connect(&hub, "u-a", StaffRole::Nurse).await;
        let (_b, mut b_rx) = connect(&hub, "u-b", StaffRole::Nurse).await;
        drain(&mut a_rx);
        drain(&mut b_rx);

        hub.dispatch(
            &a_ctx,
            ClientEvent::UpdateStatus {
                status: wardlink_core::PresenceStatus::Busy,
            },
        )
        .await;

        assert!(drain(&mut b_rx).iter().any(|e| matches!(
            e,
            ServerEvent::StatusChanged { id, .. } if id == "u-a"
        )));
    }
}
