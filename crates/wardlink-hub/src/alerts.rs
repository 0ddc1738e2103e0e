//! Cluster-wide emergency alert broadcasting.
//!
//! A broadcast reaches the sessions admitted at broadcast time, snapshot
//! taken from the registry at that moment; sessions that connect afterward
//! catch up through the active-alerts listing. Acknowledgement and
//! resolution transitions fan out to every admitted session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use wardlink_core::{Alert, Priority, code_priority};

use crate::error::HubError;
use crate::events::ServerEvent;
use crate::session::SessionRegistry;

/// Owns alert records and their broadcast lifecycle.
pub struct AlertManager {
    registry: Arc<SessionRegistry>,
    store: RwLock<HashMap<Uuid, Alert>>,
    /// Tier assigned to alert types outside the known emergency-code set.
    baseline: Priority,
}

impl AlertManager {
    pub fn new(registry: Arc<SessionRegistry>, baseline: Priority) -> Self {
        Self {
            registry,
            store: RwLock::new(HashMap::new()),
            baseline,
        }
    }

    /// Store and broadcast an alert.
    ///
    /// Known emergency codes resolve their tier through the triage table;
    /// anything else gets the configured baseline. The push targets are the
    /// handles live at this moment; at-most-once per session, no catch-up.
    pub async fn broadcast(
        &self,
        alert_type: &str,
        location: &str,
        text: &str,
        initiator: Option<String>,
    ) -> Alert {
        let priority = code_priority(alert_type).unwrap_or(self.baseline);
        let alert = Alert::new(alert_type, location, text, priority, initiator);
        self.store.write().insert(alert.id, alert.clone());

        tracing::info!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            location = %alert.location,
            priority = %alert.priority,
            "Broadcasting alert"
        );

        let recipients = self.registry.online_handles();
        for handle in &recipients {
            handle.push(ServerEvent::AlertBroadcast(alert.clone())).await;
        }
        alert
    }

    /// Record an identity's acknowledgement.
    ///
    /// Idempotent: re-acknowledging changes nothing, and a resolved alert
    /// accepts no further acknowledgements. Fans out `alert-acknowledged`
    /// only when the set actually grew.
    pub async fn acknowledge(
        &self,
        alert_id: Uuid,
        identity_id: &str,
    ) -> Result<Alert, HubError> {
        let (alert, grew) = {
            let mut store = self.store.write();
            let alert = store
                .get_mut(&alert_id)
                .ok_or(HubError::AlertNotFound(alert_id))?;
            let grew = alert.acknowledge(identity_id);
            (alert.clone(), grew)
        };

        if grew {
            let recipients = self.registry.online_handles();
            for handle in &recipients {
                handle
                    .push(ServerEvent::AlertAcknowledged {
                        alert_id,
                        by: identity_id.to_string(),
                        acknowledged_by: alert.acknowledged_by.clone(),
                    })
                    .await;
            }
        }
        Ok(alert)
    }

    /// Close an alert.
    ///
    /// Idempotent: the resolution marker keeps its first value. Fans out
    /// `alert-resolved` only on the open-to-closed transition.
    pub async fn resolve(&self, alert_id: Uuid) -> Result<Alert, HubError> {
        let (alert, transitioned) = {
            let mut store = self.store.write();
            let alert = store
                .get_mut(&alert_id)
                .ok_or(HubError::AlertNotFound(alert_id))?;
            let transitioned = alert.resolve();
            (alert.clone(), transitioned)
        };

        if transitioned {
            tracing::info!(alert_id = %alert_id, "Alert resolved");
            let recipients = self.registry.online_handles();
            for handle in &recipients {
                handle.push(ServerEvent::AlertResolved { alert_id }).await;
            }
        }
        Ok(alert)
    }

    /// Unresolved alerts, most recent first.
    pub fn list_active(&self) -> Vec<Alert> {
        let store = self.store.read();
        let mut active: Vec<Alert> = store
            .values()
            .filter(|alert| !alert.is_resolved())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active
    }

    /// Look up any alert, resolved ones included.
    pub fn get(&self, alert_id: Uuid) -> Option<Alert> {
        self.store.read().get(&alert_id).cloned()
    }
}
