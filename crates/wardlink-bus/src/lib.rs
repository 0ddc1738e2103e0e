//! Event bus bridge: best-effort publication of triaged tasks.
//!
//! Tasks are serialized to JSON and PUBLISHed to one fixed Redis channel for
//! cross-service fanout; consuming the stream is an external collaborator's
//! concern, so there is no subscribe side here. Publication is best-effort:
//! a failure is logged and swallowed, never surfaced to the request that
//! produced the task, and never rolled back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, redis::AsyncCommands};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wardlink_core::Task;

/// Default channel receiving serialized task records.
pub const DEFAULT_TASK_CHANNEL: &str = "wardlink.tasks";

/// Event bus configuration (`[bus]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_enabled() -> bool {
    false
}
fn default_url() -> String {
    "redis://127.0.0.1:6379".into()
}
fn default_channel() -> String {
    DEFAULT_TASK_CHANNEL.into()
}
fn default_pool_size() -> usize {
    4
}
fn default_timeout_ms() -> u64 {
    2000
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            channel: default_channel(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Connectivity state reported on the health surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Connected,
    Disconnected,
    Disabled,
}

impl BusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Connected => "connected",
            BusStatus::Disconnected => "disconnected",
            BusStatus::Disabled => "disabled",
        }
    }
}

/// Errors that can occur while publishing to the bus.
///
/// None of these reach the connection that triggered the publish; callers
/// log and move on.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Bus pool error: {0}")]
    Pool(String),

    #[error("Bus publish error: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Outbound half of the event bus.
#[async_trait]
pub trait TaskPublisher: Send + Sync {
    /// Publish one task record. Best-effort; see [`publish_best_effort`].
    async fn publish(&self, task: &Task) -> Result<(), BusError>;

    /// Current connectivity state.
    fn status(&self) -> BusStatus;
}

/// Publishes task records to a fixed Redis channel.
pub struct RedisTaskPublisher {
    pool: Pool,
    channel: String,
    connected: AtomicBool,
}

impl RedisTaskPublisher {
    pub fn new(pool: Pool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
            connected: AtomicBool::new(false),
        }
    }

    /// Check connectivity with a PING, updating the reported status.
    pub async fn ping(&self) -> bool {
        let ok = match self.pool.get().await {
            Ok(mut conn) => deadpool_redis::redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .is_ok(),
            Err(_) => false,
        };
        self.connected.store(ok, Ordering::Relaxed);
        ok
    }
}

#[async_trait]
impl TaskPublisher for RedisTaskPublisher {
    async fn publish(&self, task: &Task) -> Result<(), BusError> {
        let payload =
            serde_json::to_string(task).map_err(|e| BusError::Serialization(e.to_string()))?;

        let mut conn = self.pool.get().await.map_err(|e| {
            self.connected.store(false, Ordering::Relaxed);
            BusError::Pool(e.to_string())
        })?;

        let result: Result<(), _> = conn.publish(&self.channel, &payload).await;
        match result {
            Ok(()) => {
                self.connected.store(true, Ordering::Relaxed);
                debug!(
                    task_id = %task.id,
                    priority = %task.priority,
                    channel = %self.channel,
                    "Published task to bus"
                );
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::Relaxed);
                Err(BusError::Publish(e.to_string()))
            }
        }
    }

    fn status(&self) -> BusStatus {
        if self.connected.load(Ordering::Relaxed) {
            BusStatus::Connected
        } else {
            BusStatus::Disconnected
        }
    }
}

/// No-op publisher used when the bus is disabled.
///
/// Publishes are logged at debug and dropped, so the hub keeps working
/// without a Redis deployment.
#[derive(Debug, Default)]
pub struct DisabledTaskPublisher;

#[async_trait]
impl TaskPublisher for DisabledTaskPublisher {
    async fn publish(&self, task: &Task) -> Result<(), BusError> {
        debug!(task_id = %task.id, "Bus disabled, dropping task publication");
        Ok(())
    }

    fn status(&self) -> BusStatus {
        BusStatus::Disabled
    }
}

/// Build a publisher from configuration.
///
/// Falls back to the disabled publisher when the bus is turned off or the
/// pool cannot be created, so bus availability never blocks startup.
pub async fn create_task_publisher(config: &BusConfig) -> Arc<dyn TaskPublisher> {
    if !config.enabled {
        info!("Event bus disabled, task publications will be dropped");
        return Arc::new(DisabledTaskPublisher);
    }

    info!(url = %config.url, channel = %config.channel, "Connecting to event bus");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    if let Some(ref mut pool_config) = redis_config.pool {
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
        pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
        pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
    }

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Failed to create bus pool, task publications will be dropped");
            return Arc::new(DisabledTaskPublisher);
        }
    };

    let publisher = RedisTaskPublisher::new(pool, config.channel.clone());
    if publisher.ping().await {
        info!("Connected to event bus");
    } else {
        warn!("Event bus unreachable at startup, will retry on publish");
    }
    Arc::new(publisher)
}

/// Publish a task, absorbing failures.
///
/// The triggering request's in-process side effects are already complete by
/// the time this runs, so a bus failure is logged and nothing else.
pub async fn publish_best_effort(publisher: &dyn TaskPublisher, task: &Task) {
    if let Err(e) = publisher.publish(task).await {
        warn!(task_id = %task.id, error = %e, "Task publication failed, dropping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardlink_core::VitalSigns;

    #[test]
    fn test_config_defaults() {
        let config = BusConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.channel, DEFAULT_TASK_CHANNEL);
        assert!(config.pool_size > 0);
    }

    #[tokio::test]
    async fn test_disabled_publisher_swallows_tasks() {
        let publisher = DisabledTaskPublisher;
        let task = Task::new("patient-1", "ASSISTANCE", VitalSigns::default());
        assert!(publisher.publish(&task).await.is_ok());
        assert_eq!(publisher.status(), BusStatus::Disabled);
    }

    #[tokio::test]
    async fn test_disabled_bus_is_the_default_fallback() {
        let publisher = create_task_publisher(&BusConfig::default()).await;
        assert_eq!(publisher.status(), BusStatus::Disabled);
        let task = Task::new("patient-1", "CODE_BLUE", VitalSigns::default());
        publish_best_effort(publisher.as_ref(), &task).await;
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(BusStatus::Connected.as_str(), "connected");
        assert_eq!(
            serde_json::to_string(&BusStatus::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }
}
