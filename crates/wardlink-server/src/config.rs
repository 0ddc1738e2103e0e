use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use wardlink_bus::BusConfig;
use wardlink_core::Priority;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Event bus configuration
    #[serde(default)]
    pub bus: BusConfig,
    /// Alert broadcast configuration
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default derived via field defaults

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.heartbeat_secs == 0 {
            return Err("server.heartbeat_secs must be > 0".into());
        }
        // Auth validation - the credential secret has no usable default
        if self.auth.secret.is_empty() {
            return Err(
                "auth.secret must be set (e.g. via WARDLINK__AUTH__SECRET)".into(),
            );
        }
        // Bus validation
        if self.bus.enabled {
            if self.bus.url.is_empty() {
                return Err("bus.enabled=true requires bus.url".into());
            }
            if self.bus.channel.is_empty() {
                return Err("bus.channel must not be empty".into());
            }
            if self.bus.pool_size == 0 {
                return Err("bus.pool_size must be > 0".into());
            }
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interval between WebSocket heartbeat pings
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_heartbeat_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

/// Credential validation settings.
///
/// The hub only verifies presented tokens; issuance is an external
/// collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret for credential verification
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Tier assigned to alert types outside the known emergency-code set
    #[serde(default = "default_alert_priority")]
    pub default_priority: Priority,
}

fn default_alert_priority() -> Priority {
    Priority::High
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            default_priority: default_alert_priority(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("wardlink.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., WARDLINK__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("WARDLINK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}
