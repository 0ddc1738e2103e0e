use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use wardlink_auth::CredentialValidator;
use wardlink_bus::{DisabledTaskPublisher, TaskPublisher};
use wardlink_hub::Hub;

use crate::{AppState, config::AppConfig, handlers, ws};

pub struct WardlinkServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Real-time hub endpoint
        .route("/ws", get(ws::ws_handler))
        // The dashboard is an external collaborator, so CORS stays open.
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             _span: &tracing::Span| {
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub struct ServerBuilder {
    config: AppConfig,
    bus: Option<Arc<dyn TaskPublisher>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            bus: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn TaskPublisher>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> WardlinkServer {
        let bus = self.bus.unwrap_or_else(|| Arc::new(DisabledTaskPublisher));
        let state = AppState {
            hub: Arc::new(Hub::new(self.config.alerts.default_priority, bus)),
            validator: Arc::new(CredentialValidator::new(&self.config.auth.secret)),
            heartbeat_secs: self.config.server.heartbeat_secs,
        };

        WardlinkServer {
            addr: self.config.addr(),
            app: build_app(state),
        }
    }
}

impl WardlinkServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
