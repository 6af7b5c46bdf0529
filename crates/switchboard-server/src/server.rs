//! `SwitchboardServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Json;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use switchboard_core::SessionRegistry;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info, info_span};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::health::{self, HealthResponse};
use crate::offer::{OfferResponder, offer_handler};
use crate::rest;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::ws_handler;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Room registry shared by every connection.
    pub registry: Arc<SessionRegistry>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Open WebSocket connections.
    pub connections: Arc<AtomicUsize>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle.
    pub metrics: PrometheusHandle,
    /// SDP offer companion.
    pub offer: Arc<OfferResponder>,
}

/// The signaling server.
pub struct SwitchboardServer {
    state: AppState,
}

impl SwitchboardServer {
    /// Create a new server around an existing registry.
    pub fn new(
        config: ServerConfig,
        registry: Arc<SessionRegistry>,
        metrics: PrometheusHandle,
    ) -> Result<Self, ServerError> {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let offer = OfferResponder::new(
            config.ice_servers.clone(),
            config.peer_max_lifetime(),
            shutdown.token(),
        )?;
        Ok(Self {
            state: AppState {
                registry,
                config: Arc::new(config),
                shutdown,
                connections: Arc::new(AtomicUsize::new(0)),
                start_time: Instant::now(),
                metrics,
                offer: Arc::new(offer),
            },
        })
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let environment = self.state.config.environment.clone();
        let trace = TraceLayer::new_for_http().make_span_with(move |req: &Request<Body>| {
            info_span!(
                "request",
                environment = %environment,
                method = %req.method(),
                uri = %req.uri()
            )
        });

        Router::new()
            .route("/ws/{room_id}/{participant_id}", get(ws_handler))
            .route("/v1/rtc/room", post(rest::create_room))
            .route("/v1/rtc/room/{room_id}", get(rest::get_room))
            .route("/v1/rtc/room/{room_id}/join", post(rest::join_room))
            .route("/v1/rtc/room/{room_id}/leave", post(rest::leave_room))
            .route("/webrtc/offer", post(offer_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(trace)
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind the listener and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "switchboard listening");

        let router = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(
            async move {
                let serve =
                    axum::serve(listener, router).with_graceful_shutdown(token.cancelled_owned());
                if let Err(err) = serve.await {
                    error!(error = %err, "server error");
                }
            }
            .in_current_span(),
        );
        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the room registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.connections.load(Ordering::Acquire);
    Json(health::health_check(
        state.start_time,
        connections,
        state.registry.room_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
