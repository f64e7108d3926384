//! `DuplexServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::registry::ConnectionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{self, SessionContext};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Open connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
}

/// The duplex server.
pub struct DuplexServer {
    config: Arc<ServerConfig>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl DuplexServer {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route(&self.config.path, get(ws_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve in a background task.
    ///
    /// The task stops accepting once [`ShutdownCoordinator::shutdown`] fires.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let stop = self.shutdown.token();

        info!(%addr, path = %self.config.path, "duplex server listening");

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
            {
                error!(error = %err, "server stopped with error");
            }
        });
        Ok((addr, handle))
    }

    /// Stop accepting, close every connection and wait for sessions to end.
    ///
    /// Returns `false` if the configured shutdown timeout elapsed first.
    pub async fn shutdown_gracefully(&self, server: JoinHandle<()>) -> bool {
        self.shutdown.shutdown();
        let _ = self.registry.close_all();
        let finished = self
            .shutdown
            .graceful_shutdown(vec![server], self.config.shutdown_timeout())
            .await;
        info!(finished, "duplex server stopped");
        finished
    }

    /// Open connections.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.count(),
        state.shutdown.is_shutting_down(),
    ))
}

/// GET <path>: upgrade and run an echo session.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let ctx = SessionContext {
        registry: Arc::clone(&state.registry),
        shutdown: state.shutdown.token(),
        connection: state.config.connection.clone(),
        frame_kind: state.config.frame_kind,
    };
    let coordinator = Arc::clone(&state.shutdown);

    ws.max_message_size(state.config.max_message_size)
        .max_frame_size(state.config.max_message_size)
        .on_failed_upgrade(|err| warn!(error = %err, "websocket upgrade failed"))
        .on_upgrade(move |socket| coordinator.track(session::run_echo_session(socket, ctx)))
}
