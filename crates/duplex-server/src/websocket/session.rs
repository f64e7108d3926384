//! Echo session run for each upgraded socket.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use duplex_connection::{CloseReason, Connection, ConnectionConfig};
use duplex_settings::FrameKind;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::ConnectionRegistry;
use crate::websocket::transport::WsTransport;

/// Everything a session needs from the server.
#[derive(Clone)]
pub struct SessionContext {
    /// Where the session's connection is tracked while open.
    pub registry: Arc<ConnectionRegistry>,
    /// Fires when the server shuts down.
    pub shutdown: CancellationToken,
    /// Queue capacities for the connection.
    pub connection: ConnectionConfig,
    /// Frame type for outgoing messages.
    pub frame_kind: FrameKind,
}

/// Wrap `socket` in a [`Connection`] and echo every payload back.
///
/// Ends when the peer goes away, a send fails, or the server shuts down.
pub async fn run_echo_session(socket: WebSocket, ctx: SessionContext) {
    let transport = WsTransport::new(socket, ctx.frame_kind);
    let conn = match Connection::with_config(transport, ctx.connection.clone()) {
        Ok(conn) => conn,
        Err(err) => {
            warn!(error = %err, "failed to open connection");
            return;
        }
    };
    ctx.registry.register(conn.clone());
    info!(connection_id = %conn.id(), "websocket connected");

    echo(&conn, &ctx.shutdown).await;

    conn.close();
    conn.terminated().await;
    let _ = ctx.registry.unregister(conn.id());

    let stats = conn.stats();
    info!(
        connection_id = %conn.id(),
        reason = conn.close_reason().map_or("unknown", CloseReason::as_str),
        received = stats.received,
        sent = stats.sent,
        "websocket disconnected"
    );
}

async fn echo(conn: &Connection, shutdown: &CancellationToken) {
    loop {
        let payload = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!(connection_id = %conn.id(), "server shutting down, ending session");
                return;
            }
            read = conn.read() => match read {
                Ok(payload) => payload,
                Err(_) => return,
            },
        };

        if conn.send(payload).await.is_err() {
            return;
        }
    }
}
