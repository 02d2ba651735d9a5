//! WebSocket-Endpunkt – axum-Route fuer das Signaling
//!
//! Nimmt Upgrades auf dem konfigurierten Pfad an und startet pro
//! Verbindung eine [`ClientConnection`]. Es wird kein Sub-Protokoll
//! ausgehandelt.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// Zustand der WebSocket-Route
#[derive(Clone)]
struct WsState {
    state: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Baut den Router mit der WebSocket-Route unter `pfad`
pub fn signaling_router(
    state: Arc<SignalingState>,
    pfad: &str,
    shutdown_rx: watch::Receiver<bool>,
) -> Router {
    Router::new()
        .route(pfad, get(websocket_handler))
        .with_state(WsState { state, shutdown_rx })
}

async fn websocket_handler(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
    State(ws_state): State<WsState>,
) -> Response {
    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr);
    let WsState { state, shutdown_rx } = ws_state;

    ws.on_upgrade(move |socket| async move {
        ClientConnection::neu(state, peer_addr)
            .verarbeiten(socket, shutdown_rx)
            .await
    })
}
