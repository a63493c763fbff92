use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::shared::AppState;

use super::socket::Connection;

/// WebSocket endpoint. No handshake beyond the transport upgrade; every
/// connection is anonymous and gets a fresh identity.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state))
}

/// Handle the upgraded WebSocket connection until it closes
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    // Bounded outbound queue (peers -> this client). A peer that outruns the
    // queue loses frames instead of stalling everyone else's fan-out.
    let (outbound_sender, outbound_receiver) =
        mpsc::channel::<String>(app_state.config.outbound_queue_capacity);

    let client_id = app_state.lifecycle.on_connect(outbound_sender).await;
    info!(client_id = %client_id, "WebSocket connection established");

    let connection = Connection::new(
        client_id.clone(),
        Box::new(socket),
        outbound_receiver,
        app_state.router.clone(),
    );

    match connection.run().await {
        Ok(()) => {
            info!(client_id = %client_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            // A transport error is just another way to disconnect.
            warn!(client_id = %client_id, error = %e, "WebSocket connection error");
        }
    }

    app_state.lifecycle.on_disconnect(&client_id).await;
}
