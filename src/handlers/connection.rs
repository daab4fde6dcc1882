//! Connection registry.

use crate::protocol::ServerMessage;
use crate::state::{AppState, ClientConn};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Register a new WebSocket connection and greet it.
pub fn handle_connection(state: Arc<AppState>, sender: UnboundedSender<ServerMessage>) -> String {
    let connection_id = Uuid::new_v4().to_string();

    let conn = ClientConn {
        id: connection_id.clone(),
        identifier: RwLock::new(None),
        room_id: RwLock::new(None),
        sender: sender.clone(),
        connected_at: Instant::now(),
    };
    state.clients.insert(connection_id.clone(), conn);

    let _ = sender.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
    });

    tracing::info!(connection_id = %connection_id, "New connection established");
    connection_id
}

/// Drop a closed connection. The player row stays: a reload reconnects
/// and rejoins with the same stable identifier, and the presence sweep
/// reaps anyone who never comes back.
pub fn handle_disconnect(state: Arc<AppState>, connection_id: &str) {
    state.clients.remove(connection_id);
    tracing::info!(connection_id = %connection_id, "Connection closed");
}
