//! HTTP router and the per-connection WebSocket loop.

use crate::handlers;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::puzzles;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/verify", post(verify_handler))
        .route("/puzzle/:index", get(puzzle_handler))
        .layer(cors)
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>CipherHunt Room Server</h1><p>WebSocket endpoint: /ws</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "cipherhunt-rooms",
        "live_rooms": state.rooms.len(),
        "connections": state.clients.len(),
    }))
}

/// Stateless verification boundary: entry passcode, puzzle answers,
/// and hints are all checked here against fixed configured values.
async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<puzzles::VerifyRequest>,
) -> Json<puzzles::VerifyResponse> {
    Json(puzzles::verify(&request, &state.config.game.entry_passcode))
}

/// Serve one puzzle's tagged content. Answers never travel this route.
async fn puzzle_handler(Path(index): Path<usize>) -> impl IntoResponse {
    match puzzles::puzzle(index) {
        Some(puzzle) => Json(puzzle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = handlers::handle_connection(state.clone(), tx.clone());

    // Outbound pump
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_client_message(&state, &connection_id, &tx, msg);
                }
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    handlers::handle_disconnect(state, &connection_id);
    send_task.abort();
}

/// Dispatch one intent. Mutations are synchronous; everything the
/// caller needs back goes down its own channel, and document changes
/// fan out to watchers inside the handlers.
fn handle_client_message(
    state: &Arc<AppState>,
    connection_id: &str,
    sender: &mpsc::UnboundedSender<ServerMessage>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Heartbeat {
            room_id,
            identifier,
        } => {
            // Best-effort: a heartbeat for a dead room self-heals when
            // the client's sync layer sees the room is gone.
            if let Err(err) = handlers::heartbeat(state, &room_id, &identifier) {
                tracing::debug!(room_id = %room_id, %err, "Heartbeat dropped");
            }
            let _ = sender.send(ServerMessage::HeartbeatAck);
        }

        ClientMessage::CreateRoom {
            nickname,
            identifier,
        } => {
            let (room_id, code) = handlers::create_room(state, &nickname, &identifier);
            subscribe_conn(state, connection_id, &identifier, &room_id);
            let _ = sender.send(ServerMessage::RoomCreated {
                room_id: room_id.clone(),
                code,
            });
            handlers::broadcast_room_snapshot(state, &room_id);
        }

        ClientMessage::JoinRoom {
            code,
            nickname,
            identifier,
        } => match handlers::join_room(state, &code, &nickname, &identifier) {
            Ok((room_id, code)) => {
                subscribe_conn(state, connection_id, &identifier, &room_id);
                let _ = sender.send(ServerMessage::RoomJoined {
                    room_id: room_id.clone(),
                    code,
                });
                // The joiner subscribed after the join broadcast; send
                // it the documents it missed.
                handlers::broadcast_room_snapshot(state, &room_id);
                handlers::broadcast_chat_snapshot(state, &room_id);
            }
            Err(err) => send_error(sender, &err),
        },

        ClientMessage::LeaveRoom {
            room_id,
            identifier,
        } => {
            handlers::leave_room(state, &room_id, &identifier);
            if let Some(conn) = state.clients.get(connection_id) {
                conn.watch_room(None);
            }
        }

        ClientMessage::CloseRoom {
            room_id,
            host_identifier,
        } => match handlers::close_room(state, &room_id, &host_identifier) {
            Ok(()) => {
                if let Some(conn) = state.clients.get(connection_id) {
                    conn.watch_room(None);
                }
            }
            Err(err) => send_error(sender, &err),
        },

        ClientMessage::SetRoomLocked {
            room_id,
            host_identifier,
            locked,
        } => {
            if let Err(err) = handlers::set_room_locked(state, &room_id, &host_identifier, locked) {
                send_error(sender, &err);
            }
        }

        ClientMessage::KickPlayer {
            room_id,
            host_identifier,
            target_identifier,
        } => match handlers::kick_player(state, &room_id, &host_identifier, &target_identifier) {
            Ok(kicked) => {
                let _ = sender.send(ServerMessage::KickResult {
                    success: true,
                    kicked_player: Some(kicked),
                });
            }
            Err(err) => send_error(sender, &err),
        },

        ClientMessage::StartGame {
            room_id,
            identifier,
        } => {
            if let Err(err) = handlers::start_game(state, &room_id, &identifier) {
                send_error(sender, &err);
            }
        }

        ClientMessage::SubmitPuzzleAnswer {
            room_id,
            puzzle_index,
            answer,
        } => match handlers::submit_puzzle_answer(state, &room_id, puzzle_index, &answer) {
            Ok(outcome) => {
                let _ = sender.send(ServerMessage::SubmitResult {
                    correct: outcome.correct,
                    final_passcode: outcome.final_passcode,
                    completion_secs: outcome.completion_secs,
                });
            }
            Err(err) => send_error(sender, &err),
        },

        ClientMessage::UpdateSharedInput {
            room_id,
            key,
            value,
        } => {
            if let Err(err) = handlers::update_shared_input(state, &room_id, &key, &value) {
                tracing::debug!(room_id = %room_id, %err, "Shared input dropped");
            }
        }

        ClientMessage::ClaimTyping {
            room_id,
            identifier,
            label,
            field_index,
        } => {
            let locked = handlers::claim_typing(state, &room_id, &identifier, &label, field_index)
                .unwrap_or(true);
            let _ = sender.send(ServerMessage::ClaimResult { locked });
        }

        ClientMessage::ClearTyping {
            room_id,
            identifier,
        } => {
            if let Err(err) = handlers::clear_typing(state, &room_id, &identifier) {
                tracing::debug!(room_id = %room_id, %err, "Lock release dropped");
            }
        }

        ClientMessage::SendChat {
            room_id,
            identifier,
            text,
        } => {
            if let Err(err) = handlers::send_chat(state, &room_id, &identifier, &text) {
                tracing::debug!(room_id = %room_id, %err, "Chat message dropped");
            }
        }
    }
}

/// Bind this connection to a participant and subscribe it to a room's
/// feed.
fn subscribe_conn(state: &AppState, connection_id: &str, identifier: &str, room_id: &str) {
    if let Some(conn) = state.clients.get(connection_id) {
        conn.set_identifier(identifier);
        conn.watch_room(Some(room_id.to_string()));
    }
}

fn send_error(sender: &mpsc::UnboundedSender<ServerMessage>, err: &crate::error::RoomError) {
    let _ = sender.send(ServerMessage::Error {
        code: err.code().to_string(),
        message: err.to_string(),
    });
}
