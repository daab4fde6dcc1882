//! End-to-end tests driving the real WebSocket endpoint.

use cipherhunt_rooms::config::Config;
use cipherhunt_rooms::protocol::{ClientMessage, ServerMessage};
use cipherhunt_rooms::server;
use cipherhunt_rooms::state::{AppState, Phase};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

async fn start_server() -> String {
    start_server_with(Config::for_tests()).await
}

async fn start_server_with(config: Config) -> String {
    let state = Arc::new(AppState::new(config));
    let app = server::app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        let mut client = Self { ws };
        // Greeting arrives first on every connection.
        match client.recv().await {
            ServerMessage::Connected { .. } => {}
            other => panic!("expected greeting, got {other:?}"),
        }
        client
    }

    async fn send(&mut self, msg: &ClientMessage) {
        let json = serde_json::to_string(msg).unwrap();
        self.ws.send(Message::Text(json.into())).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("timed out waiting for a server message")
                .expect("connection closed")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).expect("unparseable server message");
            }
        }
    }

    /// Read messages until one matches, skipping interleaved feed
    /// updates.
    async fn recv_until<F>(&mut self, pred: F) -> ServerMessage
    where
        F: Fn(&ServerMessage) -> bool,
    {
        for _ in 0..50 {
            let msg = self.recv().await;
            if pred(&msg) {
                return msg;
            }
        }
        panic!("no matching message within 50 frames");
    }
}

fn is_snapshot(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::RoomSnapshot(_))
}

#[tokio::test]
async fn full_game_flow_over_websocket() {
    let addr = start_server().await;

    let mut host = Client::connect(&addr).await;
    host.send(&ClientMessage::CreateRoom {
        nickname: "alice".to_string(),
        identifier: "id-a".to_string(),
    })
    .await;

    let (room_id, code) = match host
        .recv_until(|m| matches!(m, ServerMessage::RoomCreated { .. }))
        .await
    {
        ServerMessage::RoomCreated { room_id, code } => (room_id, code),
        other => panic!("unexpected: {other:?}"),
    };
    assert_eq!(code.len(), 8);

    let mut guest = Client::connect(&addr).await;
    guest
        .send(&ClientMessage::JoinRoom {
            code: code.clone(),
            nickname: "bob".to_string(),
            identifier: "id-b".to_string(),
        })
        .await;
    guest
        .recv_until(|m| matches!(m, ServerMessage::RoomJoined { .. }))
        .await;

    // Both sides converge on a two-player waiting room.
    for client in [&mut host, &mut guest] {
        let msg = client
            .recv_until(|m| match m {
                ServerMessage::RoomSnapshot(s) => s.players.len() == 2,
                _ => false,
            })
            .await;
        if let ServerMessage::RoomSnapshot(s) = msg {
            assert_eq!(s.phase, Phase::Waiting);
            assert_eq!(s.host_id, "id-a");
        }
    }

    // Only the host may start.
    guest
        .send(&ClientMessage::StartGame {
            room_id: room_id.clone(),
            identifier: "id-b".to_string(),
        })
        .await;
    match guest
        .recv_until(|m| matches!(m, ServerMessage::Error { .. }))
        .await
    {
        ServerMessage::Error { code, .. } => assert_eq!(code, "NOT_AUTHORIZED"),
        other => panic!("unexpected: {other:?}"),
    }

    host.send(&ClientMessage::StartGame {
        room_id: room_id.clone(),
        identifier: "id-a".to_string(),
    })
    .await;
    let msg = guest
        .recv_until(|m| match m {
            ServerMessage::RoomSnapshot(s) => s.phase == Phase::Playing,
            _ => false,
        })
        .await;
    if let ServerMessage::RoomSnapshot(s) = msg {
        assert_eq!(s.current_puzzle_index, 0);
    }

    // Guest solves puzzle 0; everyone observes the advance.
    guest
        .send(&ClientMessage::SubmitPuzzleAnswer {
            room_id: room_id.clone(),
            puzzle_index: 0,
            answer: " cayman ".to_string(),
        })
        .await;
    match guest
        .recv_until(|m| matches!(m, ServerMessage::SubmitResult { .. }))
        .await
    {
        ServerMessage::SubmitResult { correct, .. } => assert!(correct),
        other => panic!("unexpected: {other:?}"),
    }
    let msg = host
        .recv_until(|m| match m {
            ServerMessage::RoomSnapshot(s) => s.current_puzzle_index == 1,
            _ => false,
        })
        .await;
    if let ServerMessage::RoomSnapshot(s) = msg {
        assert_eq!(s.solved_puzzles, vec![0]);
    }

    // Host leaves; guest inherits the room.
    host.send(&ClientMessage::LeaveRoom {
        room_id: room_id.clone(),
        identifier: "id-a".to_string(),
    })
    .await;
    let msg = guest
        .recv_until(|m| match m {
            ServerMessage::RoomSnapshot(s) => s.host_id == "id-b",
            _ => false,
        })
        .await;
    if let ServerMessage::RoomSnapshot(s) = msg {
        assert_eq!(s.players.len(), 1);
        assert!(s.players[0].is_host);
    }
}

#[tokio::test]
async fn rejoin_after_reconnect_bypasses_started_gate() {
    let addr = start_server().await;

    let mut host = Client::connect(&addr).await;
    host.send(&ClientMessage::CreateRoom {
        nickname: "alice".to_string(),
        identifier: "id-a".to_string(),
    })
    .await;
    let (room_id, code) = match host
        .recv_until(|m| matches!(m, ServerMessage::RoomCreated { .. }))
        .await
    {
        ServerMessage::RoomCreated { room_id, code } => (room_id, code),
        other => panic!("unexpected: {other:?}"),
    };

    let mut guest = Client::connect(&addr).await;
    guest
        .send(&ClientMessage::JoinRoom {
            code: code.clone(),
            nickname: "bob".to_string(),
            identifier: "id-b".to_string(),
        })
        .await;
    guest
        .recv_until(|m| matches!(m, ServerMessage::RoomJoined { .. }))
        .await;

    host.send(&ClientMessage::StartGame {
        room_id: room_id.clone(),
        identifier: "id-a".to_string(),
    })
    .await;
    host.recv_until(|m| match m {
        ServerMessage::RoomSnapshot(s) => s.phase == Phase::Playing,
        _ => false,
    })
    .await;

    // Simulated page reload: the socket drops, the identifier survives.
    drop(guest);

    let mut fresh = Client::connect(&addr).await;
    fresh
        .send(&ClientMessage::JoinRoom {
            code: code.clone(),
            nickname: "bob".to_string(),
            identifier: "id-c".to_string(),
        })
        .await;
    match fresh
        .recv_until(|m| matches!(m, ServerMessage::Error { .. }))
        .await
    {
        ServerMessage::Error { code, .. } => assert_eq!(code, "GAME_ALREADY_STARTED"),
        other => panic!("unexpected: {other:?}"),
    }

    fresh
        .send(&ClientMessage::JoinRoom {
            code,
            nickname: "bob".to_string(),
            identifier: "id-b".to_string(),
        })
        .await;
    let msg = fresh
        .recv_until(|m| matches!(m, ServerMessage::RoomJoined { .. }))
        .await;
    if let ServerMessage::RoomJoined { room_id: rejoined, .. } = msg {
        assert_eq!(rejoined, room_id);
    }
    fresh
        .recv_until(|m| match m {
            ServerMessage::RoomSnapshot(s) => s.phase == Phase::Playing && s.players.len() == 2,
            _ => false,
        })
        .await;
}

#[tokio::test]
async fn typing_lock_is_exclusive_across_connections() {
    let mut config = Config::for_tests();
    config.lock.ttl = Duration::from_millis(200);
    let addr = start_server_with(config).await;

    let mut host = Client::connect(&addr).await;
    host.send(&ClientMessage::CreateRoom {
        nickname: "alice".to_string(),
        identifier: "id-a".to_string(),
    })
    .await;
    let (room_id, code) = match host
        .recv_until(|m| matches!(m, ServerMessage::RoomCreated { .. }))
        .await
    {
        ServerMessage::RoomCreated { room_id, code } => (room_id, code),
        other => panic!("unexpected: {other:?}"),
    };

    let mut guest = Client::connect(&addr).await;
    guest
        .send(&ClientMessage::JoinRoom {
            code,
            nickname: "bob".to_string(),
            identifier: "id-b".to_string(),
        })
        .await;
    guest
        .recv_until(|m| matches!(m, ServerMessage::RoomJoined { .. }))
        .await;

    host.send(&ClientMessage::ClaimTyping {
        room_id: room_id.clone(),
        identifier: "id-a".to_string(),
        label: "alice".to_string(),
        field_index: 0,
    })
    .await;
    match host
        .recv_until(|m| matches!(m, ServerMessage::ClaimResult { .. }))
        .await
    {
        ServerMessage::ClaimResult { locked } => assert!(!locked),
        other => panic!("unexpected: {other:?}"),
    }

    guest
        .send(&ClientMessage::ClaimTyping {
            room_id: room_id.clone(),
            identifier: "id-b".to_string(),
            label: "bob".to_string(),
            field_index: 0,
        })
        .await;
    match guest
        .recv_until(|m| matches!(m, ServerMessage::ClaimResult { .. }))
        .await
    {
        ServerMessage::ClaimResult { locked } => assert!(locked),
        other => panic!("unexpected: {other:?}"),
    }

    // Past the 200 ms TTL the abandoned lock is claimable.
    tokio::time::sleep(Duration::from_millis(300)).await;
    guest
        .send(&ClientMessage::ClaimTyping {
            room_id,
            identifier: "id-b".to_string(),
            label: "bob".to_string(),
            field_index: 0,
        })
        .await;
    match guest
        .recv_until(|m| matches!(m, ServerMessage::ClaimResult { .. }))
        .await
    {
        ServerMessage::ClaimResult { locked } => assert!(!locked),
        other => panic!("unexpected: {other:?}"),
    }

    // The snapshot names the holder so peers can grey the field out.
    let msg = host
        .recv_until(|m| match m {
            ServerMessage::RoomSnapshot(s) => {
                s.typing_lock.as_ref().is_some_and(|l| l.holder_id == "id-b")
            }
            _ => false,
        })
        .await;
    assert!(is_snapshot(&msg));
}
