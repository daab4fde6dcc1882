//! Application state: the authoritative room table and connection registry.

use crate::config::Config;
use crate::protocol::ServerMessage;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::UnboundedSender;

/// Global application state.
///
/// `rooms` is the single source of truth. Mutations go through the
/// handler functions, each a synchronous read-modify-write under the
/// map's per-entry guard, so all mutations on one room are serialized.
/// The guard is never held across an await.
pub struct AppState {
    /// Room documents (room_id -> Room).
    pub rooms: DashMap<String, Room>,
    /// Live connections (connection_id -> ClientConn).
    pub clients: DashMap<String, ClientConn>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            rooms: DashMap::new(),
            clients: DashMap::new(),
            config: Arc::new(config),
        }
    }

    /// Look up a live room id by join code.
    pub fn room_id_by_code(&self, code: &str) -> Option<String> {
        self.rooms
            .iter()
            .find(|entry| entry.value().code == code)
            .map(|entry| entry.key().clone())
    }
}

/// Coarse room lifecycle stage. Victory is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Playing,
    Victory,
}

/// The advisory single-writer claim over a shared answer field.
#[derive(Debug, Clone)]
pub struct TypingLock {
    pub holder_id: String,
    pub holder_label: String,
    pub field_index: usize,
    pub claimed_at: Instant,
}

/// One participant's row in a room. Removed outright on leave/kick/prune,
/// never soft-deleted.
#[derive(Debug, Clone)]
pub struct Player {
    /// Stable per-browser id, survives reloads.
    pub identifier: String,
    pub nickname: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub joined_at: Instant,
    pub last_seen_at: Instant,
}

/// A chat line, append-only, deleted only with its room.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub timestamp: u64,
}

/// One room document plus its child collections.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    /// Join code, immutable after creation, unique among live rooms.
    pub code: String,
    pub host_id: String,
    pub phase: Phase,
    /// Never decreases while the room lives.
    pub current_puzzle_index: usize,
    pub solved_puzzles: HashSet<usize>,
    /// Shared answer fields, last-writer-wins per key.
    pub shared_inputs: HashMap<String, String>,
    pub typing_lock: Option<TypingLock>,
    /// Blocks fresh joins when true; rejoins still pass.
    pub is_locked: bool,
    pub final_passcode: Option<String>,
    pub completion_time: Option<Duration>,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
    /// Ordered by join time.
    pub players: Vec<Player>,
    pub chat: Vec<ChatMessage>,
}

impl Room {
    pub fn new(id: String, code: String, host: Player) -> Self {
        Self {
            id,
            code,
            host_id: host.identifier.clone(),
            phase: Phase::Waiting,
            current_puzzle_index: 0,
            solved_puzzles: HashSet::new(),
            shared_inputs: HashMap::new(),
            typing_lock: None,
            is_locked: false,
            final_passcode: None,
            completion_time: None,
            created_at: Instant::now(),
            started_at: None,
            players: vec![host],
            chat: Vec::new(),
        }
    }

    pub fn player(&self, identifier: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.identifier == identifier)
    }

    pub fn player_mut(&mut self, identifier: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.identifier == identifier)
    }
}

impl Player {
    pub fn new(identifier: String, nickname: String, is_host: bool) -> Self {
        let now = Instant::now();
        Self {
            identifier,
            nickname,
            is_host,
            is_ready: true,
            joined_at: now,
            last_seen_at: now,
        }
    }
}

/// One live WebSocket connection. The locks guard plain strings and
/// are never held across an await.
pub struct ClientConn {
    #[allow(dead_code)]
    pub id: String,
    /// Stable participant identifier, set on the first room intent.
    pub identifier: RwLock<Option<String>>,
    /// Room this connection is subscribed to, if any.
    pub room_id: RwLock<Option<String>>,
    pub sender: UnboundedSender<ServerMessage>,
    #[allow(dead_code)]
    pub connected_at: Instant,
}

impl ClientConn {
    /// Room id this connection currently watches.
    pub fn watched_room(&self) -> Option<String> {
        self.room_id.read().ok().and_then(|guard| guard.clone())
    }

    pub fn watch_room(&self, room_id: Option<String>) {
        if let Ok(mut guard) = self.room_id.write() {
            *guard = room_id;
        }
    }

    pub fn set_identifier(&self, identifier: &str) {
        if let Ok(mut guard) = self.identifier.write() {
            *guard = Some(identifier.to_string());
        }
    }
}

/// Milliseconds since the unix epoch, for chat timestamps.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
