//! Client-server message protocol.
//!
//! Intents go up as `ClientMessage`, results and the subscription feed
//! come down as `ServerMessage`. The feed is full-replacement: after
//! every mutation the whole room document is re-broadcast, never a
//! field-level diff.

use crate::state::{Phase, Room};
use serde::{Deserialize, Serialize};

/// Client -> server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    // Liveness
    Heartbeat {
        room_id: String,
        identifier: String,
    },

    // Room lifecycle
    CreateRoom {
        nickname: String,
        identifier: String,
    },
    JoinRoom {
        code: String,
        nickname: String,
        identifier: String,
    },
    LeaveRoom {
        room_id: String,
        identifier: String,
    },
    CloseRoom {
        room_id: String,
        host_identifier: String,
    },
    SetRoomLocked {
        room_id: String,
        host_identifier: String,
        locked: bool,
    },
    KickPlayer {
        room_id: String,
        host_identifier: String,
        target_identifier: String,
    },

    // Game progress
    StartGame {
        room_id: String,
        identifier: String,
    },
    SubmitPuzzleAnswer {
        room_id: String,
        puzzle_index: usize,
        answer: String,
    },
    UpdateSharedInput {
        room_id: String,
        key: String,
        value: String,
    },

    // Exclusive-input lock
    ClaimTyping {
        room_id: String,
        identifier: String,
        label: String,
        field_index: usize,
    },
    ClearTyping {
        room_id: String,
        identifier: String,
    },

    // Chat
    SendChat {
        room_id: String,
        identifier: String,
        text: String,
    },
}

/// Server -> client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    // Connection
    Connected {
        connection_id: String,
    },
    HeartbeatAck,
    Error {
        code: String,
        message: String,
    },

    // Mutation results (caller only)
    RoomCreated {
        room_id: String,
        code: String,
    },
    RoomJoined {
        room_id: String,
        code: String,
    },
    SubmitResult {
        correct: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        final_passcode: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        completion_secs: Option<u64>,
    },
    ClaimResult {
        locked: bool,
    },
    KickResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        kicked_player: Option<String>,
    },

    // Subscription feed (all room members)
    RoomSnapshot(RoomSnapshot),
    ChatSnapshot {
        room_id: String,
        messages: Vec<ChatEntry>,
    },
    /// The full-replacement equivalent of "document gone": the room was
    /// deleted (host closed it, everyone left, or the sweep expired it).
    RoomClosed {
        room_id: String,
    },
}

/// Full replacement document for one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub code: String,
    pub host_id: String,
    pub phase: Phase,
    pub current_puzzle_index: usize,
    pub solved_puzzles: Vec<usize>,
    pub shared_inputs: std::collections::HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_lock: Option<TypingLockInfo>,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_passcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_secs: Option<u64>,
    pub players: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingLockInfo {
    pub holder_id: String,
    pub holder_label: String,
    pub field_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub identifier: String,
    pub nickname: String,
    pub is_host: bool,
    pub is_ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
    pub timestamp: u64,
}

impl RoomSnapshot {
    /// Project a room document onto the wire.
    pub fn from_room(room: &Room) -> Self {
        let mut solved: Vec<usize> = room.solved_puzzles.iter().copied().collect();
        solved.sort_unstable();
        Self {
            room_id: room.id.clone(),
            code: room.code.clone(),
            host_id: room.host_id.clone(),
            phase: room.phase,
            current_puzzle_index: room.current_puzzle_index,
            solved_puzzles: solved,
            shared_inputs: room.shared_inputs.clone(),
            typing_lock: room.typing_lock.as_ref().map(|lock| TypingLockInfo {
                holder_id: lock.holder_id.clone(),
                holder_label: lock.holder_label.clone(),
                field_index: lock.field_index,
            }),
            is_locked: room.is_locked,
            final_passcode: room.final_passcode.clone(),
            completion_secs: room.completion_time.map(|d| d.as_secs()),
            players: room
                .players
                .iter()
                .map(|p| PlayerInfo {
                    identifier: p.identifier.clone(),
                    nickname: p.nickname.clone(),
                    is_host: p.is_host,
                    is_ready: p.is_ready,
                })
                .collect(),
        }
    }
}

impl From<&Room> for ServerMessage {
    fn from(room: &Room) -> Self {
        ServerMessage::RoomSnapshot(RoomSnapshot::from_room(room))
    }
}

pub fn chat_entries(room: &Room) -> Vec<ChatEntry> {
    room.chat
        .iter()
        .map(|m| ChatEntry {
            sender: m.sender.clone(),
            text: m.text.clone(),
            timestamp: m.timestamp,
        })
        .collect()
}
