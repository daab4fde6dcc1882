//! Session restoration.
//!
//! The serialization boundary is deliberately narrow: ONLY the stable
//! identifier, the room code, and the nickname persist. Everything
//! else (roster, progress, shared inputs) is derived from the next
//! authoritative snapshot after the rejoin.

use crate::client::identity::ParticipantId;
use crate::protocol::ClientMessage;
use serde::{Deserialize, Serialize};

/// The persisted `(identifier, roomCode, nickname)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub identifier: ParticipantId,
    pub room_code: String,
    pub nickname: String,
}

impl SavedSession {
    pub fn new(identifier: ParticipantId, room_code: &str, nickname: &str) -> Self {
        Self {
            identifier,
            room_code: room_code.to_string(),
            nickname: nickname.to_string(),
        }
    }

    /// Serialize for the embedder's persistent store.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Revive a persisted session. `None` on any corruption: restore
    /// failure is silent-and-recoverable, never an error dialog.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// The rejoin intent to send on startup. Works in any phase because
    /// a join carrying a known identifier bypasses the started gate.
    /// If the server answers `ROOM_NOT_FOUND`, drop the saved session
    /// and fall back to the entry screen.
    pub fn restore_message(&self) -> ClientMessage {
        ClientMessage::JoinRoom {
            code: self.room_code.clone(),
            nickname: self.nickname.clone(),
            identifier: self.identifier.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_only_the_three_restore_fields() {
        let session = SavedSession::new(ParticipantId::generate(), "AB3D7KQ9", "alice");
        let json = session.to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 3);
        for key in ["identifier", "room_code", "nickname"] {
            assert!(keys.contains(&key), "missing {key}");
        }
    }

    #[test]
    fn round_trips_through_the_store() {
        let session = SavedSession::new(ParticipantId::generate(), "AB3D7KQ9", "alice");
        assert_eq!(SavedSession::from_json(&session.to_json()), Some(session));
    }

    #[test]
    fn corrupted_store_degrades_silently() {
        assert_eq!(SavedSession::from_json("{\"half\": tru"), None);
        assert_eq!(SavedSession::from_json(""), None);
    }

    #[test]
    fn restore_message_is_a_rejoin() {
        let id = ParticipantId::generate();
        let session = SavedSession::new(id.clone(), "AB3D7KQ9", "alice");
        match session.restore_message() {
            ClientMessage::JoinRoom {
                code,
                nickname,
                identifier,
            } => {
                assert_eq!(code, "AB3D7KQ9");
                assert_eq!(nickname, "alice");
                assert_eq!(identifier, id.as_str());
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }
}
