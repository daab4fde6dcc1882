//! Room lifecycle: create, join, leave, close, kick, lock toggle.
//!
//! Every mutation here is a synchronous read-modify-write under the
//! room map's entry guard, then broadcasts a full replacement snapshot
//! after the guard drops.

use crate::error::RoomError;
use crate::protocol::{chat_entries, RoomSnapshot, ServerMessage};
use crate::state::{AppState, Player, Room};
use rand::Rng;
use uuid::Uuid;

/// Join-code alphabet: no 0/O, 1/I/L, so codes survive being read
/// aloud or scrawled on a whiteboard.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Sample a join code from the unambiguous alphabet.
fn sample_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a code no live room is using, retrying on collision.
fn generate_unique_code(state: &AppState) -> String {
    loop {
        let code = sample_code(state.config.room.code_length);
        if state.room_id_by_code(&code).is_none() {
            return code;
        }
    }
}

pub fn is_valid_code(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Create a room in the waiting phase with the creator as host.
/// Returns `(room_id, code)`.
pub fn create_room(state: &AppState, nickname: &str, identifier: &str) -> (String, String) {
    let room_id = Uuid::new_v4().to_string();
    let code = generate_unique_code(state);
    let host = Player::new(identifier.to_string(), nickname.to_string(), true);
    state
        .rooms
        .insert(room_id.clone(), Room::new(room_id.clone(), code.clone(), host));

    tracing::info!(room_id = %room_id, code = %code, identifier = %identifier, "Room created");
    (room_id, code)
}

/// Join a room by code. A call whose `identifier` is already a member
/// is a rejoin: it always succeeds and only refreshes the nickname,
/// regardless of phase or lock. That is what makes page reloads
/// non-destructive.
pub fn join_room(
    state: &AppState,
    code: &str,
    nickname: &str,
    identifier: &str,
) -> Result<(String, String), RoomError> {
    let room_id = state
        .room_id_by_code(code.trim())
        .ok_or(RoomError::RoomNotFound)?;

    let mut room = state.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;

    if let Some(player) = room.player_mut(identifier) {
        player.nickname = nickname.to_string();
        player.last_seen_at = std::time::Instant::now();
        tracing::info!(room_id = %room_id, identifier = %identifier, "Player rejoined");
        let code = room.code.clone();
        drop(room);
        broadcast_room_snapshot(state, &room_id);
        return Ok((room_id, code));
    }

    if room.phase != crate::state::Phase::Waiting {
        return Err(RoomError::GameAlreadyStarted);
    }
    if room.is_locked {
        return Err(RoomError::RoomLocked);
    }
    if room.players.len() >= state.config.room.max_players {
        return Err(RoomError::RoomFull);
    }

    room.players
        .push(Player::new(identifier.to_string(), nickname.to_string(), false));
    let code = room.code.clone();
    drop(room);

    tracing::info!(room_id = %room_id, identifier = %identifier, "Player joined");
    broadcast_room_snapshot(state, &room_id);
    Ok((room_id, code))
}

/// What a player removal did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Player removed, room still has members.
    Left,
    /// Player removed and host privileges migrated to this identifier.
    HostMigrated(String),
    /// Last player left, room and chat deleted.
    RoomDeleted,
    /// Identifier was not a member; nothing changed.
    NotAMember,
}

/// Remove a player from the room document, reassigning host to the
/// oldest survivor if needed. Pure on the document; shared by explicit
/// leave, kick, and the presence sweep.
pub fn remove_player_from_room(room: &mut Room, identifier: &str) -> LeaveOutcome {
    let before = room.players.len();
    room.players.retain(|p| p.identifier != identifier);
    if room.players.len() == before {
        return LeaveOutcome::NotAMember;
    }

    // A departing holder should not pin the typing lock for a full TTL.
    if room
        .typing_lock
        .as_ref()
        .is_some_and(|lock| lock.holder_id == identifier)
    {
        room.typing_lock = None;
    }

    if room.players.is_empty() {
        return LeaveOutcome::RoomDeleted;
    }

    if room.host_id == identifier {
        // Oldest remaining player inherits the room.
        if let Some(next) = room
            .players
            .iter()
            .min_by_key(|p| p.joined_at)
            .map(|p| p.identifier.clone())
        {
            room.host_id = next.clone();
            for p in &mut room.players {
                p.is_host = p.identifier == next;
            }
            return LeaveOutcome::HostMigrated(next);
        }
    }

    LeaveOutcome::Left
}

/// Explicit leave. Deletes the room (and its chat) when the last
/// player departs.
pub fn leave_room(state: &AppState, room_id: &str, identifier: &str) -> LeaveOutcome {
    let outcome = match state.rooms.get_mut(room_id) {
        Some(mut room) => remove_player_from_room(&mut room, identifier),
        None => return LeaveOutcome::NotAMember,
    };

    match &outcome {
        LeaveOutcome::RoomDeleted => {
            tracing::info!(room_id = %room_id, "Last player left");
            delete_room(state, room_id);
        }
        LeaveOutcome::NotAMember => {}
        outcome => {
            tracing::info!(room_id = %room_id, identifier = %identifier, ?outcome, "Player left");
            broadcast_room_snapshot(state, room_id);
        }
    }
    outcome
}

/// Host-only room deletion, cascading to players and chat.
pub fn close_room(state: &AppState, room_id: &str, host_identifier: &str) -> Result<(), RoomError> {
    {
        let room = state.rooms.get(room_id).ok_or(RoomError::RoomNotFound)?;
        if room.host_id != host_identifier {
            return Err(RoomError::NotAuthorized);
        }
    }
    tracing::info!(room_id = %room_id, "Room closed by host");
    delete_room(state, room_id);
    Ok(())
}

/// Unconditionally delete a room, cascading to its players and chat,
/// and tell every watcher the document is gone.
pub fn delete_room(state: &AppState, room_id: &str) {
    state.rooms.remove(room_id);
    broadcast_to_watchers(
        state,
        room_id,
        ServerMessage::RoomClosed {
            room_id: room_id.to_string(),
        },
    );
}

/// Host-only removal of another player. The kicked client notices via
/// the next snapshot (its identifier is gone from the roster).
pub fn kick_player(
    state: &AppState,
    room_id: &str,
    host_identifier: &str,
    target_identifier: &str,
) -> Result<String, RoomError> {
    let kicked = {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if room.host_id != host_identifier || host_identifier == target_identifier {
            return Err(RoomError::NotAuthorized);
        }
        let nickname = room
            .player(target_identifier)
            .map(|p| p.nickname.clone())
            .ok_or(RoomError::RoomNotFound)?;
        remove_player_from_room(&mut room, target_identifier);
        nickname
    };

    tracing::info!(room_id = %room_id, target = %target_identifier, "Player kicked");
    broadcast_room_snapshot(state, room_id);
    Ok(kicked)
}

/// Host-only toggle blocking fresh joins.
pub fn set_room_locked(
    state: &AppState,
    room_id: &str,
    host_identifier: &str,
    locked: bool,
) -> Result<(), RoomError> {
    {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if room.host_id != host_identifier {
            return Err(RoomError::NotAuthorized);
        }
        room.is_locked = locked;
    }
    broadcast_room_snapshot(state, room_id);
    Ok(())
}

/// Send the current full room document to every connection watching it.
pub fn broadcast_room_snapshot(state: &AppState, room_id: &str) {
    let snapshot = match state.rooms.get(room_id) {
        Some(room) => RoomSnapshot::from_room(&room),
        None => return,
    };
    broadcast_to_watchers(state, room_id, ServerMessage::RoomSnapshot(snapshot));
}

/// Send the full chat list to every connection watching the room.
pub fn broadcast_chat_snapshot(state: &AppState, room_id: &str) {
    let messages = match state.rooms.get(room_id) {
        Some(room) => chat_entries(&room),
        None => return,
    };
    broadcast_to_watchers(
        state,
        room_id,
        ServerMessage::ChatSnapshot {
            room_id: room_id.to_string(),
            messages,
        },
    );
}

/// Deliver a message to every connection subscribed to a room. Send
/// failures mean the socket is already going away; the reaper handles it.
pub fn broadcast_to_watchers(state: &AppState, room_id: &str, message: ServerMessage) {
    for conn in state.clients.iter() {
        if conn.watched_room().as_deref() == Some(room_id) {
            let _ = conn.sender.send(message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::Phase;

    fn test_state() -> AppState {
        AppState::new(Config::for_tests())
    }

    #[test]
    fn created_codes_are_unique_and_well_formed() {
        let state = test_state();
        let mut codes = std::collections::HashSet::new();
        for i in 0..50 {
            let (_, code) = create_room(&state, &format!("player{i}"), &format!("id-{i}"));
            assert!(is_valid_code(&code, 8), "bad code: {code}");
            assert!(codes.insert(code), "duplicate code among live rooms");
        }
    }

    #[test]
    fn code_alphabet_has_no_confusable_characters() {
        for c in ['0', 'O', '1', 'I', 'L'] {
            assert!(!CODE_ALPHABET.contains(&(c as u8)));
        }
    }

    #[test]
    fn join_unknown_code_fails() {
        let state = test_state();
        let err = join_room(&state, "ZZZZZZZZ", "bob", "id-bob").unwrap_err();
        assert_eq!(err, RoomError::RoomNotFound);
    }

    #[test]
    fn join_inserts_non_host_ready_player() {
        let state = test_state();
        let (room_id, code) = create_room(&state, "alice", "id-a");
        let (joined_id, _) = join_room(&state, &code, "bob", "id-b").unwrap();
        assert_eq!(joined_id, room_id);

        let room = state.rooms.get(&room_id).unwrap();
        let bob = room.player("id-b").unwrap();
        assert!(!bob.is_host);
        assert!(bob.is_ready);
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn join_full_room_fails() {
        let state = test_state();
        let (_, code) = create_room(&state, "alice", "id-a");
        for i in 0..3 {
            join_room(&state, &code, &format!("p{i}"), &format!("id-{i}")).unwrap();
        }
        let err = join_room(&state, &code, "late", "id-late").unwrap_err();
        assert_eq!(err, RoomError::RoomFull);
    }

    #[test]
    fn join_started_game_fails_but_rejoin_succeeds() {
        let state = test_state();
        let (room_id, code) = create_room(&state, "alice", "id-a");
        join_room(&state, &code, "bob", "id-b").unwrap();
        state.rooms.get_mut(&room_id).unwrap().phase = Phase::Playing;

        let err = join_room(&state, &code, "carol", "id-c").unwrap_err();
        assert_eq!(err, RoomError::GameAlreadyStarted);

        // Same identifier passes the phase gate and keeps the same room.
        let (rejoined_id, _) = join_room(&state, &code, "bobby", "id-b").unwrap();
        assert_eq!(rejoined_id, room_id);
        let room = state.rooms.get(&room_id).unwrap();
        assert_eq!(room.player("id-b").unwrap().nickname, "bobby");
        assert_eq!(room.players.len(), 2);
    }

    #[test]
    fn locked_room_rejects_fresh_joins_only() {
        let state = test_state();
        let (room_id, code) = create_room(&state, "alice", "id-a");
        join_room(&state, &code, "bob", "id-b").unwrap();
        set_room_locked(&state, &room_id, "id-a", true).unwrap();

        assert_eq!(
            join_room(&state, &code, "carol", "id-c").unwrap_err(),
            RoomError::RoomLocked
        );
        assert!(join_room(&state, &code, "bob", "id-b").is_ok());
    }

    #[test]
    fn last_leave_deletes_room() {
        let state = test_state();
        let (room_id, _) = create_room(&state, "alice", "id-a");
        assert_eq!(leave_room(&state, &room_id, "id-a"), LeaveOutcome::RoomDeleted);
        assert!(!state.rooms.contains_key(&room_id));
    }

    #[test]
    fn host_leave_promotes_oldest_survivor() {
        let state = test_state();
        let (room_id, code) = create_room(&state, "alice", "id-a");
        std::thread::sleep(std::time::Duration::from_millis(2));
        join_room(&state, &code, "bob", "id-b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        join_room(&state, &code, "carol", "id-c").unwrap();

        let outcome = leave_room(&state, &room_id, "id-a");
        assert_eq!(outcome, LeaveOutcome::HostMigrated("id-b".to_string()));

        let room = state.rooms.get(&room_id).unwrap();
        assert_eq!(room.host_id, "id-b");
        let hosts: Vec<_> = room.players.iter().filter(|p| p.is_host).collect();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].identifier, "id-b");
    }

    #[test]
    fn kick_is_host_only_and_spares_host() {
        let state = test_state();
        let (room_id, code) = create_room(&state, "alice", "id-a");
        join_room(&state, &code, "bob", "id-b").unwrap();

        assert_eq!(
            kick_player(&state, &room_id, "id-b", "id-a").unwrap_err(),
            RoomError::NotAuthorized
        );
        assert_eq!(
            kick_player(&state, &room_id, "id-a", "id-a").unwrap_err(),
            RoomError::NotAuthorized
        );

        let kicked = kick_player(&state, &room_id, "id-a", "id-b").unwrap();
        assert_eq!(kicked, "bob");
        assert!(state.rooms.get(&room_id).unwrap().player("id-b").is_none());
    }

    #[test]
    fn close_room_is_host_only() {
        let state = test_state();
        let (room_id, code) = create_room(&state, "alice", "id-a");
        join_room(&state, &code, "bob", "id-b").unwrap();

        assert_eq!(
            close_room(&state, &room_id, "id-b").unwrap_err(),
            RoomError::NotAuthorized
        );
        close_room(&state, &room_id, "id-a").unwrap();
        assert!(!state.rooms.contains_key(&room_id));
    }
}
