//! Game progress: start, answer submission, shared inputs, chat.

use crate::error::RoomError;
use crate::handlers::room::{broadcast_chat_snapshot, broadcast_room_snapshot};
use crate::puzzles;
use crate::state::{AppState, ChatMessage, Phase};
use std::time::Instant;

/// Host-only transition from waiting to playing. Resets progress so a
/// lobby that sat around keeps nothing stale.
pub fn start_game(state: &AppState, room_id: &str, identifier: &str) -> Result<(), RoomError> {
    {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if room.host_id != identifier {
            return Err(RoomError::NotAuthorized);
        }
        if room.phase != Phase::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if room.players.len() < state.config.room.min_players {
            return Err(RoomError::NotEnoughPlayers);
        }
        room.phase = Phase::Playing;
        room.started_at = Some(Instant::now());
        room.current_puzzle_index = 0;
        room.solved_puzzles.clear();
    }

    tracing::info!(room_id = %room_id, "Game started");
    broadcast_room_snapshot(state, room_id);
    Ok(())
}

/// Result of an answer submission. A wrong answer is an expected
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub correct: bool,
    pub final_passcode: Option<String>,
    pub completion_secs: Option<u64>,
}

/// Check a submitted answer against the fixture and advance progress.
///
/// Idempotent on already-solved indices, and `current_puzzle_index`
/// never moves backward. Solving the last open puzzle flips the room
/// to victory exactly once; victory fields are write-once.
pub fn submit_puzzle_answer(
    state: &AppState,
    room_id: &str,
    puzzle_index: usize,
    answer: &str,
) -> Result<SubmitOutcome, RoomError> {
    let correct = puzzles::check_answer(puzzle_index, answer).ok_or(RoomError::PuzzleNotFound)?;

    let outcome = {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if !correct {
            return Ok(SubmitOutcome {
                correct: false,
                final_passcode: None,
                completion_secs: None,
            });
        }

        room.solved_puzzles.insert(puzzle_index);
        room.current_puzzle_index = room.current_puzzle_index.max(puzzle_index + 1);

        if room.solved_puzzles.len() == puzzles::PUZZLE_COUNT && room.phase != Phase::Victory {
            room.phase = Phase::Victory;
            room.completion_time = room.started_at.map(|t| t.elapsed());
            room.final_passcode = Some(state.config.game.final_passcode.clone());
            tracing::info!(
                room_id = %room_id,
                completion_secs = room.completion_time.map(|d| d.as_secs()),
                "All puzzles solved"
            );
        }

        SubmitOutcome {
            correct: true,
            final_passcode: room.final_passcode.clone(),
            completion_secs: room.completion_time.map(|d| d.as_secs()),
        }
    };

    broadcast_room_snapshot(state, room_id);
    Ok(outcome)
}

/// Last-writer-wins overwrite of one shared answer field. Never
/// rejected for members; the lock in the lock handler is advisory only.
pub fn update_shared_input(
    state: &AppState,
    room_id: &str,
    key: &str,
    value: &str,
) -> Result<(), RoomError> {
    {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        room.shared_inputs
            .insert(key.to_string(), value.to_string());
    }
    broadcast_room_snapshot(state, room_id);
    Ok(())
}

/// Append a chat line and re-broadcast the full list.
pub fn send_chat(
    state: &AppState,
    room_id: &str,
    identifier: &str,
    text: &str,
) -> Result<(), RoomError> {
    {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        let sender = room
            .player(identifier)
            .map(|p| p.nickname.clone())
            .unwrap_or_else(|| identifier.to_string());
        room.chat.push(ChatMessage {
            sender,
            text: text.to_string(),
            timestamp: crate::state::unix_millis(),
        });
    }
    broadcast_chat_snapshot(state, room_id);
    Ok(())
}
