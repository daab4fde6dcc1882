//! Store error taxonomy.

use thiserror::Error;

/// Failure modes of room mutations. Every failure leaves the room
/// document untouched; there is no partial application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("no live room matches that code")]
    RoomNotFound,
    #[error("the game has already started")]
    GameAlreadyStarted,
    #[error("the room is full")]
    RoomFull,
    #[error("the host has locked the room against new joins")]
    RoomLocked,
    #[error("only the host may perform this action")]
    NotAuthorized,
    #[error("not enough players to start")]
    NotEnoughPlayers,
    #[error("no puzzle with that index")]
    PuzzleNotFound,
}

impl RoomError {
    /// Stable wire code carried in `ServerMessage::Error`.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound => "ROOM_NOT_FOUND",
            RoomError::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            RoomError::RoomFull => "ROOM_FULL",
            RoomError::RoomLocked => "ROOM_LOCKED",
            RoomError::NotAuthorized => "NOT_AUTHORIZED",
            RoomError::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            RoomError::PuzzleNotFound => "PUZZLE_NOT_FOUND",
        }
    }
}
