//! The exclusive-input typing lock.
//!
//! One advisory lock per room over the shared answer fields. Holders
//! renew by re-claiming; a claim older than the TTL counts as
//! abandoned, so a crashed tab never wedges the field. This is a
//! collaboration courtesy, not a security boundary.

use crate::error::RoomError;
use crate::handlers::room::broadcast_room_snapshot;
use crate::state::{AppState, TypingLock};
use std::time::Instant;

/// Try to take (or renew) the room's typing lock.
///
/// Returns `locked: false` when the claim succeeded (the caller now
/// holds it) and `locked: true` when someone else holds a live lock.
pub fn claim_typing(
    state: &AppState,
    room_id: &str,
    identifier: &str,
    label: &str,
    field_index: usize,
) -> Result<bool, RoomError> {
    let ttl = state.config.lock.ttl;
    let granted = {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;

        let claimable = match &room.typing_lock {
            None => true,
            Some(lock) => lock.holder_id == identifier || lock.claimed_at.elapsed() > ttl,
        };

        if claimable {
            room.typing_lock = Some(TypingLock {
                holder_id: identifier.to_string(),
                holder_label: label.to_string(),
                field_index,
                claimed_at: Instant::now(),
            });
        }
        claimable
    };

    if granted {
        broadcast_room_snapshot(state, room_id);
        tracing::debug!(room_id = %room_id, identifier = %identifier, field_index, "Typing lock claimed");
    }
    Ok(!granted)
}

/// Release the lock, but only if the caller still holds it. A stale
/// release from a field that already lost the lock must not un-claim
/// someone else's active lock.
pub fn clear_typing(state: &AppState, room_id: &str, identifier: &str) -> Result<(), RoomError> {
    let cleared = {
        let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
        if room
            .typing_lock
            .as_ref()
            .is_some_and(|lock| lock.holder_id == identifier)
        {
            room.typing_lock = None;
            true
        } else {
            false
        }
    };

    if cleared {
        broadcast_room_snapshot(state, room_id);
        tracing::debug!(room_id = %room_id, identifier = %identifier, "Typing lock released");
    }
    Ok(())
}
