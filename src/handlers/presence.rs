//! Presence: heartbeats and the staleness sweep.
//!
//! Liveness, not correctness: a player who misses a few heartbeats but
//! comes back before the threshold simply resumes. Socket disconnects
//! do NOT remove players (that would break reload survival); the sweep
//! is the only implicit remover.

use crate::error::RoomError;
use crate::handlers::room::{broadcast_room_snapshot, remove_player_from_room, LeaveOutcome};
use crate::state::AppState;
use std::time::Instant;

/// Refresh a player's liveness timestamp.
pub fn heartbeat(state: &AppState, room_id: &str, identifier: &str) -> Result<(), RoomError> {
    let mut room = state.rooms.get_mut(room_id).ok_or(RoomError::RoomNotFound)?;
    if let Some(player) = room.player_mut(identifier) {
        player.last_seen_at = Instant::now();
    }
    Ok(())
}

/// One pass over every room: prune silent players (with the same
/// host-migration/room-deletion rules as an explicit leave) and delete
/// rooms past the absolute age backstop.
pub fn sweep(state: &AppState) -> SweepStats {
    let stale_after = state.config.presence.stale_after;
    let max_age = state.config.room.max_age;
    let now = Instant::now();

    let mut stats = SweepStats::default();
    let room_ids: Vec<String> = state.rooms.iter().map(|r| r.key().clone()).collect();

    for room_id in room_ids {
        let mut room_gone = false;
        let mut changed = false;

        if let Some(mut room) = state.rooms.get_mut(&room_id) {
            if now.duration_since(room.created_at) > max_age {
                tracing::info!(room_id = %room_id, "Room hit the age backstop");
                room_gone = true;
            } else {
                let stale: Vec<String> = room
                    .players
                    .iter()
                    .filter(|p| now.duration_since(p.last_seen_at) > stale_after)
                    .map(|p| p.identifier.clone())
                    .collect();

                for identifier in stale {
                    match remove_player_from_room(&mut room, &identifier) {
                        LeaveOutcome::RoomDeleted => {
                            room_gone = true;
                            stats.pruned_players += 1;
                            break;
                        }
                        LeaveOutcome::NotAMember => {}
                        outcome => {
                            tracing::info!(
                                room_id = %room_id,
                                identifier = %identifier,
                                ?outcome,
                                "Pruned silent player"
                            );
                            stats.pruned_players += 1;
                            changed = true;
                        }
                    }
                }
            }
        }

        if room_gone {
            crate::handlers::room::delete_room(state, &room_id);
            stats.deleted_rooms += 1;
        } else if changed {
            broadcast_room_snapshot(state, &room_id);
        }
    }

    if stats.pruned_players > 0 || stats.deleted_rooms > 0 {
        tracing::info!(
            pruned_players = stats.pruned_players,
            deleted_rooms = stats.deleted_rooms,
            "Sweep completed"
        );
    }
    stats
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub pruned_players: usize,
    pub deleted_rooms: usize,
}
