//! Per-client projection of authoritative room state.
//!
//! An explicit state machine: the snapshot cache is replaced wholesale
//! by every inbound `RoomSnapshot` (never merged field-by-field), and
//! the one optimistic local write — puzzle advance after a confirmed
//! submit — lives in its own slot and is discarded whenever any
//! authoritative snapshot arrives.

use crate::protocol::{PlayerInfo, RoomSnapshot, TypingLockInfo};
use crate::state::Phase;

/// Client-side lifecycle stage. `Entry` and `Lobby` both fold onto the
/// store's `waiting` phase; the store never sees `Entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Not in a room: the join/create screen.
    Entry,
    Lobby,
    Playing,
    Victory,
}

/// What applying a snapshot meant for this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Projection replaced; keep rendering.
    Updated,
    /// Our identifier vanished from the roster mid-game: kicked or
    /// pruned. Session state is cleared; show the entry screen.
    Removed,
}

/// One client's view of its room.
#[derive(Debug)]
pub struct RoomProjection {
    identifier: String,
    phase: ClientPhase,
    snapshot: Option<RoomSnapshot>,
    /// Locally-advanced puzzle index, masking round-trip latency after
    /// a confirmed submit. Authoritative snapshots always win.
    optimistic_index: Option<usize>,
}

impl RoomProjection {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            phase: ClientPhase::Entry,
            snapshot: None,
            optimistic_index: None,
        }
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    /// Reconcile with an authoritative snapshot.
    pub fn apply_snapshot(&mut self, snapshot: RoomSnapshot) -> SyncOutcome {
        let still_member = snapshot
            .players
            .iter()
            .any(|p| p.identifier == self.identifier);

        // Victory is the one phase where a missing row is fine: the
        // room is done and nobody is getting kicked out of the epilogue.
        if !still_member && snapshot.phase != Phase::Victory {
            self.reset();
            return SyncOutcome::Removed;
        }

        self.phase = match snapshot.phase {
            Phase::Waiting => ClientPhase::Lobby,
            Phase::Playing => ClientPhase::Playing,
            Phase::Victory => ClientPhase::Victory,
        };
        // Wholesale replacement; any optimistic advance is now stale.
        self.snapshot = Some(snapshot);
        self.optimistic_index = None;
        SyncOutcome::Updated
    }

    /// The room document disappeared (closed, expired, everyone left).
    pub fn room_closed(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = ClientPhase::Entry;
        self.snapshot = None;
        self.optimistic_index = None;
    }

    /// Record a locally-confirmed submit before the snapshot lands.
    pub fn submit_accepted(&mut self, puzzle_index: usize) {
        let floor = self.authoritative_index();
        self.optimistic_index = Some(self.optimistic_index.unwrap_or(floor).max(puzzle_index + 1));
    }

    fn authoritative_index(&self) -> usize {
        self.snapshot
            .as_ref()
            .map(|s| s.current_puzzle_index)
            .unwrap_or(0)
    }

    /// Puzzle index to render. Optimistic until the next snapshot, and
    /// never behind the authoritative value.
    pub fn puzzle_index(&self) -> usize {
        let auth = self.authoritative_index();
        self.optimistic_index.map_or(auth, |opt| opt.max(auth))
    }

    pub fn roster(&self) -> &[PlayerInfo] {
        self.snapshot.as_ref().map(|s| s.players.as_slice()).unwrap_or(&[])
    }

    pub fn is_host(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.host_id == self.identifier)
    }

    pub fn shared_input(&self, key: &str) -> Option<&str> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.shared_inputs.get(key))
            .map(String::as_str)
    }

    /// Who holds the typing lock, if anyone. Whether the lock is live
    /// is the server's call; clients only display it.
    pub fn typing_lock(&self) -> Option<&TypingLockInfo> {
        self.snapshot.as_ref().and_then(|s| s.typing_lock.as_ref())
    }

    pub fn final_passcode(&self) -> Option<&str> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.final_passcode.as_deref())
    }
}
