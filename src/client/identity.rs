//! Stable per-browser participant identity.
//!
//! Generated once, persisted by the embedder, and reused across
//! reloads. This is an identity, not a session token: the same value
//! is what lets a rejoin bypass the "already started" gate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Mint a fresh identity. Call once per browser, then persist.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Revive a persisted identity, rejecting anything malformed so a
    /// corrupted store degrades to a fresh identity instead of junk.
    pub fn from_saved(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(|u| Self(u.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
