//! Environment-driven server configuration.

use std::env;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub room: RoomConfig,
    pub lock: LockConfig,
    pub presence: PresenceConfig,
    pub game: GameConfig,
    pub log_level: String,
}

/// Room capacity and join-code settings.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Hard player cap per room.
    pub max_players: usize,
    /// Minimum players required before the host may start the game.
    pub min_players: usize,
    /// Length of generated join codes.
    pub code_length: usize,
    /// Absolute room age after which the sweep deletes the room.
    pub max_age: Duration,
}

/// Advisory typing-lock settings.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// A lock older than this is treated as abandoned and claimable.
    pub ttl: Duration,
}

/// Heartbeat staleness settings.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Players whose last heartbeat is older than this get pruned.
    pub stale_after: Duration,
    /// Interval between sweep passes.
    pub sweep_interval: Duration,
}

/// Fixed game secrets resolved server-side.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub entry_passcode: String,
    pub final_passcode: String,
}

impl Config {
    /// Load configuration from environment variables, with defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env_parse("PORT", 5610),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            room: RoomConfig {
                max_players: env_parse("MAX_ROOM_SIZE", 6),
                min_players: env_parse("MIN_PLAYERS_TO_START", 2),
                code_length: env_parse("ROOM_CODE_LENGTH", 8),
                max_age: Duration::from_secs(env_parse("ROOM_MAX_AGE_SECS", 86_400)),
            },
            lock: LockConfig {
                ttl: Duration::from_millis(env_parse("TYPING_LOCK_TTL_MS", 3_000)),
            },
            presence: PresenceConfig {
                stale_after: Duration::from_secs(env_parse("PLAYER_STALE_SECS", 90)),
                sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", 60)),
            },
            game: GameConfig {
                entry_passcode: env::var("ENTRY_PASSCODE")
                    .unwrap_or_else(|_| "BLACKOUT".to_string()),
                final_passcode: env::var("FINAL_PASSCODE")
                    .unwrap_or_else(|_| "7294".to_string()),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Config with shrunken timings so tests can exercise TTL and
    /// staleness paths without multi-second sleeps.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            room: RoomConfig {
                max_players: 4,
                min_players: 2,
                code_length: 8,
                max_age: Duration::from_secs(86_400),
            },
            lock: LockConfig {
                ttl: Duration::from_millis(50),
            },
            presence: PresenceConfig {
                stale_after: Duration::from_millis(80),
                sweep_interval: Duration::from_millis(20),
            },
            game: GameConfig {
                entry_passcode: "BLACKOUT".to_string(),
                final_passcode: "7294".to_string(),
            },
            log_level: "debug".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
