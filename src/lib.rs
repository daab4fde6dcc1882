//! Room coordination core for the CipherHunt party game.
//!
//! Many independently-connected browsers share one authoritative room
//! document: phase, roster, solved-puzzle progress, shared answer
//! fields, an advisory typing lock, and host privileges. Clients send
//! intents over a WebSocket; the store applies each one atomically and
//! re-broadcasts the full document to every subscriber.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod puzzles;
pub mod server;
pub mod state;
