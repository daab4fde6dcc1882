//! Mutation handlers.

pub mod connection;
pub mod game;
pub mod lock;
pub mod presence;
pub mod room;

pub use connection::*;
pub use game::*;
pub use lock::*;
pub use presence::*;
pub use room::*;
