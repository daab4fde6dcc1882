//! Client-side layers: stable identity, session restoration, and the
//! per-client projection of authoritative room state. Shared by the
//! browser client shell and the tests.

pub mod identity;
pub mod session;
pub mod sync;

pub use identity::*;
pub use session::*;
pub use sync::*;
