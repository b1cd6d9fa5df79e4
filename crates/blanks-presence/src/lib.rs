//! Player presence for Blanks.
//!
//! Keeps the `online` / `lastSeen` fields of each seat in a room document
//! in step with the client's real connection:
//!
//! 1. **Connect**: write `online = true` and arm an on-disconnect hook that
//!    writes `online = false` if the connection drops ([`PresenceManager`])
//! 2. **Leave**: disarm the hook, then write `online = false`
//! 3. **Rejoin**: disarm the previous hook before arming a new one, so an
//!    old session can never mark the new one offline
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)      ← calls connect/disconnect around joins and leaves
//!     ↕
//! Presence Layer (this crate)
//!     ↕
//! Store Layer (below)     ← on-disconnect hooks, partial updates
//! ```

mod error;
mod manager;
mod state;

pub use error::PresenceError;
pub use manager::PresenceManager;
pub use state::{PresenceState, ROOMS_KEY, Seat, player_path, room_path, rooms_path};
