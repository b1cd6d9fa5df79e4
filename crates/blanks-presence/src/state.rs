//! Presence types: which seat we track and what state its connection is in.

use std::fmt;

use blanks_protocol::{PlayerName, RoomCode};
use blanks_store::{DocPath, HookId};

/// Top-level key under which every room document lives.
pub const ROOMS_KEY: &str = "rooms";

/// Path of the collection of all rooms.
pub fn rooms_path() -> DocPath {
    DocPath::root().child(ROOMS_KEY)
}

/// Path of one room document.
pub fn room_path(code: &RoomCode) -> DocPath {
    rooms_path().child(code.as_str())
}

/// Path of one player's entry inside a room document.
pub fn player_path(code: &RoomCode, player: &PlayerName) -> DocPath {
    room_path(code).child("players").child(player.as_str())
}

/// One player's place in one room. Presence is tracked per seat, so the
/// same name in two rooms is two independent seats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Seat {
    pub code: RoomCode,
    pub player: PlayerName,
}

impl Seat {
    pub fn new(code: RoomCode, player: PlayerName) -> Self {
        Self { code, player }
    }

    /// Path of the player entry this seat writes to.
    pub fn path(&self) -> DocPath {
        player_path(&self.code, &self.player)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.code, self.player)
    }
}

/// The connection state of a seat.
///
/// ```text
///   Connected(hook) ──(disconnect)──→ Disconnecting(hook) ──→ Offline
///       ↑                                                       │
///       └──────────────────────(connect)────────────────────────┘
/// ```
///
/// The hook is the token of the on-disconnect write registered for this
/// seat. Only the token held in the current state may be cancelled; any
/// older token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Online, with an on-disconnect write armed.
    Connected { hook: HookId },

    /// Leaving: the hook is being cancelled and the offline write sent.
    Disconnecting { hook: HookId },

    /// No hook armed.
    Offline,
}

impl PresenceState {
    /// The hook this state still owns, if any.
    pub fn hook(&self) -> Option<HookId> {
        match self {
            Self::Connected { hook } | Self::Disconnecting { hook } => Some(*hook),
            Self::Offline => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` if the state machine allows moving to `target`.
    ///
    /// Reconnecting from `Connected` is allowed: it replaces the hook.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::Connected { .. }, Self::Connected { .. })
                | (Self::Connected { .. }, Self::Disconnecting { .. })
                | (Self::Disconnecting { .. }, Self::Offline)
                | (Self::Offline, Self::Connected { .. })
        )
    }
}
