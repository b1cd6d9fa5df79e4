//! Error types for the room layer.

use blanks_protocol::{PlayerName, ProtocolError, RoomCode};
use blanks_store::StoreError;

/// Errors that can occur during room operations.
///
/// Ordinary no-ops (playing while you are the judge, discarding twice)
/// are not errors; they come back as
/// [`Outcome::Unchanged`](crate::Outcome::Unchanged).
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A name or code failed validation, or a stored room could not be
    /// decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The store rejected the round-trip or gave up on a transaction.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The game has ended; the room takes no new players or restarts.
    #[error("the game in room {0} is over")]
    GameOver(RoomCode),

    /// Only the room's creator may do this.
    #[error("only the creator of room {code} can do that, not {player}")]
    NotCreator { code: RoomCode, player: PlayerName },

    /// Only the judge or the creator may do this.
    #[error("{player} is neither judge nor creator of room {code}")]
    NotAuthorized { code: RoomCode, player: PlayerName },

    /// The creator tried to kick themself.
    #[error("{0} cannot kick themself")]
    CannotKickSelf(PlayerName),

    /// `pointsToWin` outside the allowed set.
    #[error("points to win must be one of {allowed:?}, got {points}")]
    InvalidPointsToWin { points: u32, allowed: Vec<u32> },

    /// Every generated room code collided with an existing room.
    #[error("no free room code after {0} attempts")]
    CodeSpaceExhausted(u32),
}
