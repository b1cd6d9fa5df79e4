//! Unified error type for Blanks.

use blanks_catalog::CatalogError;
use blanks_presence::PresenceError;
use blanks_protocol::{PlayerName, ProtocolError};
use blanks_room::RoomError;
use blanks_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `Display` text of every variant is meant to be shown to the player
/// as-is.
#[derive(Debug, thiserror::Error)]
pub enum BlanksError {
    /// A name or room code failed validation, or a document failed to
    /// decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The card catalog could not be refreshed or cached.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The document store was unreachable or gave up on a transaction.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// A room intent was rejected (not found, not allowed, game over).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An environment variable held a value we can't use.
    #[error("invalid {var}: {detail}")]
    Config { var: &'static str, detail: String },

    /// The player can't afford a paid action.
    #[error("{player} needs {cost} coins for that")]
    InsufficientFunds { player: PlayerName, cost: u64 },
}
