//! Error types for the presence layer.

use blanks_store::StoreError;

/// Errors that can occur while recording presence.
///
/// The plain [`PresenceManager`](crate::PresenceManager) methods log and
/// swallow these; they surface only through the `try_` variants.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// A store round-trip failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
