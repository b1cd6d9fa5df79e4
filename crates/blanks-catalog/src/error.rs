//! Error types for the catalog layer.

use blanks_protocol::ProtocolError;

/// Errors that can occur while loading or refreshing the card catalog.
///
/// None of these are fatal to a client: the service always keeps serving
/// its last-known-good catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The remote source couldn't be reached.
    #[error("catalog source unavailable: {0}")]
    Unavailable(String),

    /// The remote (or cached) catalog had no prompt or no answer cards.
    #[error("catalog {0} is empty")]
    Empty(String),

    /// Reading or writing the local cache failed.
    #[error("catalog cache I/O failed: {0}")]
    Cache(#[from] std::io::Error),

    /// The cache file or remote payload couldn't be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
