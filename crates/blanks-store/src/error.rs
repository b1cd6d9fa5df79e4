//! Error types for the store layer.

/// Errors that can occur when talking to the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key path was empty or had an empty segment (`rooms//x`).
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// A transaction kept losing the compare-and-swap race.
    #[error("transaction on {path} gave up after {attempts} attempts")]
    TooManyRetries { path: String, attempts: u32 },

    /// The connection to the store is down.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
