//! Error types for the protocol layer.
//!
//! Each crate in Blanks defines its own error enum. A `ProtocolError`
//! always means the problem is in names, codes, or (de)serialization of
//! documents, never in the store or the game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes or a JSON tree).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (bytes or a JSON tree didn't match the
    /// expected document shape).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A player name was empty or contained characters that can't appear
    /// in a document key path.
    #[error("invalid player name: {0}")]
    InvalidName(String),

    /// A room code was empty, the wrong length, or not alphanumeric.
    #[error("invalid room code: {0}")]
    InvalidCode(String),
}
