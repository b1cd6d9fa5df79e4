//! Identity types: who is playing and which room they're in.
//!
//! Both are newtype wrappers around `String` with `#[serde(transparent)]`,
//! so they appear on the wire as plain strings and can be used as JSON
//! object keys (the room document keys players, scores and submissions by
//! player name).

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Characters that can't appear in a document key path segment.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Longest player name we accept.
pub const MAX_NAME_LEN: usize = 24;

/// Alphabet used for generated room codes. Leaves out `0`, `O`, `1` and
/// `I` so codes can be read aloud and typed without confusion.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// ---------------------------------------------------------------------------
// PlayerName
// ---------------------------------------------------------------------------

/// A player's display name. Unique within a room; acts as the primary key
/// for that player in every per-player map of the room document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    /// Validates and wraps a name. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidName`] if the trimmed name is empty, too
    /// long, or contains a key-path character (`/ . # $ [ ]`).
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ProtocolError> {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            return Err(ProtocolError::InvalidName("name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ProtocolError::InvalidName(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if name.contains(FORBIDDEN_KEY_CHARS) {
            return Err(ProtocolError::InvalidName(format!(
                "{name:?} contains a reserved character"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short, human-typeable key of a room (e.g. `AB12CD`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parses a code typed by a user: trims, upper-cases, and checks it is
    /// ASCII alphanumeric.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidCode`] for empty or non-alphanumeric input.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(ProtocolError::InvalidCode("room code must not be empty".into()));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidCode(format!(
                "{code:?} must only contain letters and digits"
            )));
        }
        Ok(Self(code))
    }

    /// Generates a random code of `len` characters.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let code = (0..len)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_player_name_trims_whitespace() {
        let name = PlayerName::new("  Alice ").unwrap();
        assert_eq!(name.as_str(), "Alice");
    }

    #[test]
    fn test_player_name_empty_rejected() {
        assert!(matches!(
            PlayerName::new("   "),
            Err(ProtocolError::InvalidName(_))
        ));
    }

    #[test]
    fn test_player_name_reserved_char_rejected() {
        assert!(PlayerName::new("a/b").is_err());
        assert!(PlayerName::new("a.b").is_err());
        assert!(PlayerName::new("[x]").is_err());
    }

    #[test]
    fn test_player_name_too_long_rejected() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(PlayerName::new(long).is_err());
    }

    #[test]
    fn test_player_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerName::new("Bob").unwrap()).unwrap();
        assert_eq!(json, "\"Bob\"");
    }

    #[test]
    fn test_room_code_parse_uppercases() {
        let code = RoomCode::parse(" ab12cd ").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_parse_rejects_symbols() {
        assert!(matches!(
            RoomCode::parse("AB-12"),
            Err(ProtocolError::InvalidCode(_))
        ));
        assert!(RoomCode::parse("").is_err());
    }

    #[test]
    fn test_room_code_generate_uses_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng, 6);
            assert_eq!(code.as_str().len(), 6);
            assert!(!code.as_str().contains(['0', 'O', '1', 'I']));
            assert!(RoomCode::parse(code.as_str()).is_ok());
        }
    }
}
