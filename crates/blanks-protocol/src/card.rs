//! Card types and the encoded/decoded card slot.

use serde::{Deserialize, Serialize};

/// A prompt ("black") card: the round's fill-in-the-blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptCard {
    /// Display text, blanks written as `____`.
    pub text: String,

    /// How many answer cards a submission should contain.
    #[serde(default = "default_pick")]
    pub pick: u8,

    /// Answers that fit this prompt especially well. Jokers draw from here
    /// first.
    #[serde(default)]
    pub best_answers: Vec<String>,
}

fn default_pick() -> u8 {
    1
}

impl PromptCard {
    /// A single-blank prompt with no best-answer hints.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pick: 1,
            best_answers: Vec::new(),
        }
    }

    /// Adds best-answer hints.
    pub fn with_best_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.best_answers = answers.into_iter().map(Into::into).collect();
        self
    }
}

/// Normalizes card text for comparisons: surrounding whitespace removed.
///
/// Two cards are the same card iff their normalized text is equal.
pub fn normalize(text: &str) -> &str {
    text.trim()
}

/// Returns `true` if `a` and `b` name the same card.
pub fn same_card(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// A card field as it appears in the room document.
///
/// Cards are stored as integer indices into the catalog to keep the
/// synchronized payload small, but a card that the local catalog doesn't
/// know (renamed or added in another client version) has to travel in full.
/// This is a tagged union, so every codec branch is checked by the compiler
/// instead of probing the JSON type at runtime.
///
/// On the wire it is untagged: `17` or `"Free snacks."` /
/// `{"text": "...", ...}`. The index is signed because older clients write
/// `-1` for "not found"; such a slot never resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardSlot<T> {
    Encoded(i64),
    Decoded(T),
}

impl<T> CardSlot<T> {
    /// Returns `true` for the compact index form.
    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }
}
