//! The room document in its two forms.
//!
//! - [`RawRoom`] / [`RawPlayer`]: the wire form stored in the document
//!   store. Card fields are [`CardSlot`]s, mostly catalog indices. Every
//!   collection defaults to empty because the store drops empty arrays
//!   and maps.
//! - [`Room`] / [`Player`]: the rich form all game logic works on. Cards
//!   are full text / [`PromptCard`] values.
//!
//! Conversion between the two goes through [`hydrate`](crate::hydrate) and
//! [`dehydrate`](crate::dehydrate) only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CardSlot, PlayerName, PromptCard, ProtocolError, RoomCode, RoomPhase, TurnPhase};

/// Display attributes copied from a player's external profile when they
/// take a seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cosmetics {
    pub avatar: String,
    /// Preferred colour; used only if nobody in the room has it yet.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub active_frame: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

/// A player entry as stored on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayer {
    #[serde(default)]
    pub hand: Vec<CardSlot<String>>,
    #[serde(default)]
    pub joker_count: u32,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub last_seen: u64,
    #[serde(default)]
    pub has_discarded: bool,
    /// `None` marks a ghost: a partial node left by a presence write that
    /// landed after the player was removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<u64>,
    #[serde(default)]
    pub seat: u32,
}

/// The room document as stored on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoom {
    pub code: RoomCode,
    pub creator: PlayerName,
    pub judge: PlayerName,
    #[serde(default)]
    pub judge_index: usize,
    #[serde(default)]
    pub current_turn: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_card: Option<CardSlot<PromptCard>>,
    #[serde(default)]
    pub black_deck: Vec<CardSlot<PromptCard>>,
    #[serde(default)]
    pub white_deck: Vec<CardSlot<String>>,
    #[serde(default)]
    pub players: BTreeMap<PlayerName, RawPlayer>,
    #[serde(default)]
    pub played_cards: BTreeMap<PlayerName, Vec<CardSlot<String>>>,
    #[serde(default)]
    pub scores: BTreeMap<PlayerName, u32>,
    pub room_phase: RoomPhase,
    #[serde(default)]
    pub turn_phase: TurnPhase,
    pub points_to_win: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_winner: Option<PlayerName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_winner: Option<PlayerName>,
    #[serde(default)]
    pub timestamp: u64,
}

impl RawRoom {
    /// Parses a room from a document snapshot.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if the tree doesn't look like a room.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(ProtocolError::Decode)
    }

    /// Converts the room into a document tree for writing.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if serialization fails.
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        serde_json::to_value(self).map_err(ProtocolError::Encode)
    }
}

// ---------------------------------------------------------------------------
// Rich form
// ---------------------------------------------------------------------------

/// A seated player, with their hand fully decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub hand: Vec<String>,
    pub joker_count: u32,
    pub avatar: String,
    pub color: String,
    pub active_frame: Option<String>,
    pub rank: Option<String>,
    pub online: bool,
    pub last_seen: u64,
    pub has_discarded: bool,
    pub joined_at: u64,
    /// Seat number, assigned in insertion order. Judge rotation follows it.
    pub seat: u32,
}

impl Player {
    /// A freshly seated player with an empty hand.
    pub fn new(cosmetics: &Cosmetics, color: String, joker_count: u32, seat: u32, now: u64) -> Self {
        Self {
            hand: Vec::new(),
            joker_count,
            avatar: cosmetics.avatar.clone(),
            color,
            active_frame: cosmetics.active_frame.clone(),
            rank: cosmetics.rank.clone(),
            online: true,
            last_seen: now,
            has_discarded: false,
            joined_at: now,
            seat,
        }
    }
}

/// The synchronized aggregate for one game, in rich form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub code: RoomCode,
    pub creator: PlayerName,
    pub judge: PlayerName,
    pub judge_index: usize,
    pub current_turn: u32,
    pub prompt_card: Option<PromptCard>,
    pub black_deck: Vec<PromptCard>,
    pub white_deck: Vec<String>,
    pub players: BTreeMap<PlayerName, Player>,
    pub played_cards: BTreeMap<PlayerName, Vec<String>>,
    pub scores: BTreeMap<PlayerName, u32>,
    pub room_phase: RoomPhase,
    pub turn_phase: TurnPhase,
    pub points_to_win: u32,
    pub round_winner: Option<PlayerName>,
    pub game_winner: Option<PlayerName>,
    pub timestamp: u64,
}

impl Room {
    /// A new room in the lobby with its creator seated as judge.
    pub fn new(
        code: RoomCode,
        creator: PlayerName,
        player: Player,
        points_to_win: u32,
        now: u64,
    ) -> Self {
        let mut players = BTreeMap::new();
        players.insert(creator.clone(), player);
        let mut scores = BTreeMap::new();
        scores.insert(creator.clone(), 0);
        Self {
            code,
            judge: creator.clone(),
            creator,
            judge_index: 0,
            current_turn: 0,
            prompt_card: None,
            black_deck: Vec::new(),
            white_deck: Vec::new(),
            players,
            played_cards: BTreeMap::new(),
            scores,
            room_phase: RoomPhase::Lobby,
            turn_phase: TurnPhase::WaitingForSubmissions,
            points_to_win,
            round_winner: None,
            game_winner: None,
            timestamp: now,
        }
    }

    /// Player names in seat order.
    pub fn seating(&self) -> Vec<PlayerName> {
        let mut seats: Vec<(&PlayerName, u32)> =
            self.players.iter().map(|(n, p)| (n, p.seat)).collect();
        seats.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        seats.into_iter().map(|(n, _)| n.clone()).collect()
    }

    /// The seat number the next inserted player gets.
    pub fn next_seat(&self) -> u32 {
        self.players.values().map(|p| p.seat + 1).max().unwrap_or(0)
    }

    /// Returns `true` if `name` is seated in this room.
    pub fn has_player(&self, name: &PlayerName) -> bool {
        self.players.contains_key(name)
    }

    /// Number of players whose submissions the round waits for: everyone
    /// except the judge.
    pub fn active_player_count(&self) -> usize {
        self.players.keys().filter(|n| **n != self.judge).count()
    }
}
