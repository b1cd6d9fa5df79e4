//! Room and turn phases: the turn state machine's vocabulary.
//!
//! ```text
//! LOBBY ──→ IN_PROGRESS ──→ GAME_OVER
//!              │
//!              └─ WAITING_FOR_SUBMISSIONS ⇄ JUDGE_CHOOSING ──→ SHOWING_WINNER
//!                          ↑                                       │
//!                          └───────────────────────────────────────┘
//! ```
//!
//! `GAME_OVER` is terminal. `turnPhase` only means something while the room
//! is `IN_PROGRESS`. No transition is driven by a timer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    Lobby,
    InProgress,
    GameOver,
}

impl RoomPhase {
    /// Returns `true` while new players may take a seat without being
    /// dealt into a running round.
    pub fn is_lobby(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while rounds are being played.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Lobby, Self::InProgress) | (Self::InProgress, Self::GameOver)
        )
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "LOBBY"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::GameOver => write!(f, "GAME_OVER"),
        }
    }
}

/// The phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnPhase {
    /// Non-judge players are choosing answers.
    #[default]
    WaitingForSubmissions,
    /// Every active player has submitted (or the host forced it); the judge
    /// is picking a winner.
    JudgeChoosing,
    /// The round winner is on display until someone starts the next round.
    ShowingWinner,
}

impl TurnPhase {
    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::WaitingForSubmissions, Self::JudgeChoosing)
                | (Self::JudgeChoosing, Self::WaitingForSubmissions)
                | (Self::JudgeChoosing, Self::ShowingWinner)
                | (Self::ShowingWinner, Self::WaitingForSubmissions)
        )
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForSubmissions => write!(f, "WAITING_FOR_SUBMISSIONS"),
            Self::JudgeChoosing => write!(f, "JUDGE_CHOOSING"),
            Self::ShowingWinner => write!(f, "SHOWING_WINNER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_phase_can_transition_to() {
        assert!(RoomPhase::Lobby.can_transition_to(RoomPhase::InProgress));
        assert!(RoomPhase::InProgress.can_transition_to(RoomPhase::GameOver));
        assert!(!RoomPhase::Lobby.can_transition_to(RoomPhase::GameOver));
        assert!(!RoomPhase::GameOver.can_transition_to(RoomPhase::Lobby));
        assert!(!RoomPhase::GameOver.can_transition_to(RoomPhase::InProgress));
    }

    #[test]
    fn test_turn_phase_can_transition_to() {
        use TurnPhase::*;
        assert!(WaitingForSubmissions.can_transition_to(JudgeChoosing));
        assert!(JudgeChoosing.can_transition_to(ShowingWinner));
        assert!(ShowingWinner.can_transition_to(WaitingForSubmissions));
        assert!(!WaitingForSubmissions.can_transition_to(ShowingWinner));
        assert!(!ShowingWinner.can_transition_to(JudgeChoosing));
    }

    #[test]
    fn test_phases_serialize_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&RoomPhase::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            serde_json::to_string(&TurnPhase::JudgeChoosing).unwrap(),
            "\"JUDGE_CHOOSING\""
        );
    }

    #[test]
    fn test_phase_display_matches_wire_form() {
        assert_eq!(RoomPhase::GameOver.to_string(), "GAME_OVER");
        assert_eq!(TurnPhase::ShowingWinner.to_string(), "SHOWING_WINNER");
    }
}
