//! Room rules: the tunable numbers of a game.

use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Rules applied to every room a [`RoomService`](crate::RoomService)
/// creates or mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRules {
    /// Cards every player holds after a deal or top-up.
    pub hand_size: usize,

    /// Jokers each player gets when cards are dealt.
    pub starting_jokers: u32,

    /// `pointsToWin` of a freshly created room.
    pub default_points_to_win: u32,

    /// Values `start_game` accepts for `pointsToWin`.
    pub allowed_points_to_win: Vec<u32>,

    /// Length of generated room codes.
    pub code_length: usize,

    /// How many fresh codes to try before giving up on a collision streak.
    pub max_code_attempts: u32,

    /// Player colours, handed out so that nobody shares one while the
    /// palette lasts.
    pub palette: Vec<String>,
}

impl Default for RoomRules {
    fn default() -> Self {
        Self {
            hand_size: 10,
            starting_jokers: 3,
            default_points_to_win: 7,
            allowed_points_to_win: vec![3, 5, 7, 10],
            code_length: 6,
            max_code_attempts: 8,
            palette: [
                "#E53935", "#1E88E5", "#43A047", "#FDD835", "#8E24AA", "#FB8C00",
                "#00ACC1", "#D81B60", "#6D4C41", "#3949AB",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RoomRules {
    /// Checks a requested `pointsToWin` against the allowed values.
    ///
    /// # Errors
    /// [`RoomError::InvalidPointsToWin`] if `points` isn't allowed.
    pub fn validate_points_to_win(&self, points: u32) -> Result<u32, RoomError> {
        if self.allowed_points_to_win.contains(&points) {
            Ok(points)
        } else {
            Err(RoomError::InvalidPointsToWin {
                points,
                allowed: self.allowed_points_to_win.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_rules_default() {
        let rules = RoomRules::default();
        assert_eq!(rules.hand_size, 10);
        assert_eq!(rules.starting_jokers, 3);
        assert_eq!(rules.default_points_to_win, 7);
        assert_eq!(rules.code_length, 6);
        assert!(rules.allowed_points_to_win.contains(&rules.default_points_to_win));
        assert!(!rules.palette.is_empty());
    }

    #[test]
    fn test_validate_points_to_win_allowed_value_passes() {
        let rules = RoomRules::default();
        for points in [3, 5, 7, 10] {
            assert_eq!(rules.validate_points_to_win(points).unwrap(), points);
        }
    }

    #[test]
    fn test_validate_points_to_win_other_value_rejected() {
        let rules = RoomRules::default();
        let result = rules.validate_points_to_win(4);
        assert!(matches!(
            result,
            Err(RoomError::InvalidPointsToWin { points: 4, .. })
        ));
    }
}
