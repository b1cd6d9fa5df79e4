//! Sound and haptic cues.

/// Something the player should hear or feel. Emitted only after the
/// matching room write has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackCue {
    /// This client took a seat, new or returning.
    Joined,
    GameStarted,
    CardsDealt,
    CardsPlayed,
    /// All submissions are in, or the judge revealed early.
    Reveal,
    RoundWon,
    GameWon,
    NewRound,
    CardDiscarded,
    JokerUsed,
    HandBribed,
    PlayerKicked,
    /// An intent was rejected with a message for the player.
    Rejected,
}

/// Plays cues. Implementations must not block.
pub trait FeedbackSink: Send + Sync + 'static {
    fn cue(&self, cue: FeedbackCue);
}

/// Drops every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {
    fn cue(&self, _cue: FeedbackCue) {}
}
