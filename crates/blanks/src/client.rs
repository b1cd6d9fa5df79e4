//! `GameClient`: one player's device, wired together.
//!
//! Ties together all the layers: catalog → room service → presence, plus
//! the two collaborators the core only calls out to, the profile store and
//! the feedback sink. Room writes happen first; cues and wallet changes
//! follow only once the write has committed.

use std::sync::Arc;

use blanks_catalog::{CatalogService, CatalogSource};
use blanks_protocol::{PlayerName, Room, RoomCode, TurnPhase};
use blanks_room::{Outcome, RoomDirectory, RoomError, RoomListing, RoomService};
use blanks_store::{DocumentStore, MemoryStore};
use tokio::sync::watch;

use crate::{BlanksError, ClientConfig, FeedbackCue, FeedbackSink, FreeProfile, NoFeedback, ProfileStore};

/// Builder for a [`GameClient`].
///
/// # Example
///
/// ```rust,ignore
/// use blanks::prelude::*;
///
/// let store = Arc::new(MemoryStore::new(StoreConfig::default()));
/// let client = GameClient::builder(store, OfflineSource)
///     .config(ClientConfig::from_env()?)
///     .build()
///     .await;
/// let room = client.create_room("Alice").await?;
/// ```
pub struct GameClientBuilder<S, C, P, F> {
    store: Arc<S>,
    source: C,
    profiles: P,
    feedback: F,
    config: ClientConfig,
    seed: Option<u64>,
}

impl<S: DocumentStore, C: CatalogSource, P: ProfileStore, F: FeedbackSink> GameClientBuilder<S, C, P, F> {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds shuffles and room codes, for reproducible games.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn profiles<P2: ProfileStore>(self, profiles: P2) -> GameClientBuilder<S, C, P2, F> {
        GameClientBuilder {
            store: self.store,
            source: self.source,
            profiles,
            feedback: self.feedback,
            config: self.config,
            seed: self.seed,
        }
    }

    pub fn feedback<F2: FeedbackSink>(self, feedback: F2) -> GameClientBuilder<S, C, P, F2> {
        GameClientBuilder {
            store: self.store,
            source: self.source,
            profiles: self.profiles,
            feedback,
            config: self.config,
            seed: self.seed,
        }
    }

    /// Loads the card catalog and assembles the client.
    ///
    /// Never fails: without a reachable catalog source the client plays
    /// with the cached or bundled deck.
    pub async fn build(self) -> GameClient<S, C, P, F> {
        let catalog = Arc::new(CatalogService::new(
            self.source,
            self.config.catalog_cache.clone(),
        ));
        let version = catalog.initialize().await.version().to_string();

        let mut rooms = RoomService::new(
            Arc::clone(&self.store),
            Arc::clone(&catalog),
            self.config.rules.clone(),
        );
        if let Some(seed) = self.seed {
            rooms = rooms.with_seed(seed);
        }

        tracing::info!(
            connection = %self.store.connection_id(),
            catalog = %version,
            "game client ready"
        );
        GameClient {
            directory: RoomDirectory::new(self.store),
            rooms,
            catalog,
            profiles: self.profiles,
            feedback: self.feedback,
            config: self.config,
        }
    }
}

/// The game as one client sees it.
///
/// Takes names and codes as typed by the player and validates them before
/// anything reaches the store. Every error's `Display` is fit to show.
pub struct GameClient<S: DocumentStore, C: CatalogSource, P = FreeProfile, F = NoFeedback> {
    rooms: RoomService<S, C>,
    directory: RoomDirectory<S>,
    catalog: Arc<CatalogService<C>>,
    profiles: P,
    feedback: F,
    config: ClientConfig,
}

impl<S: DocumentStore, C: CatalogSource> GameClient<S, C, FreeProfile, NoFeedback> {
    pub fn builder(store: Arc<S>, source: C) -> GameClientBuilder<S, C, FreeProfile, NoFeedback> {
        GameClientBuilder {
            store,
            source,
            profiles: FreeProfile,
            feedback: NoFeedback,
            config: ClientConfig::default(),
            seed: None,
        }
    }
}

impl<C: CatalogSource> GameClient<MemoryStore, C, FreeProfile, NoFeedback> {
    /// A builder over a fresh [`MemoryStore`] configured from
    /// `config.store`, with `config` already applied.
    pub fn in_memory(config: ClientConfig, source: C) -> GameClientBuilder<MemoryStore, C, FreeProfile, NoFeedback> {
        let store = Arc::new(MemoryStore::new(config.store.clone()));
        Self::builder(store, source).config(config)
    }
}

impl<S: DocumentStore, C: CatalogSource, P: ProfileStore, F: FeedbackSink> GameClient<S, C, P, F> {
    // -----------------------------------------------------------------------
    // Seating
    // -----------------------------------------------------------------------

    /// Creates a room with `player` as creator and judge.
    pub async fn create_room(&self, player: &str) -> Result<Room, BlanksError> {
        let player = PlayerName::new(player)?;
        let cosmetics = self.profiles.cosmetics(&player).await;
        let created = self.rooms.create_room(player.as_str(), &cosmetics).await;
        let room = self.settle(created)?;
        self.feedback.cue(FeedbackCue::Joined);
        Ok(room)
    }

    /// Takes a seat in the room, or retakes the player's old one.
    pub async fn join_room(&self, code: &str, player: &str) -> Result<Room, BlanksError> {
        let (code, player) = parse(code, player)?;
        let cosmetics = self.profiles.cosmetics(&player).await;
        let joined = self
            .rooms
            .join_room(code.as_str(), player.as_str(), &cosmetics)
            .await;
        let room = self.settle(joined)?;
        self.feedback.cue(FeedbackCue::Joined);
        Ok(room)
    }

    pub async fn leave_room(&self, code: &str, player: &str) -> Result<(), BlanksError> {
        let (code, player) = parse(code, player)?;
        self.rooms.leave_room(&code, &player).await;
        Ok(())
    }

    pub async fn kick_player(&self, code: &str, requester: &str, target: &str) -> Result<Outcome, BlanksError> {
        let (code, requester) = parse(code, requester)?;
        let target = PlayerName::new(target)?;
        let outcome = self.rooms.kick_player(&code, &requester, &target).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::PlayerKicked))
    }

    // -----------------------------------------------------------------------
    // Game lifecycle
    // -----------------------------------------------------------------------

    /// Starts the game. `points_to_win` defaults to the configured value.
    pub async fn start_game(&self, code: &str, points_to_win: Option<u32>) -> Result<Outcome, BlanksError> {
        let code = RoomCode::parse(code)?;
        let points = points_to_win.unwrap_or(self.config.rules.default_points_to_win);
        let outcome = self.rooms.start_game(&code, points).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::GameStarted))
    }

    pub async fn deal_cards(&self, code: &str) -> Result<Outcome, BlanksError> {
        let code = RoomCode::parse(code)?;
        let outcome = self.rooms.deal_cards(&code).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::CardsDealt))
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    pub async fn play_cards(&self, code: &str, player: &str, cards: &[String]) -> Result<Outcome, BlanksError> {
        let (code, player) = parse(code, player)?;
        let outcome = self.rooms.play_cards(&code, &player, cards).await;
        self.settle_cued(outcome, |room| {
            if room.turn_phase == TurnPhase::JudgeChoosing {
                Some(FeedbackCue::Reveal)
            } else {
                Some(FeedbackCue::CardsPlayed)
            }
        })
    }

    pub async fn confirm_judge_selection(&self, code: &str, winner: &str) -> Result<Outcome, BlanksError> {
        let (code, winner) = parse(code, winner)?;
        let outcome = self.rooms.confirm_judge_selection(&code, &winner).await;
        self.settle_cued(outcome, |room| {
            if room.game_winner.is_some() {
                Some(FeedbackCue::GameWon)
            } else {
                Some(FeedbackCue::RoundWon)
            }
        })
    }

    pub async fn next_round(&self, code: &str) -> Result<Outcome, BlanksError> {
        let code = RoomCode::parse(code)?;
        let outcome = self.rooms.next_round(&code).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::NewRound))
    }

    pub async fn discard_card(&self, code: &str, player: &str, card: &str) -> Result<Outcome, BlanksError> {
        let (code, player) = parse(code, player)?;
        let outcome = self.rooms.discard_card(&code, &player, card).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::CardDiscarded))
    }

    pub async fn use_joker(&self, code: &str, player: &str) -> Result<Outcome, BlanksError> {
        let (code, player) = parse(code, player)?;
        let outcome = self.rooms.use_joker(&code, &player).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::JokerUsed))
    }

    pub async fn force_reveal(&self, code: &str, requester: &str) -> Result<Outcome, BlanksError> {
        let (code, requester) = parse(code, requester)?;
        let outcome = self.rooms.force_reveal(&code, &requester).await;
        self.settle_cued(outcome, |_| Some(FeedbackCue::Reveal))
    }

    /// Pays for and performs a full mulligan.
    ///
    /// The cost is spent first. If the room write doesn't apply, for any
    /// reason, it is granted back.
    ///
    /// # Errors
    /// [`BlanksError::InsufficientFunds`] without touching the room if the
    /// player can't pay.
    pub async fn bribe_hand(&self, code: &str, player: &str) -> Result<Outcome, BlanksError> {
        let (code, player) = parse(code, player)?;
        let cost = self.config.bribe_cost;

        if !self.profiles.spend(&player, cost).await {
            self.feedback.cue(FeedbackCue::Rejected);
            return Err(BlanksError::InsufficientFunds { player, cost });
        }

        let outcome = self.rooms.bribe_hand(&code, &player).await;
        if !matches!(outcome, Ok(Outcome::Applied(_))) {
            self.profiles.grant(&player, cost).await;
            tracing::info!(%code, %player, cost, "bribe did not apply, refunded");
        }
        self.settle_cued(outcome, |_| Some(FeedbackCue::HandBribed))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn room(&self, code: &str) -> Result<Option<Room>, BlanksError> {
        let code = RoomCode::parse(code)?;
        Ok(self.rooms.room(&code).await?)
    }

    pub async fn watch_room(&self, code: &str) -> Result<watch::Receiver<Option<Room>>, BlanksError> {
        let code = RoomCode::parse(code)?;
        Ok(self.rooms.watch_room(&code).await?)
    }

    /// Open rooms, newest first.
    pub async fn list_rooms(&self) -> Result<Vec<RoomListing>, BlanksError> {
        Ok(self.directory.list().await?)
    }

    pub async fn watch_rooms(&self) -> Result<watch::Receiver<Vec<RoomListing>>, BlanksError> {
        Ok(self.directory.watch().await?)
    }

    /// Checks the catalog source for a newer deck. Returns `true` if one
    /// was installed.
    pub async fn refresh_catalog(&self) -> Result<bool, BlanksError> {
        Ok(self.catalog.refresh().await?)
    }

    /// Marks every seat this client holds offline and flushes the catalog
    /// cache.
    pub async fn shutdown(&self) {
        self.rooms.presence().disconnect_all().await;
        self.catalog.dispose().await;
        tracing::info!("game client shut down");
    }

    pub fn rooms(&self) -> &RoomService<S, C> {
        &self.rooms
    }

    pub fn profiles(&self) -> &P {
        &self.profiles
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn settle<T>(&self, result: Result<T, RoomError>) -> Result<T, BlanksError> {
        result.map_err(|e| {
            self.feedback.cue(FeedbackCue::Rejected);
            e.into()
        })
    }

    /// Cues `pick(room)` if the outcome applied.
    fn settle_cued(
        &self,
        result: Result<Outcome, RoomError>,
        pick: impl FnOnce(&Room) -> Option<FeedbackCue>,
    ) -> Result<Outcome, BlanksError> {
        let outcome = self.settle(result)?;
        if let Some(cue) = outcome.room().and_then(pick) {
            self.feedback.cue(cue);
        }
        Ok(outcome)
    }
}

fn parse(code: &str, player: &str) -> Result<(RoomCode, PlayerName), BlanksError> {
    Ok((RoomCode::parse(code)?, PlayerName::new(player)?))
}
