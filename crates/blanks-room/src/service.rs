//! Room service: runs game intents as store transactions.
//!
//! Every mutating operation reads the room, hydrates it, applies one rule
//! from [`rules`](crate::rules), and writes the dehydrated result back
//! with a compare-and-swap. Concurrent writers retry against the newer
//! value, so two players acting at once can't overwrite each other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blanks_catalog::{CatalogService, CatalogSource};
use blanks_presence::{PresenceManager, room_path};
use blanks_protocol::{
    CardCatalog, Cosmetics, PlayerName, RawRoom, Room, RoomCode, dehydrate, hydrate,
};
use blanks_store::{DocumentStore, TxOutcome};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tokio::sync::watch;

use crate::rules::{self, Change, TxContext};
use crate::{RoomError, RoomRules};

/// What a mutating room operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The room was written; this is the committed state.
    Applied(Room),
    /// The intent was a legal no-op in the room's current state.
    Unchanged,
    /// The room no longer exists.
    Missing,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The committed room, if anything was written.
    pub fn room(&self) -> Option<&Room> {
        match self {
            Self::Applied(room) => Some(room),
            _ => None,
        }
    }

    pub fn into_room(self) -> Option<Room> {
        match self {
            Self::Applied(room) => Some(room),
            _ => None,
        }
    }
}

/// Creates rooms, seats players and drives the game loop.
///
/// ## Lifecycle
///
/// ```text
/// create_room() ──→ [LOBBY] ──→ start_game() ──→ [IN_PROGRESS] ──→ [GAME_OVER]
///                     ↑ join_room()                 ↺ play / judge / next_round
/// ```
///
/// One service serves one client. It keeps that client's presence hooks,
/// so a player who joins through it is marked offline if its connection
/// drops.
pub struct RoomService<S: DocumentStore, C: CatalogSource> {
    store: Arc<S>,
    catalog: Arc<CatalogService<C>>,
    presence: PresenceManager<S>,
    rules: RoomRules,
    rng: Mutex<StdRng>,
}

impl<S: DocumentStore, C: CatalogSource> RoomService<S, C> {
    pub fn new(store: Arc<S>, catalog: Arc<CatalogService<C>>, rules: RoomRules) -> Self {
        Self {
            presence: PresenceManager::new(Arc::clone(&store)),
            store,
            catalog,
            rules,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Makes shuffles, deals and room codes reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn presence(&self) -> &PresenceManager<S> {
        &self.presence
    }

    pub fn rules(&self) -> &RoomRules {
        &self.rules
    }

    pub fn catalog(&self) -> &Arc<CatalogService<C>> {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Seating
    // -----------------------------------------------------------------------

    /// Creates a lobby with `creator` as its judge and marks them online.
    ///
    /// # Errors
    /// - [`RoomError::Protocol`] if `creator` is not a valid name
    /// - [`RoomError::CodeSpaceExhausted`] if every generated code was taken
    /// - [`RoomError::Store`] if the store is unreachable
    pub async fn create_room(&self, creator: &str, cosmetics: &Cosmetics) -> Result<Room, RoomError> {
        let creator = PlayerName::new(creator)?;
        let catalog = self.catalog.catalog();

        for attempt in 1..=self.rules.max_code_attempts {
            let code = RoomCode::generate(&mut *self.lock_rng(), self.rules.code_length);
            let mut rejection = None;

            let commit = self
                .store
                .transaction(&room_path(&code), |current| {
                    rejection = None;
                    if current.as_ref().is_some_and(is_room_document) {
                        return TxOutcome::Abort;
                    }
                    let mut ctx = self.context(&catalog);
                    let room = rules::create(code.clone(), &creator, cosmetics, &mut ctx);
                    match dehydrate(&room, &catalog).to_value() {
                        Ok(value) => TxOutcome::Commit(Some(value)),
                        Err(e) => {
                            rejection = Some(RoomError::from(e));
                            TxOutcome::Abort
                        }
                    }
                })
                .await?;

            if let Some(e) = rejection {
                return Err(e);
            }
            if !commit.committed {
                tracing::debug!(%code, attempt, "room code taken, retrying");
                continue;
            }

            let room = decode(commit.snapshot, &catalog)?.ok_or(RoomError::NotFound(code))?;
            self.presence.connect(&room.code, &creator).await;
            tracing::info!(code = %room.code, %creator, "room created");
            return Ok(room);
        }

        tracing::warn!(attempts = self.rules.max_code_attempts, "no free room code");
        Err(RoomError::CodeSpaceExhausted(self.rules.max_code_attempts))
    }

    /// Seats `name` in the room, or reconnects them if already seated, and
    /// marks them online.
    ///
    /// # Errors
    /// - [`RoomError::Protocol`] if the code or the name is malformed
    /// - [`RoomError::NotFound`] if there is no such room
    /// - [`RoomError::GameOver`] if a new player tries to join a finished game
    pub async fn join_room(
        &self,
        code: &str,
        name: &str,
        cosmetics: &Cosmetics,
    ) -> Result<Room, RoomError> {
        let code = RoomCode::parse(code)?;
        let name = PlayerName::new(name)?;

        let outcome = self
            .mutate(&code, "join_room", |room, ctx| {
                rules::join(room, ctx, &name, cosmetics)
            })
            .await?;
        let room = match outcome {
            Outcome::Applied(room) => room,
            Outcome::Unchanged => self
                .room(&code)
                .await?
                .ok_or_else(|| RoomError::NotFound(code.clone()))?,
            Outcome::Missing => return Err(RoomError::NotFound(code)),
        };

        self.presence.connect(&code, &name).await;
        tracing::info!(%code, player = %name, players = room.players.len(), "player joined");
        Ok(room)
    }

    /// Marks `name` offline. Their seat, hand and score stay in the room
    /// so they can rejoin.
    pub async fn leave_room(&self, code: &RoomCode, name: &PlayerName) {
        self.presence.disconnect(code, name).await;
    }

    /// Removes `target` from the room. Creator only.
    pub async fn kick_player(
        &self,
        code: &RoomCode,
        requester: &PlayerName,
        target: &PlayerName,
    ) -> Result<Outcome, RoomError> {
        let outcome = self
            .mutate(code, "kick_player", |room, ctx| {
                rules::kick(room, ctx, requester, target)
            })
            .await?;
        if outcome.is_applied() {
            self.presence.forget(code, target).await;
            tracing::info!(%code, player = %target, "player kicked");
        }
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Game lifecycle
    // -----------------------------------------------------------------------

    /// Starts the game and deals the first round.
    ///
    /// # Errors
    /// [`RoomError::InvalidPointsToWin`] before touching the store if
    /// `points_to_win` isn't allowed; [`RoomError::GameOver`] for a
    /// finished room.
    pub async fn start_game(&self, code: &RoomCode, points_to_win: u32) -> Result<Outcome, RoomError> {
        let points = self.rules.validate_points_to_win(points_to_win)?;
        let outcome = self
            .mutate(code, "start_game", |room, ctx| rules::start(room, ctx, points))
            .await?;
        if let Outcome::Applied(room) = &outcome {
            tracing::info!(%code, points, players = room.players.len(), "game started");
        }
        Ok(outcome)
    }

    /// Re-deals the running game from fresh decks.
    pub async fn deal_cards(&self, code: &RoomCode) -> Result<Outcome, RoomError> {
        self.mutate(code, "deal_cards", rules::deal).await
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    pub async fn play_cards(
        &self,
        code: &RoomCode,
        name: &PlayerName,
        cards: &[String],
    ) -> Result<Outcome, RoomError> {
        self.mutate(code, "play_cards", |room, ctx| rules::play(room, ctx, name, cards))
            .await
    }

    /// Awards the round to `winner`.
    pub async fn confirm_judge_selection(
        &self,
        code: &RoomCode,
        winner: &PlayerName,
    ) -> Result<Outcome, RoomError> {
        let outcome = self
            .mutate(code, "confirm_judge_selection", |room, ctx| {
                rules::confirm_winner(room, ctx, winner)
            })
            .await?;
        if let Some(champion) = outcome.room().and_then(|room| room.game_winner.as_ref()) {
            tracing::info!(%code, winner = %champion, "game over");
        }
        Ok(outcome)
    }

    pub async fn next_round(&self, code: &RoomCode) -> Result<Outcome, RoomError> {
        self.mutate(code, "next_round", rules::next_round).await
    }

    pub async fn discard_card(
        &self,
        code: &RoomCode,
        name: &PlayerName,
        card: &str,
    ) -> Result<Outcome, RoomError> {
        self.mutate(code, "discard_card", |room, ctx| {
            rules::discard(room, ctx, name, card)
        })
        .await
    }

    pub async fn use_joker(&self, code: &RoomCode, name: &PlayerName) -> Result<Outcome, RoomError> {
        self.mutate(code, "use_joker", |room, ctx| rules::use_joker(room, ctx, name))
            .await
    }

    /// Ends the submission window early. Judge or creator only.
    pub async fn force_reveal(
        &self,
        code: &RoomCode,
        requester: &PlayerName,
    ) -> Result<Outcome, RoomError> {
        self.mutate(code, "force_reveal", |room, ctx| {
            rules::force_reveal(room, ctx, requester)
        })
        .await
    }

    /// Returns the player's hand to the pile and deals them a new one.
    /// Paying for it is the caller's business.
    pub async fn bribe_hand(&self, code: &RoomCode, name: &PlayerName) -> Result<Outcome, RoomError> {
        self.mutate(code, "bribe_hand", |room, ctx| rules::bribe(room, ctx, name))
            .await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The current state of a room, or `None` if it doesn't exist.
    pub async fn room(&self, code: &RoomCode) -> Result<Option<Room>, RoomError> {
        let value = self.store.get(&room_path(code)).await?;
        decode(value, &self.catalog.catalog())
    }

    /// Streams the hydrated room. The receiver starts with the current
    /// state; `None` means the room is gone. A value that fails to decode
    /// is logged and shows up as `None`.
    pub async fn watch_room(&self, code: &RoomCode) -> Result<watch::Receiver<Option<Room>>, RoomError> {
        let mut source = self.store.subscribe(&room_path(code)).await?;
        let catalog = Arc::clone(&self.catalog);

        let initial = source.borrow_and_update().clone();
        let (tx, rx) = watch::channel(decode_lossy(initial, &catalog.catalog(), code));

        let code = code.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let value = source.borrow_and_update().clone();
                        if tx.send(decode_lossy(value, &catalog.catalog(), &code)).is_err() {
                            break;
                        }
                    }
                    () = tx.closed() => break,
                }
            }
            tracing::debug!(%code, "room watch ended");
        });

        Ok(rx)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Runs `rule` as a transaction on the room at `code`.
    async fn mutate<F>(&self, code: &RoomCode, op: &'static str, mut rule: F) -> Result<Outcome, RoomError>
    where
        F: FnMut(&mut Room, &mut TxContext<'_>) -> Result<Change, RoomError> + Send,
    {
        let catalog = self.catalog.catalog();
        let mut rejection = None;

        let commit = self
            .store
            .transaction(&room_path(code), |current| {
                rejection = None;
                let Some(value) = current.filter(is_room_document) else {
                    return TxOutcome::Abort;
                };
                let mut room = match RawRoom::from_value(value) {
                    Ok(raw) => hydrate(raw, &catalog),
                    Err(e) => {
                        rejection = Some(RoomError::from(e));
                        return TxOutcome::Abort;
                    }
                };
                let mut ctx = self.context(&catalog);
                match rule(&mut room, &mut ctx) {
                    Ok(Change::Applied) => match dehydrate(&room, &catalog).to_value() {
                        Ok(value) => TxOutcome::Commit(Some(value)),
                        Err(e) => {
                            rejection = Some(RoomError::from(e));
                            TxOutcome::Abort
                        }
                    },
                    Ok(Change::Unchanged) => TxOutcome::Abort,
                    Err(e) => {
                        rejection = Some(e);
                        TxOutcome::Abort
                    }
                }
            })
            .await?;

        if let Some(e) = rejection {
            tracing::debug!(%code, op, error = %e, "room intent rejected");
            return Err(e);
        }

        if commit.committed {
            tracing::debug!(%code, op, attempts = commit.attempts, "room updated");
            return Ok(match decode(commit.snapshot, &catalog)? {
                Some(room) => Outcome::Applied(room),
                None => Outcome::Missing,
            });
        }
        if !commit.snapshot.as_ref().is_some_and(is_room_document) {
            tracing::debug!(%code, op, "room not found");
            return Ok(Outcome::Missing);
        }
        tracing::trace!(%code, op, "room unchanged");
        Ok(Outcome::Unchanged)
    }

    fn context<'a>(&'a self, catalog: &'a CardCatalog) -> TxContext<'a> {
        TxContext {
            now: self.store.server_time(),
            catalog,
            rules: &self.rules,
            rng: StdRng::from_rng(&mut *self.lock_rng()),
        }
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether `value` is a room rather than a stray presence write under a
/// room path that no longer holds one.
fn is_room_document(value: &Value) -> bool {
    value.get("code").is_some()
}

fn decode(value: Option<Value>, catalog: &CardCatalog) -> Result<Option<Room>, RoomError> {
    match value.filter(is_room_document) {
        Some(value) => Ok(Some(hydrate(RawRoom::from_value(value)?, catalog))),
        None => Ok(None),
    }
}

fn decode_lossy(value: Option<Value>, catalog: &CardCatalog, code: &RoomCode) -> Option<Room> {
    match decode(value, catalog) {
        Ok(room) => room,
        Err(e) => {
            tracing::warn!(%code, error = %e, "unreadable room document");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use blanks_catalog::OfflineSource;
    use blanks_store::{MemoryStore, StoreConfig};

    use super::*;

    fn service() -> (MemoryStore, RoomService<MemoryStore, OfflineSource>) {
        let store = MemoryStore::new(StoreConfig::default());
        store.pin_clock(5_000);
        let catalog = Arc::new(CatalogService::new(OfflineSource, None));
        let service =
            RoomService::new(Arc::new(store.clone()), catalog, RoomRules::default()).with_seed(11);
        (store, service)
    }

    #[test]
    fn test_outcome_room_only_for_applied() {
        assert!(Outcome::Unchanged.room().is_none());
        assert!(Outcome::Missing.into_room().is_none());
        assert!(!Outcome::Missing.is_applied());
    }

    #[tokio::test]
    async fn test_create_room_writes_lobby_and_marks_creator_online() {
        let (store, service) = service();

        let room = service.create_room("Alice", &Cosmetics::default()).await.unwrap();

        assert_eq!(room.code.as_str().len(), 6);
        assert_eq!(room.timestamp, 5_000);
        assert_eq!(store.pending_hooks(), 1);
        let stored = service.room(&room.code).await.unwrap().unwrap();
        assert!(stored.players[&room.creator].online);
    }

    #[tokio::test]
    async fn test_create_room_invalid_name_is_rejected() {
        let (_store, service) = service();
        let err = service.create_room("a/b", &Cosmetics::default()).await.unwrap_err();
        assert!(matches!(err, RoomError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_mutate_missing_room_is_missing() {
        let (_store, service) = service();
        let code = RoomCode::parse("ZZ99ZZ").unwrap();
        let outcome = service.deal_cards(&code).await.unwrap();
        assert_eq!(outcome, Outcome::Missing);
    }

    #[tokio::test]
    async fn test_start_game_bad_points_never_reaches_store() {
        let (store, service) = service();
        let room = service.create_room("Alice", &Cosmetics::default()).await.unwrap();
        store.go_offline();

        let err = service.start_game(&room.code, 4).await.unwrap_err();

        assert!(matches!(err, RoomError::InvalidPointsToWin { points: 4, .. }));
    }

    #[tokio::test]
    async fn test_mutate_unreadable_room_is_protocol_error() {
        let (store, service) = service();
        let code = RoomCode::parse("AB12CD").unwrap();
        store.write_now(&room_path(&code), Some(serde_json::json!({"code": 5})));

        let err = service.next_round(&code).await.unwrap_err();

        assert!(matches!(err, RoomError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_join_room_after_leave_on_unknown_code_is_not_found() {
        let (store, service) = service();
        let code = RoomCode::parse("ZZ99ZZ").unwrap();
        let bob = PlayerName::new("Bob").unwrap();

        service.leave_room(&code, &bob).await;
        assert!(store.get(&room_path(&code)).await.unwrap().is_none());

        let err = service.join_room("ZZ99ZZ", "Bob", &Cosmetics::default()).await.unwrap_err();
        assert!(matches!(err, RoomError::NotFound(c) if c == code));
    }

    #[tokio::test]
    async fn test_join_room_stray_player_node_is_not_found() {
        let (store, service) = service();
        let code = RoomCode::parse("ZZ99ZZ").unwrap();
        store.write_now(
            &room_path(&code),
            Some(serde_json::json!({"players": {"Bob": {"online": false, "lastSeen": 1}}})),
        );

        let err = service.join_room("ZZ99ZZ", "Bob", &Cosmetics::default()).await.unwrap_err();

        assert!(matches!(err, RoomError::NotFound(_)));
        assert!(service.room(&code).await.unwrap().is_none());
    }
}
