//! The presence manager: keeps each seat's `online` flag honest.
//!
//! For every seat this client occupies it holds at most one armed
//! on-disconnect hook. If the connection drops uncleanly the store fires
//! the hook and the player shows as offline to everyone else.
//!
//! # Concurrency note
//!
//! The seat table sits behind a `std::sync::Mutex` that is only held for
//! map lookups, never across a store round-trip.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blanks_protocol::{PlayerName, RoomCode};
use blanks_store::{DisconnectWrite, DocumentStore, HookId, TxOutcome, server_timestamp};
use serde_json::{Map, Value};

use crate::{PresenceError, PresenceState, Seat};

/// Tracks presence for every seat this client holds.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ [Connected] ──→ disconnect() ──→ [Disconnecting] ──→ [Offline]
///     ↑              │
///     └──────────────┘  (re-connect cancels the old hook first)
/// ```
///
/// The plain methods never fail: presence is best-effort, so store errors
/// are logged and swallowed. The `try_` methods return them.
pub struct PresenceManager<S: DocumentStore> {
    store: Arc<S>,
    seats: Mutex<HashMap<Seat, PresenceState>>,
}

impl<S: DocumentStore> PresenceManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            seats: Mutex::new(HashMap::new()),
        }
    }

    /// Marks the player online and arms a fresh on-disconnect hook.
    pub async fn connect(&self, code: &RoomCode, player: &PlayerName) -> PresenceState {
        let seat = Seat::new(code.clone(), player.clone());
        match self.try_connect(&seat).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(%seat, error = %e, "failed to record presence");
                self.state(code, player)
            }
        }
    }

    /// Marks the player offline after disarming their hook. The player
    /// keeps their seat in the room.
    pub async fn disconnect(&self, code: &RoomCode, player: &PlayerName) {
        let seat = Seat::new(code.clone(), player.clone());
        if let Err(e) = self.try_disconnect(&seat).await {
            tracing::warn!(%seat, error = %e, "failed to record leave");
        }
    }

    /// Drops a seat without writing anything, for a player who is no
    /// longer in the room. Their hook is cancelled so it can't recreate
    /// the entry.
    pub async fn forget(&self, code: &RoomCode, player: &PlayerName) {
        let seat = Seat::new(code.clone(), player.clone());
        let previous = self.lock().remove(&seat);
        if let Some(hook) = previous.and_then(|state| state.hook()) {
            self.cancel(&seat, hook).await;
        }
        tracing::debug!(%seat, "presence forgotten");
    }

    /// Disconnects every seat, e.g. when the client shuts down.
    pub async fn disconnect_all(&self) {
        let seats: Vec<Seat> = self.lock().keys().cloned().collect();
        for seat in seats {
            if let Err(e) = self.try_disconnect(&seat).await {
                tracing::warn!(%seat, error = %e, "failed to record leave on shutdown");
            }
        }
    }

    /// Like [`connect`](Self::connect), but returns store errors.
    ///
    /// # Errors
    /// [`PresenceError::Store`] if the online write or the hook
    /// registration fails. The seat's old hook is cancelled regardless.
    pub async fn try_connect(&self, seat: &Seat) -> Result<PresenceState, PresenceError> {
        // Invalidate the old hook before anything else, so it can't fire
        // after the new session is live.
        let previous = self.lock().remove(seat);
        if let Some(hook) = previous.and_then(|state| state.hook()) {
            self.cancel(seat, hook).await;
        }

        let path = seat.path();
        self.store.update(&path, presence_fields(true)).await?;
        let hook = self
            .store
            .on_disconnect(&path, DisconnectWrite::Update(presence_fields(false)))
            .await?;

        let state = PresenceState::Connected { hook };
        let displaced = self.lock().insert(seat.clone(), state);
        // A concurrent connect for the same seat armed its own hook; keep
        // only ours.
        if let Some(stale) = displaced.and_then(|state| state.hook()) {
            if stale != hook {
                self.cancel(seat, stale).await;
            }
        }

        tracing::info!(%seat, %hook, "player online");
        Ok(state)
    }

    /// Like [`disconnect`](Self::disconnect), but returns store errors.
    ///
    /// # Errors
    /// [`PresenceError::Store`] if the offline write fails. The seat ends
    /// `Offline` either way.
    pub async fn try_disconnect(&self, seat: &Seat) -> Result<(), PresenceError> {
        let hook = {
            let mut seats = self.lock();
            match seats.get(seat).copied() {
                Some(PresenceState::Connected { hook }) => {
                    seats.insert(seat.clone(), PresenceState::Disconnecting { hook });
                    Some(hook)
                }
                _ => None,
            }
        };

        // Cancel first: the hook must not fire after our own offline write.
        if let Some(hook) = hook {
            self.cancel(seat, hook).await;
        }
        // Only an existing seat is marked offline.
        let written = self
            .store
            .transaction(&seat.path(), |current| match current {
                Some(Value::Object(mut player)) => {
                    player.extend(presence_fields(false));
                    TxOutcome::Commit(Some(Value::Object(player)))
                }
                _ => TxOutcome::Abort,
            })
            .await;

        {
            let mut seats = self.lock();
            if seats.get(seat).and_then(PresenceState::hook) == hook {
                seats.remove(seat);
            }
        }

        if !written?.committed {
            tracing::debug!(%seat, "seat gone, nothing to mark offline");
            return Ok(());
        }
        tracing::info!(%seat, "player offline");
        Ok(())
    }

    /// Current state of a seat. Untracked seats are `Offline`.
    pub fn state(&self, code: &RoomCode, player: &PlayerName) -> PresenceState {
        let seat = Seat::new(code.clone(), player.clone());
        self.lock()
            .get(&seat)
            .copied()
            .unwrap_or(PresenceState::Offline)
    }

    /// Number of seats with an armed hook.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    async fn cancel(&self, seat: &Seat, hook: HookId) {
        match self.store.cancel_on_disconnect(hook).await {
            Ok(true) => tracing::debug!(%seat, %hook, "hook cancelled"),
            Ok(false) => tracing::debug!(%seat, %hook, "hook already gone"),
            Err(e) => tracing::warn!(%seat, %hook, error = %e, "failed to cancel hook"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Seat, PresenceState>> {
        self.seats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The fields presence owns on a player entry.
fn presence_fields(online: bool) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("online".into(), Value::Bool(online));
    fields.insert("lastSeen".into(), server_timestamp());
    fields
}
