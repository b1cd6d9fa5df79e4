//! The lobby browser: a live summary of every open room.

use std::sync::Arc;

use blanks_presence::rooms_path;
use blanks_protocol::{PlayerName, RawRoom, RoomCode, RoomPhase};
use blanks_store::DocumentStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::RoomError;

/// One row of the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub code: RoomCode,
    pub creator: PlayerName,
    /// Seated players. Entries left behind by a stray presence write are
    /// not counted.
    pub player_count: usize,
    pub online_count: usize,
    pub room_phase: RoomPhase,
    pub points_to_win: u32,
    /// Creation time, ms since the epoch.
    pub timestamp: u64,
}

impl RoomListing {
    fn from_raw(raw: &RawRoom) -> Self {
        let seated = raw.players.values().filter(|p| p.joined_at.is_some());
        let (player_count, online_count) =
            seated.fold((0, 0), |(all, online), p| (all + 1, online + usize::from(p.online)));
        Self {
            code: raw.code.clone(),
            creator: raw.creator.clone(),
            player_count,
            online_count,
            room_phase: raw.room_phase,
            points_to_win: raw.points_to_win,
            timestamp: raw.timestamp,
        }
    }
}

/// Lists joinable rooms: lobbies and games in progress, newest first.
/// Finished games are left out.
pub struct RoomDirectory<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> RoomDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<RoomListing>, RoomError> {
        let value = self.store.get(&rooms_path()).await?;
        Ok(listings(value))
    }

    /// Streams the listing. The receiver starts with the current list and
    /// updates whenever any room changes.
    pub async fn watch(&self) -> Result<watch::Receiver<Vec<RoomListing>>, RoomError> {
        let mut source = self.store.subscribe(&rooms_path()).await?;
        let initial = source.borrow_and_update().clone();
        let (tx, rx) = watch::channel(listings(initial));

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let value = source.borrow_and_update().clone();
                        let next = listings(value);
                        // Player moves inside a room often leave the summary as it was.
                        tx.send_if_modified(|current| {
                            if *current == next {
                                return false;
                            }
                            *current = next;
                            true
                        });
                    }
                    () = tx.closed() => break,
                }
            }
            tracing::debug!("room directory watch ended");
        });

        Ok(rx)
    }
}

fn listings(value: Option<Value>) -> Vec<RoomListing> {
    let Some(Value::Object(rooms)) = value else {
        return Vec::new();
    };

    let mut out: Vec<RoomListing> = rooms
        .into_iter()
        .filter_map(|(key, value)| match RawRoom::from_value(value) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::debug!(room = %key, error = %e, "skipping unreadable room");
                None
            }
        })
        .filter(|raw| raw.room_phase != RoomPhase::GameOver)
        .map(|raw| RoomListing::from_raw(&raw))
        .collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.code.cmp(&b.code)));
    out
}
