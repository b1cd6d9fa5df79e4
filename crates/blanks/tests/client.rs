//! Integration tests for `GameClient`: several devices sharing one store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blanks::prelude::*;
use blanks::presence::room_path;
use blanks::protocol::CatalogData;
use blanks::DEFAULT_BRIBE_COST;

// =========================================================================
// Collaborators
// =========================================================================

/// Coin balances keyed by player name.
#[derive(Clone, Default)]
struct Wallets(Arc<Mutex<HashMap<String, u64>>>);

impl Wallets {
    fn with(balances: &[(&str, u64)]) -> Self {
        let map = balances.iter().map(|(p, b)| (p.to_string(), *b)).collect();
        Self(Arc::new(Mutex::new(map)))
    }

    fn of(&self, player: &str) -> u64 {
        self.0.lock().unwrap().get(player).copied().unwrap_or(0)
    }
}

impl ProfileStore for Wallets {
    async fn balance(&self, player: &PlayerName) -> u64 {
        self.of(player.as_str())
    }

    async fn spend(&self, player: &PlayerName, amount: u64) -> bool {
        let mut wallets = self.0.lock().unwrap();
        let balance = wallets.entry(player.to_string()).or_insert(0);
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    async fn grant(&self, player: &PlayerName, amount: u64) {
        *self.0.lock().unwrap().entry(player.to_string()).or_insert(0) += amount;
    }

    async fn is_unlocked(&self, _player: &PlayerName, _item: &str) -> bool {
        false
    }

    async fn cosmetics(&self, player: &PlayerName) -> Cosmetics {
        Cosmetics {
            avatar: format!("{}.png", player.as_str().to_lowercase()),
            color: Some("#43A047".into()),
            ..Cosmetics::default()
        }
    }
}

/// Remembers every cue it is given.
#[derive(Clone, Default)]
struct Cues(Arc<Mutex<Vec<FeedbackCue>>>);

impl Cues {
    fn take(&self) -> Vec<FeedbackCue> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl FeedbackSink for Cues {
    fn cue(&self, cue: FeedbackCue) {
        self.0.lock().unwrap().push(cue);
    }
}

type Client = GameClient<MemoryStore, StaticSource, Wallets, Cues>;

fn deck() -> CatalogData {
    CatalogData {
        version: "test-1".into(),
        prompt_cards: (0..8).map(|i| PromptCard::new(format!("Prompt {i} ____."))).collect(),
        answer_cards: (0..60).map(|i| format!("Answer {i}.")).collect(),
    }
}

async fn device(store: &MemoryStore, wallets: &Wallets, cues: &Cues, seed: u64) -> Client {
    GameClient::builder(Arc::new(store.clone()), StaticSource::new(deck()))
        .profiles(wallets.clone())
        .feedback(cues.clone())
        .seed(seed)
        .build()
        .await
}

fn store() -> MemoryStore {
    let store = MemoryStore::new(StoreConfig::default());
    store.pin_clock(10_000);
    store
}

// =========================================================================
// Flow
// =========================================================================

#[tokio::test]
async fn test_two_devices_create_join_and_start() {
    let store = store();
    let (wallets, alice_cues, bob_cues) = (Wallets::default(), Cues::default(), Cues::default());
    let alice = device(&store, &wallets, &alice_cues, 1).await;
    let bob = device(&store.connect(), &wallets, &bob_cues, 2).await;

    let room = alice.create_room("Alice").await.unwrap();
    let code = room.code.to_string();
    bob.join_room(&code, "Bob").await.unwrap();
    let outcome = alice.start_game(&code, Some(3)).await.unwrap();

    let room = outcome.into_room().expect("game started");
    assert_eq!(room.room_phase, RoomPhase::InProgress);
    assert_eq!(room.points_to_win, 3);
    assert_eq!(room.players[&PlayerName::new("Alice").unwrap()].avatar, "alice.png");
    assert_eq!(room.players[&PlayerName::new("Alice").unwrap()].color, "#43A047");
    assert_ne!(room.players[&PlayerName::new("Bob").unwrap()].color, "#43A047");
    assert_eq!(alice_cues.take(), [FeedbackCue::Joined, FeedbackCue::GameStarted]);
    assert_eq!(bob_cues.take(), [FeedbackCue::Joined]);
}

#[tokio::test]
async fn test_in_memory_applies_configured_retry_limit() {
    let config = ClientConfig::from_lookup(|key| {
        (key == "BLANKS_MAX_TX_RETRIES").then(|| "3".to_string())
    })
    .unwrap();
    let alice = GameClient::in_memory(config, StaticSource::new(deck())).build().await;

    assert_eq!(alice.rooms().store().config().max_retries, 3);
    let room = alice.create_room("Alice").await.unwrap();
    assert!(alice.room(room.code.as_str()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_start_game_without_points_uses_configured_default() {
    let store = store();
    let config = ClientConfig::from_lookup(|key| {
        (key == "BLANKS_POINTS_TO_WIN").then(|| "5".to_string())
    })
    .unwrap();
    let alice = GameClient::builder(Arc::new(store.clone()), StaticSource::new(deck()))
        .config(config)
        .build()
        .await;

    let room = alice.create_room("Alice").await.unwrap();
    assert_eq!(room.points_to_win, 5);
    let room = alice
        .start_game(room.code.as_str(), None)
        .await
        .unwrap()
        .into_room()
        .unwrap();

    assert_eq!(room.points_to_win, 5);
}

#[tokio::test]
async fn test_last_submission_cues_reveal() {
    let store = store();
    let (wallets, cues) = (Wallets::default(), Cues::default());
    let alice = device(&store, &wallets, &cues, 1).await;
    let room = alice.create_room("Alice").await.unwrap();
    let code = room.code.to_string();
    alice.join_room(&code, "Bob").await.unwrap();
    alice.start_game(&code, None).await.unwrap();
    cues.take();

    let room = alice.room(&code).await.unwrap().unwrap();
    let card = room.players[&PlayerName::new("Bob").unwrap()].hand[0].clone();
    alice.play_cards(&code, "Bob", &[card]).await.unwrap();
    alice.confirm_judge_selection(&code, "Bob").await.unwrap();

    assert_eq!(cues.take(), [FeedbackCue::Reveal, FeedbackCue::RoundWon]);
}

#[tokio::test]
async fn test_room_document_stores_known_cards_as_indices() {
    let store = store();
    let alice = device(&store, &Wallets::default(), &Cues::default(), 1).await;
    let room = alice.create_room("Alice").await.unwrap();
    alice.join_room(room.code.as_str(), "Bob").await.unwrap();
    alice.start_game(room.code.as_str(), None).await.unwrap();

    let raw = store.get(&room_path(&room.code)).await.unwrap().unwrap();

    let hand = raw["players"]["Bob"]["hand"].as_array().unwrap();
    assert_eq!(hand.len(), 10);
    assert!(hand.iter().all(serde_json::Value::is_i64));
    assert!(raw["promptCard"].is_i64());
}

// =========================================================================
// Validation and rejections
// =========================================================================

#[tokio::test]
async fn test_bad_input_is_rejected_before_the_store() {
    let store = store();
    let cues = Cues::default();
    let alice = device(&store, &Wallets::default(), &cues, 1).await;
    store.go_offline();

    let empty = alice.create_room("   ").await.unwrap_err();
    let bad_code = alice.join_room("AB-12", "Bob").await.unwrap_err();

    assert!(matches!(empty, BlanksError::Protocol(_)));
    assert!(matches!(bad_code, BlanksError::Protocol(_)));
    assert!(!empty.to_string().is_empty());
}

#[tokio::test]
async fn test_rejected_intent_cues_rejected() {
    let store = store();
    let cues = Cues::default();
    let alice = device(&store, &Wallets::default(), &cues, 1).await;
    let room = alice.create_room("Alice").await.unwrap();
    alice.join_room(room.code.as_str(), "Bob").await.unwrap();
    cues.take();

    let err = alice
        .kick_player(room.code.as_str(), "Bob", "Alice")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("creator"));
    assert_eq!(cues.take(), [FeedbackCue::Rejected]);
}

// =========================================================================
// Bribes
// =========================================================================

async fn game_with_bob(store: &MemoryStore, wallets: &Wallets) -> (Client, String) {
    let alice = device(store, wallets, &Cues::default(), 1).await;
    let room = alice.create_room("Alice").await.unwrap();
    let code = room.code.to_string();
    alice.join_room(&code, "Bob").await.unwrap();
    alice.start_game(&code, None).await.unwrap();
    (alice, code)
}

#[tokio::test]
async fn test_bribe_hand_charges_and_redeals() {
    let store = store();
    let wallets = Wallets::with(&[("Bob", 120)]);
    let (client, code) = game_with_bob(&store, &wallets).await;

    let outcome = client.bribe_hand(&code, "Bob").await.unwrap();

    assert!(outcome.is_applied());
    assert_eq!(wallets.of("Bob"), 120 - DEFAULT_BRIBE_COST);
}

#[tokio::test]
async fn test_bribe_hand_broke_player_keeps_hand() {
    let store = store();
    let wallets = Wallets::with(&[("Bob", 10)]);
    let (client, code) = game_with_bob(&store, &wallets).await;
    let before = client.room(&code).await.unwrap().unwrap();

    let err = client.bribe_hand(&code, "Bob").await.unwrap_err();

    assert!(matches!(err, BlanksError::InsufficientFunds { cost: 50, .. }));
    assert_eq!(wallets.of("Bob"), 10);
    assert_eq!(client.room(&code).await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_bribe_hand_in_lobby_is_refunded() {
    let store = store();
    let wallets = Wallets::with(&[("Bob", 80)]);
    let client = device(&store, &wallets, &Cues::default(), 1).await;
    let room = client.create_room("Alice").await.unwrap();
    client.join_room(room.code.as_str(), "Bob").await.unwrap();

    let outcome = client.bribe_hand(room.code.as_str(), "Bob").await.unwrap();

    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(wallets.of("Bob"), 80);
}

#[tokio::test]
async fn test_bribe_hand_store_down_is_refunded() {
    let store = store();
    let wallets = Wallets::with(&[("Bob", 80)]);
    let (client, code) = game_with_bob(&store, &wallets).await;
    store.go_offline();

    let err = client.bribe_hand(&code, "Bob").await.unwrap_err();

    assert!(matches!(err, BlanksError::Room(_)));
    assert_eq!(wallets.of("Bob"), 80);
}

// =========================================================================
// Presence, watching and the room list
// =========================================================================

#[tokio::test]
async fn test_dropped_device_shows_offline_to_others() {
    let store = store();
    let wallets = Wallets::default();
    let alice = device(&store, &wallets, &Cues::default(), 1).await;
    let bob_connection = store.connect();
    let bob = device(&bob_connection, &wallets, &Cues::default(), 2).await;
    let room = alice.create_room("Alice").await.unwrap();
    let code = room.code.to_string();
    bob.join_room(&code, "Bob").await.unwrap();
    let mut rx = alice.watch_room(&code).await.unwrap();
    rx.borrow_and_update();

    bob_connection.drop_connection();

    tokio::time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("update within a second")
        .unwrap();
    let seen = rx.borrow().clone().expect("room exists");
    let bob_seat = &seen.players[&PlayerName::new("Bob").unwrap()];
    assert!(!bob_seat.online);
    assert!(seen.players[&PlayerName::new("Alice").unwrap()].online);
}

#[tokio::test]
async fn test_shutdown_marks_every_seat_offline() {
    let store = store();
    let alice = device(&store, &Wallets::default(), &Cues::default(), 1).await;
    let room = alice.create_room("Alice").await.unwrap();

    alice.shutdown().await;

    let room = alice.room(room.code.as_str()).await.unwrap().unwrap();
    assert!(!room.players[&PlayerName::new("Alice").unwrap()].online);
    assert_eq!(store.pending_hooks(), 0);
}

#[tokio::test]
async fn test_list_rooms_hides_finished_games() {
    let store = store();
    let alice = device(&store, &Wallets::default(), &Cues::default(), 1).await;
    let open = alice.create_room("Alice").await.unwrap();
    let finished = alice.create_room("Dora").await.unwrap();
    let code = finished.code.to_string();
    alice.join_room(&code, "Eve").await.unwrap();
    alice.start_game(&code, Some(3)).await.unwrap();
    for _ in 0..3 {
        let room = alice.room(&code).await.unwrap().unwrap();
        let player = if room.judge.as_str() == "Dora" { "Eve" } else { "Dora" };
        let card = room.players[&PlayerName::new(player).unwrap()].hand[0].clone();
        alice.play_cards(&code, player, &[card]).await.unwrap();
        alice.confirm_judge_selection(&code, "Eve").await.unwrap();
        alice.next_round(&code).await.unwrap();
    }

    let list = alice.list_rooms().await.unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].code, open.code);
    assert_eq!(list[0].online_count, 1);
}
