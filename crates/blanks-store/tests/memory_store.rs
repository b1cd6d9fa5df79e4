//! Integration tests for `MemoryStore` through the `DocumentStore` trait.
//!
//! Two handles from `connect()` play the part of two game clients sharing
//! one database.

use std::sync::atomic::{AtomicU32, Ordering};

use blanks_store::{
    DisconnectWrite, DocPath, DocumentStore, MemoryStore, StoreConfig, StoreError, TxOutcome,
    server_timestamp,
};
use serde_json::{Map, Value, json};

fn p(raw: &str) -> DocPath {
    DocPath::parse(raw).unwrap()
}

fn store() -> MemoryStore {
    MemoryStore::new(StoreConfig::default())
}

// =========================================================================
// Reads and writes
// =========================================================================

#[tokio::test]
async fn test_set_then_get_from_other_connection() {
    let alice = store();
    let bob = alice.connect();

    alice
        .set(&p("rooms/AB12CD/judge"), Some(json!("Alice")))
        .await
        .unwrap();

    assert_eq!(
        bob.get(&p("rooms/AB12CD/judge")).await.unwrap(),
        Some(json!("Alice"))
    );
    assert_eq!(bob.get(&p("rooms/ZZZZZZ")).await.unwrap(), None);
}

#[tokio::test]
async fn test_update_merges_without_touching_siblings() {
    let store = store();
    store
        .set(
            &p("rooms/A/players/Bob"),
            Some(json!({"online": true, "hand": [1, 2, 3]})),
        )
        .await
        .unwrap();

    let mut fields = Map::new();
    fields.insert("online".into(), json!(false));
    fields.insert("lastSeen".into(), json!(99));
    store
        .update(&p("rooms/A/players/Bob"), fields)
        .await
        .unwrap();

    assert_eq!(
        store.get(&p("rooms/A/players/Bob")).await.unwrap(),
        Some(json!({"online": false, "lastSeen": 99, "hand": [1, 2, 3]}))
    );
}

#[tokio::test]
async fn test_update_many_applies_deletes_and_writes_together() {
    let store = store();
    store
        .set(&p("rooms"), Some(json!({"A": {"x": 1}, "B": {"x": 2}})))
        .await
        .unwrap();

    store
        .update_many(vec![(p("rooms/A"), None), (p("rooms/C/x"), Some(json!(3)))])
        .await
        .unwrap();

    assert_eq!(
        store.get(&p("rooms")).await.unwrap(),
        Some(json!({"B": {"x": 2}, "C": {"x": 3}}))
    );
}

#[tokio::test]
async fn test_offline_connection_fails_with_unavailable() {
    let store = store();
    store.go_offline();

    let result = store.get(&p("rooms")).await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));

    store.go_online();
    assert!(store.get(&p("rooms")).await.is_ok());
}

// =========================================================================
// Transactions
// =========================================================================

#[tokio::test]
async fn test_transaction_commit_writes_value() {
    let store = store();
    store.set(&p("counter"), Some(json!(1))).await.unwrap();

    let commit = store
        .transaction(&p("counter"), |current| {
            let n = current.and_then(|v| v.as_u64()).unwrap_or(0);
            TxOutcome::Commit(Some(json!(n + 1)))
        })
        .await
        .unwrap();

    assert!(commit.committed);
    assert_eq!(commit.attempts, 1);
    assert_eq!(commit.snapshot, Some(json!(2)));
}

#[tokio::test]
async fn test_transaction_abort_leaves_value() {
    let store = store();
    store.set(&p("counter"), Some(json!(7))).await.unwrap();

    let commit = store
        .transaction(&p("counter"), |_| TxOutcome::Abort)
        .await
        .unwrap();

    assert!(!commit.committed);
    assert_eq!(commit.snapshot, Some(json!(7)));
}

#[tokio::test]
async fn test_transaction_absent_value_seen_as_none() {
    let store = store();
    let commit = store
        .transaction(&p("rooms/NOPE"), |current| {
            assert!(current.is_none());
            TxOutcome::Abort
        })
        .await
        .unwrap();
    assert_eq!(commit.snapshot, None);
}

#[tokio::test]
async fn test_transaction_conflict_retries_and_sees_new_value() {
    let alice = store();
    let bob = alice.connect();
    alice.set(&p("counter"), Some(json!(10))).await.unwrap();

    let seen = std::sync::Mutex::new(Vec::new());
    let commit = alice
        .transaction(&p("counter"), |current| {
            let n = current.and_then(|v| v.as_u64()).unwrap_or(0);
            let mut seen = seen.lock().unwrap();
            seen.push(n);
            if seen.len() == 1 {
                // Bob's write lands while Alice's first attempt is in flight.
                bob.write_now(&p("counter"), Some(json!(20)));
            }
            TxOutcome::Commit(Some(json!(n + 1)))
        })
        .await
        .unwrap();

    assert_eq!(commit.attempts, 2);
    assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
    assert_eq!(alice.get(&p("counter")).await.unwrap(), Some(json!(21)));
}

#[tokio::test]
async fn test_transaction_endless_conflict_gives_up() {
    let alice = MemoryStore::new(StoreConfig { max_retries: 3 });
    let bob = alice.connect();
    let runs = AtomicU32::new(0);

    let result = alice
        .transaction(&p("counter"), |_| {
            let n = runs.fetch_add(1, Ordering::SeqCst);
            bob.write_now(&p("counter"), Some(json!(n)));
            TxOutcome::Commit(Some(json!("mine")))
        })
        .await;

    assert!(matches!(
        result,
        Err(StoreError::TooManyRetries { attempts: 4, .. })
    ));
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

// =========================================================================
// Subscriptions
// =========================================================================

#[tokio::test]
async fn test_subscribe_starts_with_current_and_sees_changes() {
    let alice = store();
    let bob = alice.connect();
    alice.set(&p("rooms/A/judge"), Some(json!("Alice"))).await.unwrap();

    let mut rx = bob.subscribe(&p("rooms/A")).await.unwrap();
    assert_eq!(*rx.borrow(), Some(json!({"judge": "Alice"})));

    alice.set(&p("rooms/A/judge"), Some(json!("Bob"))).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), Some(json!({"judge": "Bob"})));
}

#[tokio::test]
async fn test_subscribe_unrelated_write_does_not_wake() {
    let store = store();
    let mut rx = store.subscribe(&p("rooms/A")).await.unwrap();
    store.set(&p("rooms/B/judge"), Some(json!("Cara"))).await.unwrap();
    assert!(!rx.has_changed().unwrap());

    store.set(&p("rooms"), None).await.unwrap();
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_subscribe_sees_delete_as_none() {
    let store = store();
    store.set(&p("rooms/A/x"), Some(json!(1))).await.unwrap();
    let mut rx = store.subscribe(&p("rooms/A")).await.unwrap();

    store.set(&p("rooms/A"), None).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), None::<Value>);
}

// =========================================================================
// On-disconnect hooks
// =========================================================================

fn offline_fields() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("online".into(), json!(false));
    fields.insert("lastSeen".into(), server_timestamp());
    fields
}

#[tokio::test]
async fn test_drop_connection_fires_own_hooks_only() {
    let alice = store();
    let bob = alice.connect();
    alice.pin_clock(1_000);
    let alice_path = p("rooms/A/players/Alice");
    let bob_path = p("rooms/A/players/Bob");
    alice.set(&alice_path, Some(json!({"online": true}))).await.unwrap();
    bob.set(&bob_path, Some(json!({"online": true}))).await.unwrap();

    alice
        .on_disconnect(&alice_path, DisconnectWrite::Update(offline_fields()))
        .await
        .unwrap();
    bob.on_disconnect(&bob_path, DisconnectWrite::Update(offline_fields()))
        .await
        .unwrap();

    assert_eq!(alice.drop_connection(), 1);

    assert_eq!(
        bob.get(&alice_path).await.unwrap(),
        Some(json!({"online": false, "lastSeen": 1_000}))
    );
    assert_eq!(
        bob.get(&bob_path).await.unwrap(),
        Some(json!({"online": true}))
    );
    assert_eq!(alice.pending_hooks(), 1);
}

#[tokio::test]
async fn test_cancelled_hook_never_fires() {
    let store = store();
    let path = p("rooms/A/players/Alice/online");
    store.set(&path, Some(json!(true))).await.unwrap();

    let hook = store
        .on_disconnect(&path, DisconnectWrite::Set(json!(false)))
        .await
        .unwrap();
    assert!(store.cancel_on_disconnect(hook).await.unwrap());
    assert!(!store.cancel_on_disconnect(hook).await.unwrap());

    assert_eq!(store.drop_connection(), 0);
    assert_eq!(store.get(&path).await.unwrap(), Some(json!(true)));
}

#[tokio::test]
async fn test_remove_hook_deletes_node() {
    let store = store();
    let path = p("lobby/Alice");
    store.set(&path, Some(json!({"here": true}))).await.unwrap();
    store
        .on_disconnect(&path, DisconnectWrite::Remove)
        .await
        .unwrap();

    store.drop_connection();
    assert_eq!(store.get(&path).await.unwrap(), None);
}
