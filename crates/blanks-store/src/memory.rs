//! An in-process document store.
//!
//! Every [`MemoryStore`] handle created from the same root (via
//! [`MemoryStore::connect`]) shares one document tree, the way several game
//! clients share one remote database. Each handle is its own connection:
//! it owns its on-disconnect hooks and can be taken offline or dropped
//! independently.
//!
//! # Locking
//!
//! The tree lives behind a `std::sync::Mutex`. The guard is never held
//! across an `.await`; transaction bodies run outside the lock and the
//! result is committed only if the value is still the one they saw.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::path::{get_at, resolve_server_values, set_at};
use crate::{
    ConnectionId, DisconnectWrite, DocPath, DocumentStore, HookId, StoreConfig, StoreError,
    TxCommit, TxOutcome,
};

/// A registered on-disconnect write.
struct Hook {
    connection: ConnectionId,
    path: DocPath,
    write: DisconnectWrite,
}

struct Subscriber {
    path: DocPath,
    sender: watch::Sender<Option<Value>>,
}

/// The shared tree and its bookkeeping.
struct Backend {
    root: Value,
    subscribers: Vec<Subscriber>,
    hooks: HashMap<HookId, Hook>,
    next_hook: u64,
    offline: HashSet<ConnectionId>,
    /// Fixed clock for deterministic tests; wall clock when `None`.
    pinned_clock: Option<u64>,
}

impl Backend {
    fn now(&self) -> u64 {
        self.pinned_clock.unwrap_or_else(wall_clock_millis)
    }

    fn read(&self, path: &DocPath) -> Option<Value> {
        get_at(&self.root, path).cloned()
    }

    /// Applies `writes` in order and notifies affected subscribers once.
    fn apply(&mut self, writes: Vec<(DocPath, Option<Value>)>) {
        let now = self.now();
        let mut touched = Vec::with_capacity(writes.len());
        for (path, mut value) in writes {
            if let Some(value) = value.as_mut() {
                resolve_server_values(value, now);
            }
            set_at(&mut self.root, &path, value);
            touched.push(path);
        }
        self.notify(&touched);
    }

    fn notify(&mut self, touched: &[DocPath]) {
        self.subscribers.retain(|sub| !sub.sender.is_closed());
        for sub in &self.subscribers {
            if !touched.iter().any(|path| path.overlaps(&sub.path)) {
                continue;
            }
            let current = get_at(&self.root, &sub.path).cloned();
            sub.sender.send_if_modified(|seen| {
                if *seen == current {
                    false
                } else {
                    *seen = current;
                    true
                }
            });
        }
    }
}

struct Shared {
    backend: Mutex<Backend>,
    config: StoreConfig,
    next_connection: AtomicU64,
}

/// An in-memory [`DocumentStore`].
///
/// Cloning a handle shares the connection; use [`MemoryStore::connect`]
/// for a second client.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    connection: ConnectionId,
}

impl MemoryStore {
    /// Creates an empty store and returns its first connection.
    pub fn new(config: StoreConfig) -> Self {
        let shared = Arc::new(Shared {
            backend: Mutex::new(Backend {
                root: Value::Object(Map::new()),
                subscribers: Vec::new(),
                hooks: HashMap::new(),
                next_hook: 1,
                offline: HashSet::new(),
                pinned_clock: None,
            }),
            config,
            next_connection: AtomicU64::new(2),
        });
        Self {
            shared,
            connection: ConnectionId::new(1),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Opens another connection to the same tree.
    pub fn connect(&self) -> Self {
        let id = self.shared.next_connection.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(connection = id, "store connection opened");
        Self {
            shared: Arc::clone(&self.shared),
            connection: ConnectionId::new(id),
        }
    }

    /// Simulates this connection dropping without cleanup: every hook it
    /// registered fires. The handle stays usable afterwards, as a client
    /// that reconnects.
    ///
    /// Returns how many hooks fired.
    pub fn drop_connection(&self) -> usize {
        let mut backend = self.lock();
        let fired: Vec<HookId> = backend
            .hooks
            .iter()
            .filter(|(_, hook)| hook.connection == self.connection)
            .map(|(id, _)| *id)
            .collect();

        let mut writes = Vec::new();
        for id in &fired {
            if let Some(hook) = backend.hooks.remove(id) {
                writes.extend(expand_hook(hook));
            }
        }
        backend.apply(writes);
        tracing::info!(connection = %self.connection, hooks = fired.len(), "connection dropped");
        fired.len()
    }

    /// Makes every operation on this connection fail with
    /// [`StoreError::Unavailable`] until [`MemoryStore::go_online`].
    pub fn go_offline(&self) {
        self.lock().offline.insert(self.connection);
    }

    pub fn go_online(&self) {
        self.lock().offline.remove(&self.connection);
    }

    /// Freezes the server clock at `millis`.
    pub fn pin_clock(&self, millis: u64) {
        self.lock().pinned_clock = Some(millis);
    }

    /// Writes synchronously, bypassing the connection's online state.
    ///
    /// Lets a test land a competing write while a transaction body of
    /// another client is running.
    pub fn write_now(&self, path: &DocPath, value: Option<Value>) {
        self.lock().apply(vec![(path.clone(), value)]);
    }

    /// Number of on-disconnect hooks currently registered on any connection.
    pub fn pending_hooks(&self) -> usize {
        self.lock().hooks.len()
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.shared
            .backend
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.lock().offline.contains(&self.connection) {
            return Err(StoreError::Unavailable(format!(
                "{} is offline",
                self.connection
            )));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    fn server_time(&self) -> u64 {
        self.lock().now()
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        self.ensure_online()?;
        Ok(self.lock().read(path))
    }

    async fn set(&self, path: &DocPath, value: Option<Value>) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.lock().apply(vec![(path.clone(), value)]);
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.ensure_online()?;
        let writes = merge_writes(path, fields)?;
        self.lock().apply(writes);
        Ok(())
    }

    async fn update_many(&self, writes: Vec<(DocPath, Option<Value>)>) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.lock().apply(writes);
        Ok(())
    }

    async fn transaction<F>(&self, path: &DocPath, mut update: F) -> Result<TxCommit, StoreError>
    where
        F: FnMut(Option<Value>) -> TxOutcome + Send,
    {
        self.ensure_online()?;
        let max_retries = self.shared.config.max_retries;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let seen = self.lock().read(path);
            let outcome = update(seen.clone());

            {
                let mut backend = self.lock();
                let current = backend.read(path);
                if current == seen {
                    return Ok(match outcome {
                        TxOutcome::Abort => TxCommit {
                            committed: false,
                            snapshot: current,
                            attempts,
                        },
                        TxOutcome::Commit(value) => {
                            backend.apply(vec![(path.clone(), value)]);
                            TxCommit {
                                committed: true,
                                snapshot: backend.read(path),
                                attempts,
                            }
                        }
                    });
                }
            }

            if attempts > max_retries {
                tracing::warn!(%path, attempts, "transaction gave up");
                return Err(StoreError::TooManyRetries {
                    path: path.to_string(),
                    attempts,
                });
            }
            tracing::trace!(%path, attempts, "transaction conflict, retrying");
            tokio::task::yield_now().await;
        }
    }

    async fn subscribe(
        &self,
        path: &DocPath,
    ) -> Result<watch::Receiver<Option<Value>>, StoreError> {
        self.ensure_online()?;
        let mut backend = self.lock();
        let (sender, receiver) = watch::channel(backend.read(path));
        backend.subscribers.push(Subscriber {
            path: path.clone(),
            sender,
        });
        Ok(receiver)
    }

    async fn on_disconnect(
        &self,
        path: &DocPath,
        write: DisconnectWrite,
    ) -> Result<HookId, StoreError> {
        self.ensure_online()?;
        let mut backend = self.lock();
        let id = HookId::new(backend.next_hook);
        backend.next_hook += 1;
        backend.hooks.insert(
            id,
            Hook {
                connection: self.connection,
                path: path.clone(),
                write,
            },
        );
        tracing::trace!(%path, hook = %id, "on-disconnect hook registered");
        Ok(id)
    }

    async fn cancel_on_disconnect(&self, hook: HookId) -> Result<bool, StoreError> {
        self.ensure_online()?;
        Ok(self.lock().hooks.remove(&hook).is_some())
    }
}

/// Turns an `update` field map into absolute writes.
fn merge_writes(
    base: &DocPath,
    fields: Map<String, Value>,
) -> Result<Vec<(DocPath, Option<Value>)>, StoreError> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let relative = DocPath::parse(&key)?;
            if relative.segments().is_empty() {
                return Err(StoreError::InvalidPath(key));
            }
            let value = (!value.is_null()).then_some(value);
            Ok((base.join(&relative), value))
        })
        .collect()
}

fn expand_hook(hook: Hook) -> Vec<(DocPath, Option<Value>)> {
    match hook.write {
        DisconnectWrite::Set(value) => vec![(hook.path, Some(value))],
        DisconnectWrite::Remove => vec![(hook.path, None)],
        DisconnectWrite::Update(fields) => match merge_writes(&hook.path, fields) {
            Ok(writes) => writes,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed disconnect hook");
                Vec::new()
            }
        },
    }
}

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[test]
    fn test_merge_writes_nested_keys_join_base() {
        let mut fields = Map::new();
        fields.insert("players/Bob/online".into(), json!(false));
        fields.insert("judge".into(), Value::Null);
        let writes = merge_writes(&p("rooms/A"), fields).unwrap();

        assert!(writes.contains(&(p("rooms/A/players/Bob/online"), Some(json!(false)))));
        assert!(writes.contains(&(p("rooms/A/judge"), None)));
    }

    #[test]
    fn test_merge_writes_empty_key_rejected() {
        let mut fields = Map::new();
        fields.insert("/".into(), json!(1));
        assert!(matches!(
            merge_writes(&p("rooms"), fields),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_gets_distinct_connection_ids() {
        let first = MemoryStore::new(StoreConfig::default());
        let second = first.connect();
        assert_ne!(first.connection_id(), second.connection_id());
        assert_eq!(first.clone().connection_id(), first.connection_id());
    }

    #[tokio::test]
    async fn test_pin_clock_resolves_server_timestamp() {
        let store = MemoryStore::new(StoreConfig::default());
        store.pin_clock(5_000);
        store
            .set(&p("x"), Some(json!({"at": crate::server_timestamp()})))
            .await
            .unwrap();
        assert_eq!(store.get(&p("x/at")).await.unwrap(), Some(json!(5_000)));
        assert_eq!(store.server_time(), 5_000);
    }
}
