//! Document store abstraction for Blanks.
//!
//! Provides the [`DocumentStore`] trait, the only way the game core reads
//! and writes shared state, and [`MemoryStore`], an in-process
//! implementation with the same semantics as a hosted realtime database:
//!
//! - point reads and writes, partial-field merges, atomic multi-path updates
//! - compare-and-swap transactions that are retried on conflict
//! - live subscriptions
//! - writes registered to run when a connection drops uncleanly
//!
//! Values are `serde_json::Value` trees addressed by [`DocPath`].

mod config;
mod error;
mod memory;
mod path;

pub use config::StoreConfig;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use path::{DocPath, server_timestamp};

use std::fmt;
use std::future::Future;

use serde_json::{Map, Value};
use tokio::sync::watch;

/// Opaque identifier for a client's connection to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Token for a registered on-disconnect write. Needed to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl HookId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// What a transaction body decides after looking at the current value.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// Replace the value with this one (`None` deletes it).
    Commit(Option<Value>),
    /// Leave the value alone and finish without writing.
    Abort,
}

/// Result of a finished transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxCommit {
    /// `true` if the body's value was written.
    pub committed: bool,
    /// The value at the path when the transaction finished.
    pub snapshot: Option<Value>,
    /// How many times the body ran.
    pub attempts: u32,
}

/// A write the store applies on its own when a connection drops.
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectWrite {
    Set(Value),
    Update(Map<String, Value>),
    Remove,
}

/// A hierarchical, key-path addressed remote document store.
///
/// Every method is an asynchronous round-trip and may fail; none of them
/// can be cancelled once submitted.
pub trait DocumentStore: Send + Sync + 'static {
    /// Identifies this client's connection.
    fn connection_id(&self) -> ConnectionId;

    /// The store's clock in milliseconds since the Unix epoch, the same
    /// clock that resolves [`server_timestamp`] placeholders.
    fn server_time(&self) -> u64;

    /// Reads the value at `path`. Absent values are `None`.
    fn get(&self, path: &DocPath) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Overwrites the value at `path` (`None` deletes it).
    fn set(
        &self,
        path: &DocPath,
        value: Option<Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merges `fields` into the object at `path`. Keys may be relative
    /// paths (`players/Bob/online`); a `null` value deletes the key.
    fn update(
        &self,
        path: &DocPath,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Applies several writes atomically.
    fn update_many(
        &self,
        writes: Vec<(DocPath, Option<Value>)>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Runs a read-modify-write transaction at `path`.
    ///
    /// `update` receives the current value and decides what to write. If
    /// another client changed the value in the meantime, the store runs
    /// `update` again on the new value, so it must be free of side effects.
    fn transaction<F>(
        &self,
        path: &DocPath,
        update: F,
    ) -> impl Future<Output = Result<TxCommit, StoreError>> + Send
    where
        F: FnMut(Option<Value>) -> TxOutcome + Send;

    /// Subscribes to the value at `path`. The receiver starts with the
    /// current value and sees every later change.
    fn subscribe(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<watch::Receiver<Option<Value>>, StoreError>> + Send;

    /// Registers `write` to be applied at `path` if this connection drops
    /// without cleaning up.
    fn on_disconnect(
        &self,
        path: &DocPath,
        write: DisconnectWrite,
    ) -> impl Future<Output = Result<HookId, StoreError>> + Send;

    /// Cancels a registered on-disconnect write. Returns `false` if the
    /// hook had already fired or been cancelled.
    fn cancel_on_disconnect(&self, hook: HookId)
    -> impl Future<Output = Result<bool, StoreError>> + Send;
}
