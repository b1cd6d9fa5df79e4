//! The player's profile and wallet, owned by another service.

use std::future::Future;

use blanks_protocol::{Cosmetics, PlayerName};

/// Read and spend access to a player's profile.
///
/// Wallet changes are never atomic with room changes. A caller that
/// spends before a room write refunds with [`grant`](Self::grant) if the
/// write doesn't go through.
pub trait ProfileStore: Send + Sync + 'static {
    fn balance(&self, player: &PlayerName) -> impl Future<Output = u64> + Send;

    /// Deducts `amount`. Returns `false`, leaving the balance alone, if
    /// the player can't afford it.
    fn spend(&self, player: &PlayerName, amount: u64) -> impl Future<Output = bool> + Send;

    fn grant(&self, player: &PlayerName, amount: u64) -> impl Future<Output = ()> + Send;

    fn is_unlocked(&self, player: &PlayerName, item: &str) -> impl Future<Output = bool> + Send;

    /// What the player looks like when they take a seat.
    fn cosmetics(&self, player: &PlayerName) -> impl Future<Output = Cosmetics> + Send;
}

/// A profile store for offline play: every action is free and nothing is
/// unlocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeProfile;

impl ProfileStore for FreeProfile {
    async fn balance(&self, _player: &PlayerName) -> u64 {
        0
    }

    async fn spend(&self, _player: &PlayerName, _amount: u64) -> bool {
        true
    }

    async fn grant(&self, _player: &PlayerName, _amount: u64) {}

    async fn is_unlocked(&self, _player: &PlayerName, _item: &str) -> bool {
        false
    }

    async fn cosmetics(&self, _player: &PlayerName) -> Cosmetics {
        Cosmetics::default()
    }
}
