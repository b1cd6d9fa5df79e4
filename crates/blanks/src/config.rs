//! Client configuration loaded from environment variables.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use blanks_room::RoomRules;
use blanks_store::StoreConfig;

use crate::BlanksError;

/// Coins a full mulligan costs unless `BLANKS_BRIBE_COST` says otherwise.
pub const DEFAULT_BRIBE_COST: u64 = 50;

/// Everything a [`GameClient`](crate::GameClient) needs besides its
/// collaborators.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where the last fetched card catalog is cached. `None` disables the
    /// cache.
    pub catalog_cache: Option<PathBuf>,

    pub rules: RoomRules,

    /// Applied by [`GameClient::in_memory`](crate::GameClient::in_memory).
    /// A caller that passes its own store to
    /// [`GameClient::builder`](crate::GameClient::builder) configures that
    /// store itself.
    pub store: StoreConfig,

    pub bribe_cost: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            catalog_cache: None,
            rules: RoomRules::default(),
            store: StoreConfig::default(),
            bribe_cost: DEFAULT_BRIBE_COST,
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment:
    ///
    /// | Variable | Meaning | Default |
    /// |----------|---------|---------|
    /// | `BLANKS_CATALOG_CACHE` | catalog cache file | none |
    /// | `BLANKS_POINTS_TO_WIN` | `pointsToWin` of new rooms | 7 |
    /// | `BLANKS_MAX_TX_RETRIES` | transaction retry limit | 25 |
    /// | `BLANKS_BRIBE_COST` | price of a full mulligan | 50 |
    ///
    /// # Errors
    /// [`BlanksError::Config`] for a value that doesn't parse, and
    /// [`BlanksError::Room`] for a points value outside the allowed set.
    pub fn from_env() -> Result<Self, BlanksError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BlanksError> {
        let mut config = Self::default();

        if let Some(path) = lookup("BLANKS_CATALOG_CACHE").filter(|p| !p.trim().is_empty()) {
            config.catalog_cache = Some(PathBuf::from(path));
        }
        if let Some(points) = parse_var::<u32>(&lookup, "BLANKS_POINTS_TO_WIN")? {
            config.rules.default_points_to_win = config.rules.validate_points_to_win(points)?;
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "BLANKS_MAX_TX_RETRIES")? {
            config.store.max_retries = retries;
        }
        if let Some(cost) = parse_var::<u64>(&lookup, "BLANKS_BRIBE_COST")? {
            config.bribe_cost = cost;
        }

        tracing::debug!(
            cache = ?config.catalog_cache,
            points_to_win = config.rules.default_points_to_win,
            max_retries = config.store.max_retries,
            bribe_cost = config.bribe_cost,
            "client configuration loaded"
        );
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, BlanksError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| BlanksError::Config {
            var,
            detail: format!("{raw:?}: {e}"),
        })
}
