//! The catalog service: last-known-good catalog with versioned refresh.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use blanks_protocol::{CardCatalog, CatalogData, ProtocolError};

use crate::{CatalogError, CatalogSource};

const BUNDLED_DECK: &str = include_str!("../data/default_deck.json");

/// Parses the deck compiled into the binary.
pub fn bundled() -> CardCatalog {
    let data: CatalogData = serde_json::from_str(BUNDLED_DECK).expect("bundled deck is valid JSON");
    CardCatalog::new(data)
}

/// Serves the current card catalog and refreshes it from a remote source.
///
/// The catalog is swapped wholesale behind an `Arc`, so readers holding a
/// snapshot (for example an in-flight room transaction) keep a consistent
/// view while a refresh lands.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ initialize() ──→ [catalog() / refresh()]* ──→ dispose()
/// ```
///
/// Load order on `initialize()`: bundled deck, then the local cache if it
/// exists, then the remote source if it is reachable and newer.
pub struct CatalogService<S: CatalogSource> {
    source: S,
    cache_path: Option<PathBuf>,
    current: RwLock<Arc<CardCatalog>>,
}

impl<S: CatalogSource> CatalogService<S> {
    /// Creates a service serving the bundled deck until initialized.
    pub fn new(source: S, cache_path: Option<PathBuf>) -> Self {
        Self {
            source,
            cache_path,
            current: RwLock::new(Arc::new(bundled())),
        }
    }

    /// Loads the cache and checks the remote source. Never fails: every
    /// problem is logged and the best catalog available so far is kept.
    pub async fn initialize(&self) -> Arc<CardCatalog> {
        match self.load_cache().await {
            Ok(Some(catalog)) => {
                tracing::info!(version = catalog.version(), "catalog loaded from cache");
                self.swap(catalog);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable catalog cache"),
        }

        if let Err(e) = self.refresh().await {
            let current = self.catalog();
            tracing::warn!(
                error = %e,
                version = current.version(),
                "catalog refresh failed, serving last known good"
            );
        }
        self.catalog()
    }

    /// Returns the current catalog snapshot.
    pub fn catalog(&self) -> Arc<CardCatalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Fetches the remote catalog if its version differs from ours.
    ///
    /// Returns `Ok(true)` when a new catalog was installed.
    ///
    /// # Errors
    /// The source's error if it is unreachable, or
    /// [`CatalogError::Empty`] if it served a catalog with no cards.
    pub async fn refresh(&self) -> Result<bool, CatalogError> {
        let latest = self.source.latest_version().await?;
        if latest == self.catalog().version() {
            tracing::debug!(version = %latest, "catalog up to date");
            return Ok(false);
        }

        let data = self.source.fetch(&latest).await?;
        let catalog = validated(data)?;
        tracing::info!(version = %latest, "installed refreshed catalog");
        self.swap(catalog);

        if let Err(e) = self.write_cache().await {
            tracing::warn!(error = %e, "failed to write catalog cache");
        }
        Ok(true)
    }

    /// Flushes the current catalog to the cache before shutdown.
    pub async fn dispose(&self) {
        if let Err(e) = self.write_cache().await {
            tracing::warn!(error = %e, "failed to write catalog cache on dispose");
        }
        tracing::debug!("catalog service disposed");
    }

    fn swap(&self, catalog: CardCatalog) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(catalog);
    }

    async fn load_cache(&self) -> Result<Option<CardCatalog>, CatalogError> {
        let Some(path) = &self.cache_path else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let data: CatalogData = serde_json::from_slice(&bytes).map_err(ProtocolError::Decode)?;
        validated(data).map(Some)
    }

    async fn write_cache(&self) -> Result<(), CatalogError> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&self.catalog().to_data()).map_err(ProtocolError::Encode)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn validated(data: CatalogData) -> Result<CardCatalog, CatalogError> {
    if data.prompt_cards.is_empty() || data.answer_cards.is_empty() {
        return Err(CatalogError::Empty(data.version));
    }
    Ok(CardCatalog::new(data))
}
