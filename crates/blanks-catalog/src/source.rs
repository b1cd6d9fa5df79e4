//! Where refreshed catalogs come from.
//!
//! The catalog service doesn't know how the remote blob is hosted. It asks
//! a [`CatalogSource`] for the latest version token and, when that differs
//! from what it already has, for the data itself.

use std::future::Future;

use blanks_protocol::CatalogData;

use crate::CatalogError;

/// A remote, versioned catalog blob.
pub trait CatalogSource: Send + Sync + 'static {
    /// Returns the opaque version token of the newest published catalog.
    fn latest_version(&self) -> impl Future<Output = Result<String, CatalogError>> + Send;

    /// Downloads the catalog published under `version`.
    fn fetch(&self, version: &str) -> impl Future<Output = Result<CatalogData, CatalogError>> + Send;
}

/// A source that is never reachable. Clients built with it run on the
/// cached or bundled catalog only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl CatalogSource for OfflineSource {
    async fn latest_version(&self) -> Result<String, CatalogError> {
        Err(CatalogError::Unavailable("offline".into()))
    }

    async fn fetch(&self, _version: &str) -> Result<CatalogData, CatalogError> {
        Err(CatalogError::Unavailable("offline".into()))
    }
}

/// A source that always serves the same in-memory catalog. Handy for
/// tests and for embedding a catalog shipped alongside the client.
#[derive(Debug, Clone)]
pub struct StaticSource {
    data: CatalogData,
}

impl StaticSource {
    pub fn new(data: CatalogData) -> Self {
        Self { data }
    }
}

impl CatalogSource for StaticSource {
    async fn latest_version(&self) -> Result<String, CatalogError> {
        Ok(self.data.version.clone())
    }

    async fn fetch(&self, version: &str) -> Result<CatalogData, CatalogError> {
        if version != self.data.version {
            return Err(CatalogError::Unavailable(format!(
                "version {version} is not published"
            )));
        }
        Ok(self.data.clone())
    }
}
