//! Store configuration.

/// Tunables for a store client.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How many times a transaction body may be re-run after losing a
    /// compare-and-swap race before the transaction fails.
    pub max_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_retries: 25 }
    }
}
