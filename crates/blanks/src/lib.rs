//! # Blanks
//!
//! Shared room state for a fill-in-the-blank party card game.
//!
//! There is no game server: every client changes the shared room document
//! through compare-and-swap transactions on a realtime document store, and
//! the rules run inside those transactions. This crate wires the layers
//! into a [`GameClient`] and re-exports what an application needs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blanks::prelude::*;
//!
//! # async fn run() -> Result<(), BlanksError> {
//! blanks::telemetry::init();
//! let config = ClientConfig::from_env()?;
//! let client = GameClient::in_memory(config, OfflineSource).build().await;
//!
//! let room = client.create_room("Alice").await?;
//! client.join_room(room.code.as_str(), "Bob").await?;
//! client.start_game(room.code.as_str(), Some(5)).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod feedback;
mod profile;
pub mod telemetry;

pub use client::{GameClient, GameClientBuilder};
pub use config::{ClientConfig, DEFAULT_BRIBE_COST};
pub use error::BlanksError;
pub use feedback::{FeedbackCue, FeedbackSink, NoFeedback};
pub use profile::{FreeProfile, ProfileStore};

pub use blanks_catalog as catalog;
pub use blanks_presence as presence;
pub use blanks_protocol as protocol;
pub use blanks_room as room;
pub use blanks_store as store;

pub mod prelude {
    pub use crate::{
        BlanksError, ClientConfig, FeedbackCue, FeedbackSink, FreeProfile, GameClient,
        NoFeedback, ProfileStore,
    };
    pub use blanks_catalog::{CatalogService, CatalogSource, OfflineSource, StaticSource};
    pub use blanks_protocol::{
        Cosmetics, PlayerName, PromptCard, Room, RoomCode, RoomPhase, TurnPhase,
    };
    pub use blanks_room::{Outcome, RoomListing, RoomRules};
    pub use blanks_store::{DocumentStore, MemoryStore, StoreConfig};
}
