//! Document model for Blanks.
//!
//! This crate defines what a room looks like, both on the wire and in
//! memory, and how to convert between the two:
//!
//! - **Identity** ([`PlayerName`], [`RoomCode`])
//! - **Cards** ([`PromptCard`], [`CardSlot`], [`CardCatalog`])
//! - **Documents** ([`RawRoom`] on the wire, [`Room`] in memory)
//! - **Codec** ([`hydrate`], [`dehydrate`])
//!
//! # Architecture
//!
//! ```text
//! Store (JSON tree) → RawRoom → hydrate → Room → rules → dehydrate → RawRoom → Store
//! ```
//!
//! It knows nothing about stores, transactions, or game rules.

mod card;
mod catalog;
mod error;
mod hydrate;
mod ids;
mod phase;
mod room;

pub use card::{CardSlot, PromptCard, normalize, same_card};
pub use catalog::{CardCatalog, CatalogData};
pub use error::ProtocolError;
pub use hydrate::{dehydrate, hydrate};
pub use ids::{MAX_NAME_LEN, PlayerName, RoomCode};
pub use phase::{RoomPhase, TurnPhase};
pub use room::{Cosmetics, Player, RawPlayer, RawRoom, Room};
