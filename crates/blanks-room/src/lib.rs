//! Room operations for Blanks.
//!
//! Every game intent becomes one compare-and-swap transaction on the room
//! document, so clients that act at the same time never lose each other's
//! writes.
//!
//! # Key types
//!
//! - [`RoomService`]: create, join, leave and play; one per client
//! - [`rules`]: the turn rules as pure functions over a [`Room`](blanks_protocol::Room)
//! - [`deck`]: draw piles and refills
//! - [`RoomDirectory`]: the live list of open rooms
//! - [`RoomRules`]: hand size, jokers, allowed `pointsToWin`, palette

mod config;
pub mod deck;
mod directory;
mod error;
pub mod rules;
mod service;

pub use config::RoomRules;
pub use directory::{RoomDirectory, RoomListing};
pub use error::RoomError;
pub use rules::{Change, TxContext};
pub use service::{Outcome, RoomService};
