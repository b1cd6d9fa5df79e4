//! Card catalog service for Blanks.
//!
//! Owns the [`CardCatalog`](blanks_protocol::CardCatalog) every client
//! uses to hydrate and dehydrate rooms:
//!
//! - a bundled default deck ([`bundled`]) so a fresh install can play
//!   offline,
//! - a remote, versioned refresh through the [`CatalogSource`] trait,
//! - a local JSON cache of the last catalog that was fetched.
//!
//! The service is constructed explicitly and passed to whoever needs it.

mod error;
mod service;
mod source;

pub use error::CatalogError;
pub use service::{CatalogService, bundled};
pub use source::{CatalogSource, OfflineSource, StaticSource};
