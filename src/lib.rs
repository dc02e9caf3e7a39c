//! fluxa — Miniflux feeds from the terminal.
//!
//! This crate wires the sync core (`fluxa-core`) to the Miniflux HTTP client
//! (`fluxa-miniflux`) and holds the presentation-side pieces the core never
//! reaches into: the add-feed form and its dialog flags, and plain-text
//! rendering of a snapshot. Integration harnesses import it directly.
//!
//! # Architecture
//!
//! ```text
//! CLI / form ──► MutationGateway ──► MinifluxClient ──► server
//!      ▲               │
//!      │               ▼
//!  render ◄── EntityStore ◄── SyncCoordinator ◄── SyncService (interval)
//! ```

pub mod app;
pub mod form;
pub mod render;

pub use app::App;
pub use form::{feed_route, AddFeedForm, UiFlags};
