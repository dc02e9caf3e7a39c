//! fluxa-core — the synchronization core of the fluxa feed reader.
//!
//! This crate keeps a UI-reactive snapshot of feeds, categories and unread
//! counts consistent with a remote Miniflux server.
//!
//! # Architecture
//!
//! ```text
//! UI ──► MutationGateway ──► RemoteClient
//!             │                   ▲
//!             ▼                   │
//!       SyncCoordinator ──────────┘
//!             │
//!             ▼
//!        EntityStore ──► subscribers (UI)
//! ```
//!
//! Every server-originated write goes through the [`SyncCoordinator`], which
//! runs at most one fresh resync at a time and drops superseded results. The
//! store only ever swaps in whole, validated snapshots.

pub mod config;
pub mod error;
pub mod mutation;
pub mod remote;
pub mod store;
pub mod sync;
pub mod types;

pub use error::{Inconsistency, MutationError, RemoteError, StoreError, SyncError};
pub use mutation::{Mutation, MutationGateway, MutationOutcome, MutationPhase, RemoteOutcome};
pub use remote::{RemoteClient, RemoteResult};
pub use store::{EntityStore, Snapshot, Subscription};
pub use sync::{SyncCoordinator, SyncResult, SyncService};
pub use types::{Category, CategoryId, CreateFeed, Feed, FeedCounters, FeedId, FeedPatch};
