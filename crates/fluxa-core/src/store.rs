//! The canonical in-memory [`Snapshot`] of feeds and categories.
//!
//! The store is the single source of truth; the UI reads from it, never from
//! the server directly. A snapshot is immutable once installed: every update
//! is a validated, atomic swap of the whole `(feeds, categories)` pair.
//!
//! # Concurrency
//!
//! - `current`: `ArcSwap`, so [`EntityStore::snapshot`] never blocks.
//! - `replace_lock`: serializes [`EntityStore::replace`] end to end (validate,
//!   swap, notify). Listeners therefore observe strictly increasing
//!   generations.
//! - `listeners`: registry lock, held only to add, remove or copy listeners, so
//!   listeners may subscribe or drop their own [`Subscription`]. They must not
//!   call `replace`.
//!
//! A panicking listener is logged and skipped; the swap, the watch channel
//! and the remaining listeners are unaffected.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{Inconsistency, StoreError};
use crate::types::{Category, CategoryId, Feed, FeedId};

/// An immutable `(feeds, categories)` pair as of one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    generation: u64,
    synced_at: Option<DateTime<Utc>>,
    feeds: Vec<Feed>,
    categories: Vec<Category>,
}

impl Snapshot {
    /// The never-synced snapshot a store starts with (generation 0).
    pub fn empty() -> Self {
        Self {
            generation: 0,
            synced_at: None,
            feeds: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// A candidate snapshot fetched now. Its generation is assigned by
    /// [`EntityStore::replace`].
    pub fn new(feeds: Vec<Feed>, categories: Vec<Category>) -> Self {
        Self {
            generation: 0,
            synced_at: Some(Utc::now()),
            feeds,
            categories,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the data was fetched; `None` until the first successful sync.
    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.synced_at
    }

    pub fn is_synced(&self) -> bool {
        self.synced_at.is_some()
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn feed(&self, id: FeedId) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.id == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Feeds belonging to `category`, in server order.
    pub fn feeds_in(&self, category: CategoryId) -> impl Iterator<Item = &Feed> + '_ {
        self.feeds.iter().filter(move |f| f.category_id == category)
    }

    pub fn category_unread(&self, category: CategoryId) -> u32 {
        self.feeds_in(category).map(|f| f.unread_count).sum()
    }

    pub fn unread_total(&self) -> u32 {
        self.feeds.iter().map(|f| f.unread_count).sum()
    }

    /// Check the cross-reference invariant: ids are unique and every feed
    /// points at a category present in this snapshot.
    pub fn validate(&self) -> Result<(), Inconsistency> {
        let mut categories = HashSet::with_capacity(self.categories.len());
        for category in &self.categories {
            if !categories.insert(category.id) {
                return Err(Inconsistency::DuplicateCategory(category.id));
            }
        }

        let mut feeds = HashSet::with_capacity(self.feeds.len());
        for feed in &self.feeds {
            if !feeds.insert(feed.id) {
                return Err(Inconsistency::DuplicateFeed(feed.id));
            }
            if !categories.contains(&feed.category_id) {
                return Err(Inconsistency::UnknownCategory {
                    feed: feed.id,
                    category: feed.category_id,
                });
            }
        }
        Ok(())
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

type Listener = Arc<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

struct StoreInner {
    current: ArcSwap<Snapshot>,
    replace_lock: Mutex<()>,
    listeners: Mutex<Listeners>,
    watch_tx: watch::Sender<Arc<Snapshot>>,
}

/// Shared handle to the snapshot. Cloning is cheap; all clones see the same
/// state.
#[derive(Clone)]
pub struct EntityStore {
    inner: Arc<StoreInner>,
}

impl EntityStore {
    pub fn new() -> Self {
        let initial = Arc::new(Snapshot::empty());
        let (watch_tx, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(StoreInner {
                current: ArcSwap::new(initial),
                replace_lock: Mutex::new(()),
                listeners: Mutex::new(Listeners::default()),
                watch_tx,
            }),
        }
    }

    /// The currently installed snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.inner.current.load().generation
    }

    /// Validate `candidate`, install it as the next generation and notify
    /// listeners before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InconsistentSnapshot`] when the candidate breaks
    /// the cross-reference invariant. The previous snapshot stays installed
    /// and no listener is called.
    pub fn replace(&self, candidate: Snapshot) -> Result<Arc<Snapshot>, StoreError> {
        let _serial = self.inner.replace_lock.lock();

        candidate.validate()?;

        let mut next = candidate;
        next.generation = self.inner.current.load().generation + 1;
        let next = Arc::new(next);
        self.inner.current.store(next.clone());

        tracing::debug!(
            generation = next.generation,
            feeds = next.feeds.len(),
            categories = next.categories.len(),
            "snapshot replaced"
        );

        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        self.inner.watch_tx.send_replace(next.clone());
        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&next))).is_err() {
                tracing::error!(generation = next.generation, "snapshot listener panicked");
            }
        }

        Ok(next)
    }

    /// Register `listener` to run after every successful [`replace`](Self::replace).
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        let mut listeners = self.inner.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Channel-based subscription for async consumers. The receiver starts
    /// at the current snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.watch_tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().entries.len()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.listeners.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
