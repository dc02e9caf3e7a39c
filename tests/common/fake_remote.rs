//! In-memory [`RemoteClient`] for integration tests.
//!
//! Holds a small server-side "world" (categories, feeds, unread counters) and
//! applies mutations to it the way Miniflux would: ids are assigned by the
//! server, starting at 42 for feeds. Every call is counted.
//!
//! Two knobs let tests control timing and failures:
//! - [`FakeRemote::hold_next_feeds`] parks the next `list_feeds` call after it
//!   has read the world, until the returned [`Gate`] is opened.
//! - [`FakeRemote::fail_next`] makes the next call of one method fail.
//!
//! # Example
//!
//! ```rust,no_run
//! let remote = FakeRemote::with_world(categories(2), vec![]);
//! let gate = remote.hold_next_feeds();
//! // start a resync, then:
//! gate.parked().await;
//! gate.open();
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use fluxa_core::{
    Category, CategoryId, CreateFeed, Feed, FeedCounters, FeedId, FeedPatch, RemoteClient,
    RemoteError, RemoteResult,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Handle to one parked `list_feeds` call.
#[derive(Clone)]
pub struct Gate {
    parked: Arc<Notify>,
    open: Arc<Notify>,
}

impl Gate {
    fn new() -> Self {
        Self {
            parked: Arc::new(Notify::new()),
            open: Arc::new(Notify::new()),
        }
    }

    /// Wait until the fetch has read the world and is parked.
    pub async fn parked(&self) {
        self.parked.notified().await;
    }

    /// Let the parked fetch return what it read.
    pub fn open(&self) {
        self.open.notify_one();
    }
}

struct World {
    categories: Vec<Category>,
    feeds: Vec<Feed>,
    unreads: HashMap<FeedId, u32>,
    next_feed_id: i64,
    next_category_id: i64,
}

pub struct FakeRemote {
    world: Mutex<World>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, RemoteError>>,
    gates: Mutex<VecDeque<Gate>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::with_world(Vec::new(), Vec::new())
    }

    /// Seed the server state. Unread counts on `feeds` become the counters.
    pub fn with_world(categories: Vec<Category>, feeds: Vec<Feed>) -> Self {
        let next_category_id = categories.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        let unreads = feeds.iter().map(|f| (f.id, f.unread_count)).collect();
        let feeds = feeds
            .into_iter()
            .map(|f| Feed {
                unread_count: 0,
                ..f
            })
            .collect();
        Self {
            world: Mutex::new(World {
                categories,
                feeds,
                unreads,
                next_feed_id: 42,
                next_category_id,
            }),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(VecDeque::new()),
        }
    }

    /// How many times `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().get(method).copied().unwrap_or(0)
    }

    /// Total number of list/counter fetches, i.e. resync traffic.
    pub fn fetches(&self) -> usize {
        self.calls("list_categories") + self.calls("list_feeds") + self.calls("feed_counters")
    }

    /// Make the next call of `method` fail with `err`.
    pub fn fail_next(&self, method: &'static str, err: RemoteError) {
        self.failures.lock().insert(method, err);
    }

    /// Park the next `list_feeds` call. Gates are consumed in call order.
    pub fn hold_next_feeds(&self) -> Gate {
        let gate = Gate::new();
        self.gates.lock().push_back(gate.clone());
        gate
    }

    /// Change server state behind the client's back, as another device would.
    pub fn insert_feed(&self, feed: Feed) {
        let mut world = self.world.lock();
        world.unreads.insert(feed.id, feed.unread_count);
        world.feeds.push(Feed {
            unread_count: 0,
            ..feed
        });
    }

    pub fn set_unread(&self, id: FeedId, count: u32) {
        self.world.lock().unreads.insert(id, count);
    }

    /// Add a category and return its server-assigned id.
    pub fn insert_category(&self, title: &str) -> CategoryId {
        let mut world = self.world.lock();
        let id = CategoryId(world.next_category_id);
        world.next_category_id += 1;
        world.categories.push(Category {
            id,
            title: title.to_string(),
            hide_globally: false,
        });
        id
    }

    fn enter(&self, method: &'static str) -> RemoteResult<()> {
        *self.calls.lock().entry(method).or_default() += 1;
        match self.failures.lock().remove(method) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found() -> RemoteError {
        RemoteError::Server { status: 404 }
    }
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn list_categories(&self) -> RemoteResult<Vec<Category>> {
        self.enter("list_categories")?;
        Ok(self.world.lock().categories.clone())
    }

    async fn list_feeds(&self) -> RemoteResult<Vec<Feed>> {
        self.enter("list_feeds")?;
        let feeds = self.world.lock().feeds.clone();
        let gate = self.gates.lock().pop_front();
        if let Some(gate) = gate {
            gate.parked.notify_one();
            gate.open.notified().await;
        }
        Ok(feeds)
    }

    async fn feed_counters(&self) -> RemoteResult<FeedCounters> {
        self.enter("feed_counters")?;
        Ok(FeedCounters {
            unreads: self.world.lock().unreads.clone(),
            reads: HashMap::new(),
        })
    }

    async fn create_feed(&self, request: &CreateFeed) -> RemoteResult<FeedId> {
        self.enter("create_feed")?;
        let mut world = self.world.lock();
        if !world.categories.iter().any(|c| c.id == request.category_id) {
            return Err(RemoteError::validation(
                "category_id",
                "This category does not exist or does not belong to this user",
            ));
        }
        if world.feeds.iter().any(|f| f.feed_url == request.feed_url) {
            return Err(RemoteError::validation("feed_url", "This feed already exists"));
        }

        let id = FeedId(world.next_feed_id);
        world.next_feed_id += 1;
        world.feeds.push(Feed {
            id,
            title: format!("Discovered {}", request.feed_url),
            site_url: String::new(),
            feed_url: request.feed_url.clone(),
            category_id: request.category_id,
            crawler: request.crawler,
            hide_globally: false,
            disabled: false,
            checked_at: None,
            unread_count: 0,
        });
        world.unreads.insert(id, 10);
        Ok(id)
    }

    async fn update_feed(&self, id: FeedId, patch: &FeedPatch) -> RemoteResult<Feed> {
        self.enter("update_feed")?;
        let mut world = self.world.lock();
        let feed = world
            .feeds
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(Self::not_found)?;
        if let Some(title) = &patch.title {
            feed.title = title.clone();
        }
        if let Some(url) = &patch.feed_url {
            feed.feed_url = url.clone();
        }
        if let Some(url) = &patch.site_url {
            feed.site_url = url.clone();
        }
        if let Some(category) = patch.category_id {
            feed.category_id = category;
        }
        if let Some(crawler) = patch.crawler {
            feed.crawler = crawler;
        }
        if let Some(hidden) = patch.hide_globally {
            feed.hide_globally = hidden;
        }
        if let Some(disabled) = patch.disabled {
            feed.disabled = disabled;
        }
        Ok(feed.clone())
    }

    async fn delete_feed(&self, id: FeedId) -> RemoteResult<()> {
        self.enter("delete_feed")?;
        let mut world = self.world.lock();
        let before = world.feeds.len();
        world.feeds.retain(|f| f.id != id);
        world.unreads.remove(&id);
        if world.feeds.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    async fn mark_feed_read(&self, id: FeedId) -> RemoteResult<()> {
        self.enter("mark_feed_read")?;
        self.world.lock().unreads.insert(id, 0);
        Ok(())
    }

    async fn create_category(&self, title: &str) -> RemoteResult<Category> {
        self.enter("create_category")?;
        if self.world.lock().categories.iter().any(|c| c.title == title) {
            return Err(RemoteError::validation("title", "This category already exists"));
        }
        let id = self.insert_category(title);
        Ok(Category {
            id,
            title: title.to_string(),
            hide_globally: false,
        })
    }

    async fn update_category(&self, id: CategoryId, title: &str) -> RemoteResult<Category> {
        self.enter("update_category")?;
        let mut world = self.world.lock();
        let category = world
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(Self::not_found)?;
        category.title = title.to_string();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> RemoteResult<()> {
        self.enter("delete_category")?;
        let mut world = self.world.lock();
        // Miniflux removes the category's feeds along with it.
        let removed: Vec<FeedId> = world
            .feeds
            .iter()
            .filter(|f| f.category_id == id)
            .map(|f| f.id)
            .collect();
        world.feeds.retain(|f| f.category_id != id);
        for feed in removed {
            world.unreads.remove(&feed);
        }
        world.categories.retain(|c| c.id != id);
        Ok(())
    }

    async fn mark_category_read(&self, id: CategoryId) -> RemoteResult<()> {
        self.enter("mark_category_read")?;
        let mut world = self.world.lock();
        let members: Vec<FeedId> = world
            .feeds
            .iter()
            .filter(|f| f.category_id == id)
            .map(|f| f.id)
            .collect();
        for feed in members {
            world.unreads.insert(feed, 0);
        }
        Ok(())
    }
}
