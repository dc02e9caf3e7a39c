//! The contract the sync core consumes from the aggregation server.
//!
//! [`RemoteClient`] is deliberately thin: typed CRUD calls that either return
//! the server's answer or a classified [`RemoteError`]. The HTTP
//! implementation lives in `fluxa-miniflux`; tests supply in-memory fakes.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{Category, CategoryId, CreateFeed, Feed, FeedCounters, FeedId, FeedPatch};

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn list_categories(&self) -> RemoteResult<Vec<Category>>;

    /// All subscribed feeds. `unread_count` is not populated here; see
    /// [`RemoteClient::feed_counters`].
    async fn list_feeds(&self) -> RemoteResult<Vec<Feed>>;

    async fn feed_counters(&self) -> RemoteResult<FeedCounters>;

    /// Subscribe to a feed, returning the server-assigned id.
    async fn create_feed(&self, request: &CreateFeed) -> RemoteResult<FeedId>;

    async fn update_feed(&self, id: FeedId, patch: &FeedPatch) -> RemoteResult<Feed>;

    async fn delete_feed(&self, id: FeedId) -> RemoteResult<()>;

    async fn mark_feed_read(&self, id: FeedId) -> RemoteResult<()>;

    async fn create_category(&self, title: &str) -> RemoteResult<Category>;

    async fn update_category(&self, id: CategoryId, title: &str) -> RemoteResult<Category>;

    async fn delete_category(&self, id: CategoryId) -> RemoteResult<()>;

    async fn mark_category_read(&self, id: CategoryId) -> RemoteResult<()>;
}
