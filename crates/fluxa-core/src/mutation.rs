//! Mutation gateway: one server write, then a coordinated resync.
//!
//! Nothing is ever patched into the store locally. A successful write
//! invalidates the coordinator and waits for a fresh resync, so server-derived
//! fields (assigned ids, normalized titles, unread counts) come from the
//! server. A failed write touches nothing and triggers no resync.
//!
//! Mutations are not retried here: the server does not guarantee they are
//! idempotent, so retrying is the caller's decision.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{MutationError, RemoteError};
use crate::remote::RemoteClient;
use crate::sync::{SyncCoordinator, SyncResult};
use crate::types::{Category, CategoryId, CreateFeed, Feed, FeedId, FeedPatch};

/// A single write against the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateFeed(CreateFeed),
    UpdateFeed { id: FeedId, patch: FeedPatch },
    DeleteFeed(FeedId),
    MarkFeedRead(FeedId),
    CreateCategory { title: String },
    UpdateCategory { id: CategoryId, title: String },
    DeleteCategory(CategoryId),
    MarkCategoryRead(CategoryId),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateFeed(_) => "create_feed",
            Mutation::UpdateFeed { .. } => "update_feed",
            Mutation::DeleteFeed(_) => "delete_feed",
            Mutation::MarkFeedRead(_) => "mark_feed_read",
            Mutation::CreateCategory { .. } => "create_category",
            Mutation::UpdateCategory { .. } => "update_category",
            Mutation::DeleteCategory(_) => "delete_category",
            Mutation::MarkCategoryRead(_) => "mark_category_read",
        }
    }

    /// Reject input the server would refuse anyway, before any network call.
    pub fn validate(&self) -> Result<(), RemoteError> {
        match self {
            Mutation::CreateFeed(request) => {
                validate_feed_url(&request.feed_url)?;
                validate_category_id(request.category_id)
            }
            Mutation::UpdateFeed { patch, .. } => {
                if patch.is_empty() {
                    return Err(RemoteError::validation("patch", "nothing to update"));
                }
                if let Some(url) = &patch.feed_url {
                    validate_feed_url(url)?;
                }
                if let Some(category) = patch.category_id {
                    validate_category_id(category)?;
                }
                if let Some(title) = &patch.title {
                    validate_title(title)?;
                }
                Ok(())
            }
            Mutation::CreateCategory { title } | Mutation::UpdateCategory { title, .. } => {
                validate_title(title)
            }
            Mutation::DeleteFeed(_)
            | Mutation::MarkFeedRead(_)
            | Mutation::DeleteCategory(_)
            | Mutation::MarkCategoryRead(_) => Ok(()),
        }
    }
}

fn validate_feed_url(url: &str) -> Result<(), RemoteError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(RemoteError::validation("feed_url", "feed URL is required"));
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| RemoteError::validation("feed_url", "feed URL must use http or https"))?;
    if rest.is_empty() || rest.starts_with('/') || rest.contains(char::is_whitespace) {
        return Err(RemoteError::validation("feed_url", "feed URL has no host"));
    }
    Ok(())
}

fn validate_category_id(id: CategoryId) -> Result<(), RemoteError> {
    if id.0 <= 0 {
        return Err(RemoteError::validation("category_id", "a category is required"));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), RemoteError> {
    if title.trim().is_empty() {
        return Err(RemoteError::validation("title", "title is required"));
    }
    Ok(())
}

/// What the server answered to a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    FeedCreated(FeedId),
    FeedUpdated(Feed),
    CategoryCreated(Category),
    CategoryUpdated(Category),
    /// The server acknowledged without a body (delete, mark read).
    Completed,
}

impl RemoteOutcome {
    /// The feed the UI should navigate to, if any.
    pub fn feed_id(&self) -> Option<FeedId> {
        match self {
            RemoteOutcome::FeedCreated(id) => Some(*id),
            RemoteOutcome::FeedUpdated(feed) => Some(feed.id),
            _ => None,
        }
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        match self {
            RemoteOutcome::CategoryCreated(c) | RemoteOutcome::CategoryUpdated(c) => Some(c.id),
            RemoteOutcome::FeedUpdated(feed) => Some(feed.category_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub remote: RemoteOutcome,
    /// The resync awaited after the write. Its generation is at least the one
    /// installed before the mutation started.
    pub sync: SyncResult,
}

/// Lifecycle of one mutation as tracked by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Clone)]
pub struct MutationGateway {
    remote: Arc<dyn RemoteClient>,
    coordinator: SyncCoordinator,
}

impl MutationGateway {
    pub fn new(remote: Arc<dyn RemoteClient>, coordinator: SyncCoordinator) -> Self {
        Self {
            remote,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Apply `mutation` on the server and resync the store.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Rejected`] when validation or the server call fails;
    ///   the store is untouched and no resync is requested.
    /// - [`MutationError::Unsynced`] when the write succeeded but the resync
    ///   did not; the server answer is still returned.
    pub async fn mutate(&self, mutation: Mutation) -> Result<MutationOutcome, MutationError> {
        self.mutate_with(mutation, |_| {}).await
    }

    /// Like [`mutate`](Self::mutate), running `on_success` once the store has
    /// been resynced. Callers use it to clear their own UI state (close a
    /// dialog, reset a form); it is not called on any failure.
    pub async fn mutate_with<F>(
        &self,
        mutation: Mutation,
        on_success: F,
    ) -> Result<MutationOutcome, MutationError>
    where
        F: FnOnce(&MutationOutcome),
    {
        let name = mutation.name();
        mutation.validate().inspect_err(|err| {
            debug!(mutation = name, error = %err, "mutation rejected locally");
        })?;

        let remote = match self.call(&mutation).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(mutation = name, error = %err, "mutation failed");
                return Err(MutationError::Rejected(err));
            }
        };
        info!(mutation = name, outcome = ?remote, "mutation applied");

        self.coordinator.invalidate();
        let sync = match self.coordinator.request_sync().await {
            Ok(sync) => sync,
            Err(cause) => {
                warn!(mutation = name, error = %cause, "resync after mutation failed");
                return Err(MutationError::Unsynced { remote, cause });
            }
        };

        let outcome = MutationOutcome { remote, sync };
        on_success(&outcome);
        Ok(outcome)
    }

    async fn call(&self, mutation: &Mutation) -> Result<RemoteOutcome, RemoteError> {
        let remote = self.remote.as_ref();
        match mutation {
            Mutation::CreateFeed(request) => {
                let request = CreateFeed {
                    feed_url: request.feed_url.trim().to_string(),
                    ..request.clone()
                };
                remote
                    .create_feed(&request)
                    .await
                    .map(RemoteOutcome::FeedCreated)
            }
            Mutation::UpdateFeed { id, patch } => remote
                .update_feed(*id, patch)
                .await
                .map(RemoteOutcome::FeedUpdated),
            Mutation::DeleteFeed(id) => remote
                .delete_feed(*id)
                .await
                .map(|()| RemoteOutcome::Completed),
            Mutation::MarkFeedRead(id) => remote
                .mark_feed_read(*id)
                .await
                .map(|()| RemoteOutcome::Completed),
            Mutation::CreateCategory { title } => remote
                .create_category(title.trim())
                .await
                .map(RemoteOutcome::CategoryCreated),
            Mutation::UpdateCategory { id, title } => remote
                .update_category(*id, title.trim())
                .await
                .map(RemoteOutcome::CategoryUpdated),
            Mutation::DeleteCategory(id) => remote
                .delete_category(*id)
                .await
                .map(|()| RemoteOutcome::Completed),
            Mutation::MarkCategoryRead(id) => remote
                .mark_category_read(*id)
                .await
                .map(|()| RemoteOutcome::Completed),
        }
    }
}
