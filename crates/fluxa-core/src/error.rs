//! Error taxonomy shared by every layer of the sync core.
//!
//! Errors that can be handed to several coalesced callers ([`RemoteError`],
//! [`SyncError`]) are `Clone` and carry only owned strings.

use crate::types::{CategoryId, FeedId};
use crate::mutation::RemoteOutcome;

/// Classified failure of a single [`RemoteClient`](crate::remote::RemoteClient) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Server unreachable, connection reset, or request timed out.
    #[error("transport error: {0}")]
    Transport(String),
    /// Credentials rejected; the session must be re-established.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Input rejected, either locally before sending or by the server.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("server responded with status {status}")]
    Server { status: u16 },
    /// The server answered with a body that does not match the API contract.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Server { status } => *status >= 500,
            RemoteError::Auth(_) | RemoteError::Validation { .. } | RemoteError::Protocol(_) => {
                false
            }
        }
    }
}

/// Why a candidate snapshot was refused by the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Inconsistency {
    #[error("feed {feed} references unknown category {category}")]
    UnknownCategory { feed: FeedId, category: CategoryId },
    #[error("feed {0} appears more than once")]
    DuplicateFeed(FeedId),
    #[error("category {0} appears more than once")]
    DuplicateCategory(CategoryId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(#[from] Inconsistency),
}

/// Outcome of a failed resync, shared by every caller coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// A fetch failed; nothing was installed.
    #[error("sync failed: {cause}")]
    Failed { cause: RemoteError },
    /// The server returned data that violates the snapshot invariants.
    #[error("server returned an inconsistent snapshot: {0}")]
    InconsistentSnapshot(Inconsistency),
    /// The resync task ended without producing a result.
    #[error("sync interrupted: {0}")]
    Interrupted(String),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InconsistentSnapshot(reason) => SyncError::InconsistentSnapshot(reason),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MutationError {
    /// The server (or local validation) refused the mutation; nothing changed.
    #[error(transparent)]
    Rejected(#[from] RemoteError),
    /// The server applied the mutation but the follow-up resync failed, so the
    /// store still shows pre-mutation state.
    #[error("mutation applied but resync failed: {cause}")]
    Unsynced {
        remote: RemoteOutcome,
        cause: SyncError,
    },
}

impl MutationError {
    /// The remote failure, when the mutation itself was refused.
    pub fn rejection(&self) -> Option<&RemoteError> {
        match self {
            MutationError::Rejected(err) => Some(err),
            MutationError::Unsynced { .. } => None,
        }
    }
}
