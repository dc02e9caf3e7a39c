//! Domain-specific assertion macros for fluxa harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that say which
//! store or mutation guarantee was violated.

// ---------------------------------------------------------------------------
// Snapshot assertions
// ---------------------------------------------------------------------------

/// Assert that the store currently holds `generation`.
///
/// ```rust
/// assert_generation!(app.store, 2);
/// ```
#[macro_export]
macro_rules! assert_generation {
    ($store:expr, $generation:expr) => {{
        let store: &fluxa_core::EntityStore = &$store;
        let expected: u64 = $generation;
        let actual = store.generation();
        if actual != expected {
            panic!(
                "assert_generation! failed:\n  expected: {}\n  actual:   {}\n  feeds: {:?}",
                expected,
                actual,
                store.snapshot().feeds().iter().map(|f| f.id).collect::<Vec<_>>()
            );
        }
    }};
}

/// Assert that two snapshot handles are the very same allocation, i.e. the
/// store was not replaced in between.
#[macro_export]
macro_rules! assert_same_snapshot {
    ($before:expr, $after:expr) => {{
        let before: &std::sync::Arc<fluxa_core::Snapshot> = &$before;
        let after: &std::sync::Arc<fluxa_core::Snapshot> = &$after;
        if !std::sync::Arc::ptr_eq(before, after) {
            panic!(
                "assert_same_snapshot! failed: store was replaced\n  before: generation {}\n  after:  generation {}",
                before.generation(),
                after.generation()
            );
        }
    }};
}

/// Assert that a snapshot contains the feed with `id`.
#[macro_export]
macro_rules! assert_has_feed {
    ($snapshot:expr, $id:expr) => {{
        let snapshot: &fluxa_core::Snapshot = &$snapshot;
        let id: fluxa_core::FeedId = $id;
        if snapshot.feed(id).is_none() {
            panic!(
                "assert_has_feed! failed: feed {} not in snapshot (generation {}).\n  Available: {:?}",
                id,
                snapshot.generation(),
                snapshot.feeds().iter().map(|f| f.id).collect::<Vec<_>>()
            );
        }
    }};
}

// ---------------------------------------------------------------------------
// Error assertions
// ---------------------------------------------------------------------------

/// Assert that a result failed with a validation error on `field`.
///
/// Accepts `Result<_, MutationError>` and `Result<_, RemoteError>`.
#[macro_export]
macro_rules! assert_validation_field {
    ($result:expr, $field:expr) => {{
        let err: fluxa_core::RemoteError = match $result {
            Ok(_) => panic!("assert_validation_field! failed: call succeeded"),
            Err(err) => err.into_remote_error(),
        };
        match err {
            fluxa_core::RemoteError::Validation { ref field, .. } if field == $field => {}
            other => panic!(
                "assert_validation_field! failed:\n  expected: Validation {{ field: {:?} }}\n  actual:   {:?}",
                $field, other
            ),
        }
    }};
}

/// Lets [`assert_validation_field!`] accept both error layers.
pub trait IntoRemoteError {
    fn into_remote_error(self) -> fluxa_core::RemoteError;
}

impl IntoRemoteError for fluxa_core::RemoteError {
    fn into_remote_error(self) -> fluxa_core::RemoteError {
        self
    }
}

impl IntoRemoteError for fluxa_core::MutationError {
    fn into_remote_error(self) -> fluxa_core::RemoteError {
        match self {
            fluxa_core::MutationError::Rejected(err) => err,
            other => panic!("expected a rejected mutation, got {other:?}"),
        }
    }
}
