//! Single-flight full resync of the [`EntityStore`] from the server.
//!
//! # Protocol
//!
//! 1. A caller asks for a resync with [`SyncCoordinator::request_sync`].
//! 2. If a resync is in flight and it started after the last
//!    [`invalidate`](SyncCoordinator::invalidate), the caller joins it and
//!    shares its result.
//! 3. Otherwise a new resync is spawned with the next start ticket: fetch
//!    categories, fetch feeds, fetch unread counters, assemble, validate,
//!    install.
//! 4. On completion the result is applied only if no resync with a higher
//!    ticket has been applied meanwhile. A superseded result is dropped and
//!    its callers receive a [`SyncResult`] describing what is installed.
//!
//! Resyncs run on spawned tasks, so dropping every caller does not abort the
//! network calls.
//!
//! [`SyncService`] drives periodic background refresh through the same
//! coordinator.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{RemoteError, SyncError};
use crate::remote::RemoteClient;
use crate::store::{EntityStore, Snapshot};

/// Default background refresh interval (5 minutes).
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Shortest period the background service accepts.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// What a completed resync left installed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncResult {
    pub generation: u64,
    pub feed_count: usize,
    pub category_count: usize,
    /// `false` when this resync was superseded by a newer one and its data
    /// was discarded; the other fields then describe the newer snapshot.
    pub applied: bool,
}

impl SyncResult {
    fn from_snapshot(snapshot: &Snapshot, applied: bool) -> Self {
        Self {
            generation: snapshot.generation(),
            feed_count: snapshot.feeds().len(),
            category_count: snapshot.categories().len(),
            applied,
        }
    }
}

type SyncWaiter = Shared<BoxFuture<'static, Result<SyncResult, SyncError>>>;

struct InFlight {
    ticket: u64,
    /// Invalidation epoch current when this resync started.
    covers: u64,
    waiter: SyncWaiter,
}

#[derive(Default)]
struct FlightState {
    next_ticket: u64,
    invalidation: u64,
    running: usize,
    in_flight: Option<InFlight>,
}

struct CoordinatorInner {
    remote: Arc<dyn RemoteClient>,
    store: EntityStore,
    flight: Mutex<FlightState>,
    /// Ticket of the last installed resync. Held across the staleness check
    /// and `replace`, so at most one install runs at a time.
    applied_ticket: Mutex<u64>,
}

/// Owns every write to the [`EntityStore`] that originates from the server.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    pub fn new(remote: Arc<dyn RemoteClient>, store: EntityStore) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                remote,
                store,
                flight: Mutex::new(FlightState::default()),
                applied_ticket: Mutex::new(0),
            }),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.inner.store
    }

    pub fn generation(&self) -> u64 {
        self.inner.store.generation()
    }

    /// Whether any resync task is still running.
    pub fn is_syncing(&self) -> bool {
        self.inner.flight.lock().running > 0
    }

    /// Mark server state as changed. Resyncs already in flight may have
    /// fetched the old state, so the next [`request_sync`](Self::request_sync)
    /// starts a fresh one instead of joining them.
    pub fn invalidate(&self) {
        let mut flight = self.inner.flight.lock();
        flight.invalidation += 1;
        debug!(epoch = flight.invalidation, "server state invalidated");
    }

    /// Resync the store, sharing an in-flight resync when one is fresh enough.
    ///
    /// # Errors
    ///
    /// Every caller coalesced onto a failed resync receives the same
    /// [`SyncError`]. The store is untouched on failure.
    pub async fn request_sync(&self) -> Result<SyncResult, SyncError> {
        let waiter = self.join_or_start();
        waiter.await
    }

    fn join_or_start(&self) -> SyncWaiter {
        let mut flight = self.inner.flight.lock();

        if let Some(current) = &flight.in_flight {
            if current.covers >= flight.invalidation {
                debug!(ticket = current.ticket, "joining in-flight resync");
                return current.waiter.clone();
            }
        }

        flight.next_ticket += 1;
        flight.running += 1;
        let ticket = flight.next_ticket;
        let covers = flight.invalidation;

        // The task's `finish` needs this lock, so it cannot clear the slot
        // before the waiter is stored below.
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run(ticket).await });
        let waiter: SyncWaiter = async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => Err(SyncError::Interrupted(err.to_string())),
            }
        }
        .boxed()
        .shared();

        if let Some(previous) = &flight.in_flight {
            debug!(
                ticket,
                superseding = previous.ticket,
                "starting resync after invalidation"
            );
        }
        flight.in_flight = Some(InFlight {
            ticket,
            covers,
            waiter: waiter.clone(),
        });
        waiter
    }
}

impl CoordinatorInner {
    async fn run(self: Arc<Self>, ticket: u64) -> Result<SyncResult, SyncError> {
        let _finish = FinishGuard {
            inner: &*self,
            ticket,
        };
        info!(ticket, "resync started");
        match self.fetch().await {
            Ok(candidate) => self.apply(ticket, candidate),
            Err(cause) => {
                warn!(ticket, error = %cause, retryable = cause.is_retryable(), "resync fetch failed");
                Err(SyncError::Failed { cause })
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, RemoteError> {
        let categories = self.remote.list_categories().await?;
        let mut feeds = self.remote.list_feeds().await?;
        let counters = self.remote.feed_counters().await?;
        for feed in &mut feeds {
            feed.unread_count = counters.unread(feed.id);
        }
        Ok(Snapshot::new(feeds, categories))
    }

    fn apply(&self, ticket: u64, candidate: Snapshot) -> Result<SyncResult, SyncError> {
        let mut applied = self.applied_ticket.lock();

        if ticket < *applied {
            let current = self.store.snapshot();
            debug!(
                ticket,
                applied_ticket = *applied,
                generation = current.generation(),
                "discarding superseded resync"
            );
            return Ok(SyncResult::from_snapshot(&current, false));
        }

        let installed = self.store.replace(candidate).map_err(|err| {
            error!(ticket, error = %err, "server snapshot rejected, keeping previous");
            SyncError::from(err)
        })?;
        *applied = ticket;

        info!(
            ticket,
            generation = installed.generation(),
            feeds = installed.feeds().len(),
            categories = installed.categories().len(),
            "resync applied"
        );
        Ok(SyncResult::from_snapshot(&installed, true))
    }

    fn finish(&self, ticket: u64) {
        let mut flight = self.flight.lock();
        flight.running -= 1;
        if flight.in_flight.as_ref().is_some_and(|f| f.ticket == ticket) {
            flight.in_flight = None;
        }
    }
}

/// Releases the in-flight slot even if the remote client panics.
struct FinishGuard<'a> {
    inner: &'a CoordinatorInner,
    ticket: u64,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.inner.finish(self.ticket);
    }
}

// ---------------------------------------------------------------------------
// Background refresh
// ---------------------------------------------------------------------------

/// Periodically resyncs through a [`SyncCoordinator`] until cancelled.
pub struct SyncService {
    coordinator: SyncCoordinator,
    sync_interval: Duration,
    sync_on_start: bool,
    shutdown: CancellationToken,
}

impl SyncService {
    pub fn new(coordinator: SyncCoordinator) -> Self {
        Self {
            coordinator,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            sync_on_start: true,
            shutdown: CancellationToken::new(),
        }
    }

    /// Set the refresh period. Values below [`MIN_SYNC_INTERVAL`] are raised to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval.max(MIN_SYNC_INTERVAL);
        self
    }

    /// Whether the first resync happens immediately or after one interval.
    pub fn sync_on_start(mut self, enabled: bool) -> Self {
        self.sync_on_start = enabled;
        self
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the refresh loop. Returns the number of resyncs attempted.
    pub async fn run(self) -> u64 {
        let start = if self.sync_on_start {
            Instant::now()
        } else {
            Instant::now() + self.sync_interval
        };
        let mut interval = time::interval_at(start, self.sync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts = 0;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(attempts, "sync service stopped");
                    return attempts;
                }
                _ = interval.tick() => {
                    attempts += 1;
                    self.do_sync().await;
                }
            }
        }
    }

    async fn do_sync(&self) {
        match self.coordinator.request_sync().await {
            Ok(result) => debug!(
                generation = result.generation,
                feeds = result.feed_count,
                applied = result.applied,
                "background resync completed"
            ),
            Err(err) => warn!(error = %err, "background resync failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
