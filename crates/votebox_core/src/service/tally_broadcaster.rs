//! Live tally fan-out to subscribed observers.
//!
//! # Responsibility
//! - Own the lifecycle-scoped registry of live observers.
//! - Push a fresh [`TallySnapshot`] to every observer after each commit.
//! - Answer synchronous snapshot requests from the authoritative store.
//!
//! # Invariants
//! - Delivery never blocks the publisher: each observer has a bounded queue
//!   fed with `try_send`. A full queue disconnects that observer; a dropped
//!   handle is pruned silently. Neither affects other observers.
//! - Publishing runs while the caller holds the store lock, so every
//!   observer sees snapshots in commit order.
//! - Observers only receive snapshots published after they subscribed.

use crate::model::tally::TallySnapshot;
use crate::repo::ballot_repo::{BallotRepository, SqliteBallotRepository};
use crate::repo::RepoError;
use crate::service::store::{StoreError, VoteStore};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{
    sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default per-observer queue length.
pub const DEFAULT_OBSERVER_QUEUE_CAPACITY: usize = 32;

/// Registry-local observer identifier.
pub type ObserverId = u64;

/// Errors from snapshot reads.
#[derive(Debug)]
pub enum BroadcastError {
    Store(StoreError),
    Repo(RepoError),
}

impl Display for BroadcastError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "tally read failed: {err}"),
        }
    }
}

impl Error for BroadcastError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<StoreError> for BroadcastError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for BroadcastError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Delivery summary of one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sequence: u64,
    pub delivered: usize,
    /// Observers removed during this publish (closed or overflowing).
    pub dropped: usize,
}

/// Receiving side of one subscription.
///
/// Dropping the handle ends the subscription; the broadcaster prunes it on
/// the next publish.
pub struct ObserverHandle {
    id: ObserverId,
    receiver: Receiver<Arc<TallySnapshot>>,
}

impl ObserverHandle {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Blocks until the next snapshot; `None` once the subscription is closed
    /// and drained.
    pub fn recv(&self) -> Option<Arc<TallySnapshot>> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Result<Arc<TallySnapshot>, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Arc<TallySnapshot>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Takes every queued snapshot without blocking.
    pub fn drain(&self) -> Vec<Arc<TallySnapshot>> {
        self.receiver.try_iter().collect()
    }
}

/// Publish/subscribe hub for tally updates.
pub struct TallyBroadcaster {
    store: VoteStore,
    observers: Mutex<BTreeMap<ObserverId, SyncSender<Arc<TallySnapshot>>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
    shut_down: AtomicBool,
}

impl TallyBroadcaster {
    /// Creates a broadcaster reading from `store`. A zero capacity is raised
    /// to one so that a queue can always hold the latest snapshot.
    pub fn new(store: VoteStore, queue_capacity: usize) -> Self {
        Self {
            store,
            observers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Registers a new observer.
    ///
    /// After [`shutdown`](Self::shutdown) the returned handle is already
    /// closed.
    pub fn subscribe(&self) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = sync_channel(self.queue_capacity);

        let mut observers = self.observers();
        if self.shut_down.load(Ordering::Acquire) {
            debug!("event=observer_subscribe module=broadcast status=closed observer_id={id}");
        } else {
            observers.insert(id, sender);
            debug!(
                "event=observer_subscribe module=broadcast status=ok observer_id={} observers={}",
                id,
                observers.len()
            );
        }

        ObserverHandle { id, receiver }
    }

    /// Ends the subscription behind `handle`; its queue closes once drained.
    /// Repeated calls are a no-op.
    pub fn unsubscribe(&self, handle: &ObserverHandle) {
        self.unsubscribe_id(handle.id);
    }

    /// Removes an observer by id. Unknown or already removed ids are a no-op.
    pub fn unsubscribe_id(&self, id: ObserverId) {
        if self.observers().remove(&id).is_some() {
            debug!("event=observer_unsubscribe module=broadcast status=ok observer_id={id}");
        }
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    /// Reads the current tally from the authoritative store.
    pub fn snapshot(&self) -> Result<TallySnapshot, BroadcastError> {
        let conn = self.store.lock()?;
        Ok(SqliteBallotRepository::new(&conn).read_tally()?)
    }

    /// Recomputes the tally and pushes it to every observer.
    pub fn on_commit(&self) -> Result<BroadcastReport, BroadcastError> {
        let conn = self.store.lock()?;
        self.publish_from(&conn)
    }

    /// Publishes using a connection the caller already holds locked.
    pub(crate) fn publish_from(
        &self,
        conn: &Connection,
    ) -> Result<BroadcastReport, BroadcastError> {
        let snapshot = SqliteBallotRepository::new(conn).read_tally()?;
        Ok(self.fan_out(Arc::new(snapshot)))
    }

    /// Closes every observer queue and rejects future subscriptions.
    pub fn shutdown(&self) {
        let mut observers = self.observers();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let closed = observers.len();
        observers.clear();
        info!("event=broadcast_shutdown module=broadcast status=ok closed_observers={closed}");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn fan_out(&self, snapshot: Arc<TallySnapshot>) -> BroadcastReport {
        let sequence = snapshot.sequence;
        let mut delivered = 0;
        let mut dropped = 0;

        let mut observers = self.observers();
        observers.retain(|id, sender| match sender.try_send(Arc::clone(&snapshot)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(
                    "event=broadcast module=broadcast status=overflow observer_id={id} sequence={sequence}"
                );
                dropped += 1;
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(
                    "event=broadcast module=broadcast status=disconnected observer_id={id} sequence={sequence}"
                );
                dropped += 1;
                false
            }
        });

        debug!(
            "event=broadcast module=broadcast status=ok sequence={} delivered={} dropped={}",
            sequence, delivered, dropped
        );
        BroadcastReport {
            sequence,
            delivered,
            dropped,
        }
    }

    // The map holds no cross-entry invariant, so a poisoned lock is still usable.
    fn observers(&self) -> MutexGuard<'_, BTreeMap<ObserverId, SyncSender<Arc<TallySnapshot>>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
