//! Subscriptions: one reconciler, one filter chain, one bounded queue.
//!
//! The scheduler owns the `Subscriber` side and is the only code that ever
//! runs its reconciler. Consumers hold the `Subscription` handle and drain
//! events from it. Delivery never blocks: when the queue is full the new
//! event is dropped and counted, and reconciliation proceeds as if it had
//! been sent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use vatwatch_core::filter::accepts_all;
use vatwatch_core::{BoxedFilter, Catalog, Change, LiveSnapshot, Reconciler, ResolutionMiss};

use crate::scheduler::Control;

/// Delivery counters shared between both halves of a subscription.
#[derive(Debug, Default)]
pub struct QueueStats {
    delivered: AtomicU64,
    consumed: AtomicU64,
    dropped: AtomicU64,
    filtered: AtomicU64,
    closed: AtomicBool,
}

impl QueueStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

/// Outcome of a single send. Every variant counts as delivered from the
/// reconciler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    Filtered,
    Dropped,
    Closed,
}

// ---------------------------------------------------------------------------
// Consumer handle
// ---------------------------------------------------------------------------

/// Read side of a subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    capacity: usize,
    rx: mpsc::Receiver<Change>,
    stats: Arc<QueueStats>,
    control: mpsc::UnboundedSender<Control>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once the subscription has been torn down and
    /// the queue drained.
    pub async fn recv(&mut self) -> Option<Change> {
        let change = self.rx.recv().await;
        if change.is_some() {
            self.stats.consumed.fetch_add(1, Ordering::Relaxed);
        }
        change
    }

    /// Next event if one is queued. `None` both when empty and when closed;
    /// use `is_closed` to tell them apart.
    pub fn try_recv(&mut self) -> Option<Change> {
        match self.rx.try_recv() {
            Ok(change) => {
                self.stats.consumed.fetch_add(1, Ordering::Relaxed);
                Some(change)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Events waiting in the queue.
    pub fn queued(&self) -> usize {
        let delivered = self.stats.delivered.load(Ordering::Relaxed);
        let consumed = self.stats.consumed.load(Ordering::Relaxed);
        delivered.saturating_sub(consumed) as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.stats.dropped()
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.stats.is_closed()
    }

    /// Ask the scheduler to tear this subscription down. Takes effect once
    /// the control loop processes the request; events already queued can
    /// still be drained.
    pub fn unsubscribe(&self) {
        let _ = self.control.send(Control::Unsubscribe(self.id));
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("queued", &self.queued())
            .field("dropped", &self.dropped())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Scheduler side
// ---------------------------------------------------------------------------

/// Write side of a subscription, owned by the control loop.
pub(crate) struct Subscriber {
    id: u64,
    reconciler: Reconciler,
    filters: Vec<BoxedFilter>,
    capacity: usize,
    tx: Option<mpsc::Sender<Change>>,
    stats: Arc<QueueStats>,
}

/// Build both halves of a subscription.
///
/// A zero-capacity subscription still gets a channel so the handle has
/// something to wait on, but nothing is ever sent into it.
pub(crate) fn channel(
    id: u64,
    capacity: usize,
    controlled_only: bool,
    filters: Vec<BoxedFilter>,
    control: mpsc::UnboundedSender<Control>,
) -> (Subscriber, Subscription) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stats = Arc::new(QueueStats::default());

    let subscriber = Subscriber {
        id,
        reconciler: Reconciler::new(controlled_only),
        filters,
        capacity,
        tx: Some(tx),
        stats: Arc::clone(&stats),
    };
    let subscription = Subscription {
        id,
        capacity,
        rx,
        stats,
        control,
    };
    (subscriber, subscription)
}

impl Subscriber {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    /// Drop the sender. The consumer sees `None` after draining.
    pub(crate) fn close(&mut self) {
        if self.tx.take().is_some() {
            self.stats.closed.store(true, Ordering::Relaxed);
        }
    }

    pub(crate) fn process_static(&mut self, catalog: &Catalog) -> Vec<ResolutionMiss> {
        if self.is_closed() {
            return Vec::new();
        }
        let pass = self.reconciler.process_static(catalog);
        for change in pass.changes {
            self.send_update(change);
        }
        pass.misses
    }

    pub(crate) fn process_dynamic(
        &mut self,
        live: &LiveSnapshot,
        catalog: &Catalog,
    ) -> Vec<ResolutionMiss> {
        if self.is_closed() {
            return Vec::new();
        }
        let pass = self.reconciler.process_dynamic(live, catalog);
        for change in pass.changes {
            self.send_update(change);
        }
        pass.misses
    }

    /// Run the filter chain and enqueue without waiting.
    pub(crate) fn send_update(&mut self, change: Change) -> Delivery {
        let Some(tx) = &self.tx else {
            return Delivery::Closed;
        };

        if !accepts_all(&self.filters, &change) {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            return Delivery::Filtered;
        }

        if self.capacity == 0 {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return Delivery::Dropped;
        }

        match tx.try_send(change) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                Delivery::Queued
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(subscription = self.id, "receiver gone, closing queue");
                self.close();
                Delivery::Closed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
