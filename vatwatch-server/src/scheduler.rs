//! Refresh scheduler and subscription fan-out.
//!
//! One background task owns the subscriber registry and both refresh
//! timers. It is the only place that runs reconciliation, so no subscriber
//! state is ever touched concurrently. `subscribe` only appends to a small
//! inbox under a lock; unsubscribe and shutdown travel over a control
//! channel. Fetches run on their own tasks and hand finished snapshots back
//! to the loop, which publishes them as immutable `Arc`s that outside
//! readers can grab at any time.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use vatwatch_core::config::Config;
use vatwatch_core::{BoxedFilter, Catalog, LiveSnapshot, ResolutionMiss, Result, WatchError};

use crate::fetch::{fetch_catalog, fetch_live, Fetcher, Sources};
use crate::subscription::{self, Subscriber, Subscription};

/// Messages handled by the control loop.
#[derive(Debug)]
pub(crate) enum Control {
    Unsubscribe(u64),
    Shutdown,
}

type ReadyFn = Box<dyn FnOnce() + Send>;

/// Where to fetch from and how often.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub sources: Sources,
    pub catalog_period: Duration,
    pub live_period: Duration,
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        SchedulerConfig {
            sources: Sources::from(&config.sources),
            catalog_period: config.refresh.catalog_period(),
            live_period: config.refresh.live_period(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inbox {
    pending: Vec<Subscriber>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    inbox: Mutex<Inbox>,
    wakeup: Notify,
    catalog: RwLock<Option<Arc<Catalog>>>,
    live: RwLock<Option<Arc<LiveSnapshot>>>,
    next_id: AtomicU64,
}

impl Shared {
    fn inbox(&self) -> std::sync::MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn live(&self) -> Option<Arc<LiveSnapshot>> {
        self.live.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn publish_catalog(&self, catalog: Arc<Catalog>) {
        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = Some(catalog);
    }

    fn publish_live(&self, live: Arc<LiveSnapshot>) {
        *self.live.write().unwrap_or_else(|e| e.into_inner()) = Some(live);
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Handle to a running scheduler. Dropping it stops the control loop.
pub struct Scheduler {
    shared: Arc<Shared>,
    control: mpsc::UnboundedSender<Control>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Spawn the control loop on the current tokio runtime.
    pub fn start(config: SchedulerConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::spawn(config, fetcher, None)
    }

    /// Like `start`, calling `ready` once after the first catalog is
    /// published.
    pub fn start_with_ready<F>(config: SchedulerConfig, fetcher: Arc<dyn Fetcher>, ready: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(config, fetcher, Some(Box::new(ready)))
    }

    fn spawn(config: SchedulerConfig, fetcher: Arc<dyn Fetcher>, ready: Option<ReadyFn>) -> Self {
        let shared = Arc::new(Shared::default());
        let (control, control_rx) = mpsc::unbounded_channel();

        let control_loop = ControlLoop::new(Arc::clone(&shared), fetcher, config, control_rx, ready);
        let task = tokio::spawn(control_loop.run());

        Scheduler {
            shared,
            control,
            task: Mutex::new(Some(task)),
        }
    }

    /// Register a new subscriber. It is adopted by the control loop on its
    /// next wakeup and, if a catalog is already published, receives a
    /// catch-up pass first.
    ///
    /// After shutdown the returned subscription is already closed.
    pub fn subscribe(
        &self,
        capacity: usize,
        controlled_only: bool,
        filters: Vec<BoxedFilter>,
    ) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (mut subscriber, subscription) =
            subscription::channel(id, capacity, controlled_only, filters, self.control.clone());

        let mut inbox = self.shared.inbox();
        if inbox.closed {
            subscriber.close();
            return subscription;
        }
        inbox.pending.push(subscriber);
        drop(inbox);

        tracing::debug!(subscription = id, capacity, controlled_only, "subscribed");
        self.shared.wakeup.notify_one();
        subscription
    }

    pub fn unsubscribe(&self, subscription: &Subscription) {
        subscription.unsubscribe();
    }

    /// Most recently published catalog.
    pub fn current_catalog(&self) -> Option<Arc<Catalog>> {
        self.shared.catalog()
    }

    /// Most recently published live snapshot.
    pub fn current_live(&self) -> Option<Arc<LiveSnapshot>> {
        self.shared.live()
    }

    /// Request shutdown without waiting. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut inbox = self.shared.inbox();
        if inbox.closed {
            return;
        }
        inbox.closed = true;
        drop(inbox);
        let _ = self.control.send(Control::Shutdown);
    }

    /// Stop and wait for the control loop to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "control loop ended abnormally");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

/// A finished fetch, handed back to the control loop.
enum Fetched {
    Catalog(Result<Catalog>),
    Live(Result<LiveSnapshot>),
}

struct ControlLoop {
    shared: Arc<Shared>,
    fetcher: Arc<dyn Fetcher>,
    config: SchedulerConfig,
    control: mpsc::UnboundedReceiver<Control>,
    registry: BTreeMap<u64, Subscriber>,
    ready: Option<ReadyFn>,
    last_misses: HashSet<ResolutionMiss>,
    fetched_tx: mpsc::UnboundedSender<Fetched>,
    fetched_rx: mpsc::UnboundedReceiver<Fetched>,
    catalog_fetch: Option<JoinHandle<()>>,
    live_fetch: Option<JoinHandle<()>>,
    starting: bool,
}

impl ControlLoop {
    fn new(
        shared: Arc<Shared>,
        fetcher: Arc<dyn Fetcher>,
        config: SchedulerConfig,
        control: mpsc::UnboundedReceiver<Control>,
        ready: Option<ReadyFn>,
    ) -> Self {
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
        ControlLoop {
            shared,
            fetcher,
            config,
            control,
            registry: BTreeMap::new(),
            ready,
            last_misses: HashSet::new(),
            fetched_tx,
            fetched_rx,
            catalog_fetch: None,
            live_fetch: None,
            starting: true,
        }
    }

    /// Fetches run on their own tasks so control messages are never stuck
    /// behind a slow source. Results are applied here, in arrival order.
    async fn run(mut self) {
        self.adopt_pending();
        // The startup live fetch is chained off the first catalog result.
        self.start_catalog_fetch();

        let catalog_period = self.config.catalog_period;
        let live_period = self.config.live_period;
        let mut catalog_tick = interval_at(Instant::now() + catalog_period, catalog_period);
        let mut live_tick = interval_at(Instant::now() + live_period, live_period);
        catalog_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        live_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                msg = self.control.recv() => match msg {
                    Some(Control::Unsubscribe(id)) => self.remove(id),
                    Some(Control::Shutdown) | None => break,
                },
                Some(fetched) = self.fetched_rx.recv() => self.apply(fetched),
                _ = self.shared.wakeup.notified() => self.adopt_pending(),
                _ = catalog_tick.tick() => self.start_catalog_fetch(),
                _ = live_tick.tick() => self.start_live_fetch(),
            }
        }

        for task in [self.catalog_fetch.take(), self.live_fetch.take()].into_iter().flatten() {
            task.abort();
        }
        self.close_all();
        tracing::info!("scheduler stopped");
    }

    /// Move inbox subscribers into the registry, bringing each up to date
    /// with whatever has already been published.
    fn adopt_pending(&mut self) {
        let pending = std::mem::take(&mut self.shared.inbox().pending);
        if pending.is_empty() {
            return;
        }

        let catalog = self.shared.catalog();
        let live = self.shared.live();
        let mut misses = Vec::new();

        for mut subscriber in pending {
            if let Some(catalog) = &catalog {
                misses.extend(subscriber.process_static(catalog));
                if let Some(live) = &live {
                    misses.extend(subscriber.process_dynamic(live, catalog));
                }
            }
            self.registry.insert(subscriber.id(), subscriber);
        }

        self.report_misses(misses, false);
    }

    fn remove(&mut self, id: u64) {
        // The request can overtake the wakeup that would have adopted it.
        self.adopt_pending();
        if let Some(mut subscriber) = self.registry.remove(&id) {
            subscriber.close();
            tracing::debug!(subscription = id, "unsubscribed");
        }
    }

    fn close_all(&mut self) {
        let pending = std::mem::take(&mut self.shared.inbox().pending);
        for mut subscriber in pending {
            subscriber.close();
        }
        for subscriber in self.registry.values_mut() {
            subscriber.close();
        }
        self.registry.clear();
    }

    // -- fetch -------------------------------------------------------------

    fn start_catalog_fetch(&mut self) {
        if self.catalog_fetch.is_some() {
            tracing::debug!("catalog fetch still in flight, skipping tick");
            return;
        }
        let fetcher = Arc::clone(&self.fetcher);
        let sources = self.config.sources.clone();
        let tx = self.fetched_tx.clone();
        self.catalog_fetch = Some(tokio::spawn(async move {
            let result = fetch_catalog(fetcher.as_ref(), &sources).await;
            let _ = tx.send(Fetched::Catalog(result));
        }));
    }

    fn start_live_fetch(&mut self) {
        if self.shared.catalog().is_none() {
            tracing::debug!("live refresh skipped, no catalog yet");
            return;
        }
        if self.live_fetch.is_some() {
            tracing::debug!("live fetch still in flight, skipping tick");
            return;
        }
        let fetcher = Arc::clone(&self.fetcher);
        let sources = self.config.sources.clone();
        let tx = self.fetched_tx.clone();
        self.live_fetch = Some(tokio::spawn(async move {
            let result = fetch_live(fetcher.as_ref(), &sources).await;
            let _ = tx.send(Fetched::Live(result));
        }));
    }

    fn apply(&mut self, fetched: Fetched) {
        match fetched {
            Fetched::Catalog(result) => {
                self.catalog_fetch = None;
                match result {
                    Ok(catalog) => self.apply_catalog(Arc::new(catalog)),
                    Err(e) => {
                        tracing::warn!(error = %e, "catalog refresh failed, keeping previous catalog")
                    }
                }
                if std::mem::take(&mut self.starting) {
                    self.start_live_fetch();
                }
            }
            Fetched::Live(result) => {
                self.live_fetch = None;
                match result.and_then(|live| self.apply_live(Arc::new(live))) {
                    Ok(live) => tracing::info!(
                        controllers = live.controllers().len(),
                        atis = live.atis().len(),
                        subscribers = self.registry.len(),
                        "live snapshot refreshed"
                    ),
                    Err(WatchError::NotReady) => {
                        tracing::debug!("live refresh skipped, no catalog yet")
                    }
                    Err(e) => tracing::warn!(error = %e, "live refresh failed"),
                }
            }
        }
    }

    // -- refresh -----------------------------------------------------------

    fn apply_catalog(&mut self, catalog: Arc<Catalog>) {
        self.shared.publish_catalog(Arc::clone(&catalog));
        tracing::info!(
            countries = catalog.countries().len(),
            airports = catalog.airports().len(),
            firs = catalog.firs().len(),
            uirs = catalog.uirs().len(),
            "catalog refreshed"
        );

        let mut misses = Vec::new();
        for subscriber in self.registry.values_mut() {
            misses.extend(subscriber.process_static(&catalog));
        }
        self.report_misses(misses, false);
        self.prune();

        if let Some(ready) = self.ready.take() {
            ready();
        }
    }

    fn apply_live(&mut self, live: Arc<LiveSnapshot>) -> Result<Arc<LiveSnapshot>> {
        let catalog = self.shared.catalog().ok_or(WatchError::NotReady)?;
        self.shared.publish_live(Arc::clone(&live));

        let mut misses = Vec::new();
        for subscriber in self.registry.values_mut() {
            misses.extend(subscriber.process_dynamic(&live, &catalog));
        }
        self.report_misses(misses, true);
        self.prune();

        Ok(live)
    }

    fn prune(&mut self) {
        self.registry.retain(|_, subscriber| !subscriber.is_closed());
    }

    /// Log each miss once while it persists. Every subscriber sees the same
    /// roster, so the same miss usually arrives many times per tick.
    fn report_misses(&mut self, misses: Vec<ResolutionMiss>, full_roster: bool) {
        let current: HashSet<ResolutionMiss> = misses.into_iter().collect();
        for miss in current.difference(&self.last_misses) {
            tracing::warn!(callsign = %miss.callsign, kind = ?miss.kind, "{miss}");
        }
        if full_roster {
            self.last_misses = current;
        } else {
            self.last_misses.extend(current);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
