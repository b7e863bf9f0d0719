//! # engine::sync
//!
//! **SyncLoop**: keeps one view's snapshot fresh by polling a set of
//! independent resources.
//!
//! ```text
//!  tick / refresh_now
//!     │
//!     ├─ resource A ── fetch ──▶ newer than applied? ── yes ──▶ apply slice A
//!     ├─ resource B ── fetch ──▶ failed ──▶ log + event, slice B untouched
//!     └─ resource C ── fetch ──▶ newer gen already applied ──▶ dropped silently
//! ```
//!
//! ## Rules
//! * Resources within one cycle run concurrently, in no particular order.
//! * A failing resource never touches the slices of the others.
//! * Every fetch captures its resource's generation when it starts; the
//!   result is applied only if it is newer than the last one applied for
//!   that resource. An older, slower response can never overwrite a newer
//!   one, and a fetch slower than the interval still lands.
//! * `refresh_now` runs one extra cycle and leaves the schedule alone.
//! * After `stop` (or drop) no fetch is issued and in-flight results are
//!   discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::NetworkError;
use crate::events::{DashboardEvent, EventBus};

// ─── Resource ─────────────────────────────────────────────────────────────────

/// A fetched slice, ready to be written into the snapshot.
pub type Apply<S> = Box<dyn FnOnce(&mut S) + Send>;

/// One independently fetchable part of a view's snapshot.
#[async_trait]
pub trait Resource<S>: Send + Sync {
    /// Stable name for logs and events.
    fn name(&self) -> &'static str;

    /// Fetch the latest value. On success, return how to write it into the
    /// snapshot; the loop decides whether it is still current.
    async fn fetch(&self) -> Result<Apply<S>, NetworkError>;
}

/// Something that can run an out-of-band sync cycle. The action gateway only
/// needs this much of a sync loop.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh_now(&self);
}

// ─── Shared State ─────────────────────────────────────────────────────────────

struct Slot<S> {
    resource:   Box<dyn Resource<S>>,
    /// Last generation started
    generation: AtomicU64,
    /// Last generation written into the snapshot
    applied:    AtomicU64,
    /// Generations at or below this were in flight at `stop` and never apply
    floor:      AtomicU64,
}

impl<S> Slot<S> {
    fn new(resource: Box<dyn Resource<S>>) -> Self {
        Self {
            resource,
            generation: AtomicU64::new(0),
            applied:    AtomicU64::new(0),
            floor:      AtomicU64::new(0),
        }
    }

    /// A result may land if it is newer than everything applied so far and
    /// was not started before the last `stop`.
    fn accepts(&self, generation: u64) -> bool {
        generation > self.applied.load(Ordering::SeqCst) && generation > self.floor.load(Ordering::SeqCst)
    }
}

struct Shared<S> {
    view:     &'static str,
    snapshot: RwLock<S>,
    slots:    Vec<Slot<S>>,
    stopped:  AtomicBool,
    events:   Option<EventBus>,
}

impl<S> Shared<S> {
    /// Mark stopped and fence off every fetch started so far. Returns whether
    /// the loop was running.
    fn halt(&self) -> bool {
        let was_running = !self.stopped.swap(true, Ordering::SeqCst);
        for slot in &self.slots {
            slot.floor.store(slot.generation.load(Ordering::SeqCst), Ordering::SeqCst);
        }
        was_running
    }
}

impl<S: Send + Sync + 'static> Shared<S> {
    async fn run_cycle(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        join_all(self.slots.iter().map(|slot| self.sync_slot(slot))).await;
    }

    async fn sync_slot(&self, slot: &Slot<S>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // `stop` may have landed between the check above and the bump.
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let name = slot.resource.name();

        let result = slot.resource.fetch().await;

        // Check and apply under the write lock so the applied generation only
        // ever moves forward.
        let mut snapshot = self.snapshot.write().await;

        if self.stopped.load(Ordering::SeqCst) {
            debug!(view = self.view, resource = name, generation, "Result discarded, loop stopped");
            return;
        }
        if !slot.accepts(generation) {
            debug!(view = self.view, resource = name, generation, "Stale result dropped");
            return;
        }

        match result {
            Ok(apply) => {
                apply(&mut *snapshot);
                slot.applied.store(generation, Ordering::SeqCst);
                drop(snapshot);
                self.publish(DashboardEvent::SnapshotUpdated {
                    view:     self.view,
                    resource: name,
                    generation,
                });
            }
            Err(e) => {
                drop(snapshot);
                warn!(view = self.view, resource = name, error = %e, "Resource refresh failed, keeping previous value");
                self.publish(DashboardEvent::ResourceFailed {
                    view:     self.view,
                    resource: name,
                    message:  e.to_string(),
                });
            }
        }
    }

    fn publish(&self, event: DashboardEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

// ─── Handle ───────────────────────────────────────────────────────────────────

/// Clonable access to a loop's snapshot and on-demand refresh. Holding a
/// handle does not keep the schedule alive.
pub struct SyncHandle<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for SyncHandle<S> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<S: Send + Sync + 'static> SyncHandle<S> {
    /// Run one cycle now and wait for every resource to settle.
    pub async fn refresh_now(&self) {
        self.shared.run_cycle().await;
    }

    /// Read the snapshot without cloning it.
    pub async fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.shared.snapshot.read().await;
        f(&guard)
    }

    pub async fn snapshot(&self) -> S
    where
        S: Clone,
    {
        self.shared.snapshot.read().await.clone()
    }

    pub fn view(&self) -> &'static str {
        self.shared.view
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> Refresh for SyncHandle<S> {
    async fn refresh_now(&self) {
        SyncHandle::refresh_now(self).await;
    }
}

// ─── SyncLoop ─────────────────────────────────────────────────────────────────

/// Owner of a view's polling schedule. Dropping it stops the schedule.
pub struct SyncLoop<S> {
    handle: SyncHandle<S>,
    ticker: Option<JoinHandle<()>>,
}

/// Collects resources before the loop is built.
pub struct SyncLoopBuilder<S> {
    view:      &'static str,
    initial:   S,
    resources: Vec<Box<dyn Resource<S>>>,
    events:    Option<EventBus>,
}

impl<S: Send + Sync + 'static> SyncLoopBuilder<S> {
    pub fn resource(mut self, resource: impl Resource<S> + 'static) -> Self {
        self.resources.push(Box::new(resource));
        self
    }

    /// Report per-resource outcomes on `bus` in addition to the logs.
    pub fn events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn build(self) -> SyncLoop<S> {
        let slots = self
            .resources
            .into_iter()
            .map(Slot::new)
            .collect();

        SyncLoop {
            handle: SyncHandle {
                shared: Arc::new(Shared {
                    view:     self.view,
                    snapshot: RwLock::new(self.initial),
                    slots,
                    stopped:  AtomicBool::new(false),
                    events:   self.events,
                }),
            },
            ticker: None,
        }
    }
}

impl<S: Send + Sync + 'static> SyncLoop<S> {
    pub fn builder(view: &'static str, initial: S) -> SyncLoopBuilder<S> {
        SyncLoopBuilder {
            view,
            initial,
            resources: Vec::new(),
            events: None,
        }
    }

    /// Start polling every `interval`, first cycle immediately. Starting a
    /// running loop replaces its schedule.
    ///
    /// Each tick spawns its cycle, so a slow cycle never delays the next tick;
    /// overlapping fetches are resolved by the generation check.
    pub fn start(&mut self, interval: Duration) {
        self.cancel_ticker();
        let shared = Arc::clone(&self.handle.shared);
        shared.stopped.store(false, Ordering::SeqCst);

        info!(view = shared.view, resources = shared.slots.len(), ?interval, "Sync loop started");

        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if shared.stopped.load(Ordering::SeqCst) {
                    break;
                }
                let cycle = Arc::clone(&shared);
                tokio::spawn(async move { cycle.run_cycle().await });
            }
        }));
    }

    /// Cancel the schedule. In-flight fetches may finish but are never applied.
    pub fn stop(&mut self) {
        let shared = Arc::clone(&self.handle.shared);
        let was_running = shared.halt();
        self.cancel_ticker();
        if was_running {
            info!(view = shared.view, "Sync loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some() && !self.handle.is_stopped()
    }

    /// Run one out-of-band cycle; the schedule's cadence is unchanged.
    pub async fn refresh_now(&self) {
        self.handle.refresh_now().await;
    }

    pub fn handle(&self) -> SyncHandle<S> {
        self.handle.clone()
    }

    pub async fn snapshot(&self) -> S
    where
        S: Clone,
    {
        self.handle.snapshot().await
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl<S> Drop for SyncLoop<S> {
    fn drop(&mut self) {
        self.handle.shared.halt();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
