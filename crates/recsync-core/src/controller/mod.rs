//! Per-collection synchronization controller.
//!
//! One controller owns the working copy of one collection kind. It loads the
//! collection on activation, polls the remote for newer versions, applies
//! edits optimistically and saves them in the background, and reloads when
//! another controller for the same collection announces a change.
//!
//! Edits are never rolled back: once applied, the local snapshot stays the
//! truth for this process until the next successful reload, whatever the
//! outcome of the save.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::bus::{ChangeBus, SubscriberId, Subscription};
use crate::config::{ClientConfig, DEFAULT_POLL_INTERVAL};
use crate::models::{Collection, ParentRecord, Record, RecordId, Snapshot};
use crate::mutators::{self, Applied, Inserted};
use crate::remote::{RemoteBackend, RemoteStore};
use crate::storage::{FileSnapshotStore, LocalMirror};
use crate::util::unix_timestamp_millis;


/// Lifecycle of a controller. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    Loading,
    Ready,
}

/// Construction-time settings for a controller.
pub struct ControllerOptions<R> {
    pub poll_interval: Duration,
    /// Local persisted copy used as load fallback and rewritten on every change
    pub mirror: Option<LocalMirror<R>>,
    /// Source of "now" in Unix ms for version stamps and ids
    pub clock: fn() -> i64,
}

impl<R> Default for ControllerOptions<R> {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            mirror: None,
            clock: unix_timestamp_millis,
        }
    }
}

/// Cheap-to-clone handle; all clones drive the same controller.
///
/// The controller tears itself down (poll task cancelled, bus handler removed)
/// on [`SyncController::shutdown`] or when the last handle is dropped.
pub struct SyncController<R: Collection, S: RemoteStore<R>> {
    inner: Arc<Inner<R, S>>,
}

impl<R: Collection, S: RemoteStore<R>> Clone for SyncController<R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R: Collection, S: RemoteStore<R>> {
    remote: Arc<S>,
    bus: ChangeBus,
    mirror: Option<LocalMirror<R>>,
    poll_interval: Duration,
    clock: fn() -> i64,
    cache: watch::Sender<Snapshot<R>>,
    phase: watch::Sender<SyncPhase>,
    pending_saves: Arc<watch::Sender<usize>>,
    /// Serialises every cache replacement with its mirror write.
    writer: Mutex<()>,
    runtime: Mutex<Background>,
}

/// Resources that exist only between activation and teardown.
#[derive(Default)]
struct Background {
    handle: Option<Handle>,
    poll_task: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
    shut_down: bool,
}

impl Background {
    fn teardown(&mut self) {
        self.shut_down = true;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl<R: Collection> SyncController<R, RemoteBackend> {
    /// Controller wired from client configuration: HTTP remote when a base URL
    /// is set (local-only otherwise) and a file mirror under `data_dir`.
    pub fn from_config(config: &ClientConfig, bus: ChangeBus) -> crate::Result<Self> {
        let remote = RemoteBackend::from_config(config)?;
        let store = Arc::new(FileSnapshotStore::new(&config.data_dir));
        let options = ControllerOptions {
            poll_interval: config.poll_interval,
            mirror: Some(LocalMirror::for_collection(store)),
            ..ControllerOptions::default()
        };
        Ok(Self::with_options(Arc::new(remote), bus, options))
    }
}

impl<R: Collection, S: RemoteStore<R>> SyncController<R, S> {
    pub fn new(remote: Arc<S>, bus: ChangeBus) -> Self {
        Self::with_options(remote, bus, ControllerOptions::default())
    }

    pub fn with_options(remote: Arc<S>, bus: ChangeBus, options: ControllerOptions<R>) -> Self {
        let (cache, _) = watch::channel(Snapshot::empty(0));
        let (phase, _) = watch::channel(SyncPhase::Uninitialized);
        let (pending_saves, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                remote,
                bus,
                mirror: options.mirror,
                poll_interval: options.poll_interval,
                clock: options.clock,
                cache,
                phase,
                pending_saves: Arc::new(pending_saves),
                writer: Mutex::new(()),
                runtime: Mutex::new(Background::default()),
            }),
        }
    }

    /// Load the collection and start background reconciliation.
    ///
    /// Always ends in [`SyncPhase::Ready`]: if the remote load fails the cache
    /// falls back to the local mirror, or to an empty collection stamped with
    /// the activation time. Calling this more than once is a no-op.
    pub async fn activate(&self) {
        let started = self.inner.phase.send_if_modified(|phase| {
            if *phase == SyncPhase::Uninitialized {
                *phase = SyncPhase::Loading;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }

        let activated_at = (self.inner.clock)();
        self.inner.lock_runtime().handle = Some(Handle::current());

        match self.inner.remote.fetch_all().await {
            Ok(snapshot) => {
                tracing::info!(
                    "Loaded {} {} from remote (version {})",
                    snapshot.len(),
                    R::NAME,
                    snapshot.last_modified
                );
                self.inner.install(snapshot);
            }
            Err(error) => {
                if self.inner.remote.is_configured() {
                    tracing::warn!("Initial load of {} failed: {}", R::NAME, error);
                } else {
                    tracing::debug!("No remote for {}: {}", R::NAME, error);
                }
                // The mirror is left as it is until the first real change.
                self.inner
                    .cache
                    .send_replace(self.inner.fallback_snapshot(activated_at));
            }
        }
        self.inner.phase.send_replace(SyncPhase::Ready);

        self.start_background();
    }

    fn start_background(&self) {
        let mut runtime = self.inner.lock_runtime();
        if runtime.shut_down {
            tracing::debug!("{} controller shut down during activation", R::NAME);
            return;
        }
        let Some(handle) = runtime.handle.clone() else {
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        let reload_handle = handle.clone();
        runtime.subscription = Some(self.inner.bus.subscribe(R::NAME, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            tracing::debug!("Change notification for {}; reloading", R::NAME);
            reload_handle.spawn(async move {
                inner.reload().await;
            });
        }));

        let period = self.inner.poll_interval;
        runtime.poll_task = Some(handle.spawn(poll_loop(
            Arc::downgrade(&self.inner),
            Instant::now() + period,
            period,
        )));
    }

    /// Stop polling and stop listening for change notifications.
    ///
    /// The cache stays readable; in-flight saves still complete.
    pub fn shutdown(&self) {
        self.inner.lock_runtime().teardown();
        tracing::debug!("{} controller shut down", R::NAME);
    }

    pub fn phase(&self) -> SyncPhase {
        *self.inner.phase.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == SyncPhase::Ready
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> Snapshot<R> {
        self.inner.cache.borrow().clone()
    }

    pub fn items(&self) -> Vec<R> {
        self.inner.cache.borrow().items.clone()
    }

    pub fn get(&self, id: &RecordId) -> Option<R> {
        self.inner.cache.borrow().get(id).cloned()
    }

    pub fn last_modified(&self) -> i64 {
        self.inner.cache.borrow().last_modified
    }

    /// Receiver that observes every cache replacement.
    pub fn watch(&self) -> watch::Receiver<Snapshot<R>> {
        self.inner.cache.subscribe()
    }

    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.inner.phase.subscribe()
    }

    /// Number of background saves still in flight.
    pub fn pending_saves(&self) -> usize {
        *self.inner.pending_saves.borrow()
    }

    /// Wait until every background save issued so far has finished.
    pub async fn settle(&self) {
        let mut pending = self.inner.pending_saves.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = pending.wait_for(|count| *count == 0).await;
    }

    /// Replace the cache with a fresh remote read. Returns whether it succeeded.
    pub async fn reload(&self) -> bool {
        self.inner.reload().await
    }

    /// Run one staleness check, reloading when the remote is newer.
    ///
    /// Returns whether a reload replaced the cache.
    pub async fn check_for_updates(&self) -> bool {
        self.inner.check_for_updates().await
    }

    /// Create a record; it is visible in the cache when this returns.
    pub fn add_record(&self, draft: R::Draft) -> R {
        let now = (self.inner.clock)();
        self.inner.write(|snapshot| {
            let Inserted { snapshot, record } = mutators::insert(snapshot, draft, now);
            (Some(snapshot), record)
        })
    }

    /// Shallow-merge `patch` into record `id`. `None` if no such record.
    pub fn update_record(&self, id: &RecordId, patch: R::Patch) -> Option<R> {
        let now = (self.inner.clock)();
        self.inner
            .commit(|snapshot| mutators::patch(snapshot, id, patch, now))
    }

    /// Remove record `id`, returning it. `None` if no such record.
    pub fn remove_record(&self, id: &RecordId) -> Option<R> {
        let now = (self.inner.clock)();
        self.inner
            .commit(|snapshot| mutators::remove(snapshot, id, now))
    }
}

impl<P, S> SyncController<P, S>
where
    P: Collection + ParentRecord,
    S: RemoteStore<P>,
{
    /// Add a child to parent `parent_id`. `None` if no such parent.
    pub fn add_child(
        &self,
        parent_id: &RecordId,
        draft: <P::Child as Record>::Draft,
    ) -> Option<P::Child> {
        let now = (self.inner.clock)();
        self.inner
            .commit(|snapshot| mutators::insert_child(snapshot, parent_id, draft, now))
    }

    pub fn update_child(
        &self,
        parent_id: &RecordId,
        child_id: &RecordId,
        patch: <P::Child as Record>::Patch,
    ) -> Option<P::Child> {
        let now = (self.inner.clock)();
        self.inner.commit(|snapshot| {
            mutators::patch_child(snapshot, parent_id, child_id, patch, now)
        })
    }

    pub fn remove_child(&self, parent_id: &RecordId, child_id: &RecordId) -> Option<P::Child> {
        let now = (self.inner.clock)();
        self.inner
            .commit(|snapshot| mutators::remove_child(snapshot, parent_id, child_id, now))
    }
}

impl<R: Collection, S: RemoteStore<R>> Inner<R, S> {
    fn lock_runtime(&self) -> std::sync::MutexGuard<'_, Background> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `mutate` against the current snapshot and, when it yields a
    /// successor, install it and start the background save.
    ///
    /// Holds the write lock throughout, so concurrent callers on one
    /// controller are applied strictly one after another and their saves are
    /// issued in the same order.
    fn write<T>(&self, mutate: impl FnOnce(&Snapshot<R>) -> (Option<Snapshot<R>>, T)) -> T {
        let _writer = self.lock_writer();
        let (successor, outcome) = mutate(&self.cache.borrow());
        match successor {
            Some(snapshot) => {
                self.replace_cache(snapshot.clone());
                self.spawn_save(snapshot);
            }
            None => tracing::debug!("Mutation on {} matched nothing; cache unchanged", R::NAME),
        }
        outcome
    }

    fn commit<T>(&self, mutate: impl FnOnce(&Snapshot<R>) -> Applied<R, T>) -> Option<T> {
        self.write(|current| {
            let Applied { snapshot, affected } = mutate(current);
            (affected.is_some().then_some(snapshot), affected)
        })
    }

    /// Replace the cache wholesale, outside of any mutation.
    fn install(&self, snapshot: Snapshot<R>) {
        let _writer = self.lock_writer();
        self.replace_cache(snapshot);
    }

    /// Caller holds the write lock, so the mirror always ends up holding the
    /// snapshot that was installed last.
    fn replace_cache(&self, snapshot: Snapshot<R>) {
        self.persist_mirror(&snapshot);
        self.cache.send_replace(snapshot);
    }

    /// Save `snapshot` in the background, then publish the change whatever
    /// the save outcome.
    fn spawn_save(&self, snapshot: Snapshot<R>) {
        let (handle, origin) = {
            let runtime = self.lock_runtime();
            (
                runtime.handle.clone().or_else(|| Handle::try_current().ok()),
                runtime.subscription.as_ref().map(Subscription::id),
            )
        };

        let Some(handle) = handle else {
            tracing::warn!(
                "No async runtime available; {} change kept locally without saving",
                R::NAME
            );
            self.bus.publish_except(R::NAME, origin);
            return;
        };

        let remote = Arc::clone(&self.remote);
        let bus = self.bus.clone();
        let pending = PendingSave::begin(Arc::clone(&self.pending_saves));
        handle.spawn(save_and_announce(remote, bus, origin, snapshot, pending));
    }

    async fn reload(&self) -> bool {
        match self.remote.fetch_all().await {
            Ok(snapshot) => {
                tracing::debug!(
                    "Reloaded {} {} (version {})",
                    snapshot.len(),
                    R::NAME,
                    snapshot.last_modified
                );
                self.install(snapshot);
                true
            }
            Err(error) => {
                tracing::warn!("Reload of {} failed; keeping local state: {}", R::NAME, error);
                false
            }
        }
    }

    async fn check_for_updates(&self) -> bool {
        let known_version = self.cache.borrow().last_modified;
        match self.remote.check_stale(known_version).await {
            Ok(true) => {
                tracing::info!(
                    "Remote {} is newer than version {}; reloading",
                    R::NAME,
                    known_version
                );
                self.reload().await
            }
            Ok(false) => false,
            Err(error) if error.is_transient() => {
                tracing::debug!("Staleness check for {} skipped: {}", R::NAME, error);
                false
            }
            Err(error) => {
                tracing::warn!("Staleness check for {} failed: {}", R::NAME, error);
                false
            }
        }
    }

    fn fallback_snapshot(&self, activated_at: i64) -> Snapshot<R> {
        if let Some(snapshot) = self.mirror.as_ref().and_then(LocalMirror::load) {
            tracing::info!(
                "Using local mirror for {} ({} items, version {})",
                R::NAME,
                snapshot.len(),
                snapshot.last_modified
            );
            return snapshot;
        }
        Snapshot::empty(activated_at)
    }

    fn persist_mirror(&self, snapshot: &Snapshot<R>) {
        if let Some(mirror) = &self.mirror {
            if let Err(error) = mirror.persist(snapshot) {
                tracing::warn!(
                    "Failed to write local mirror '{}': {}",
                    mirror.key(),
                    error
                );
            }
        }
    }
}

impl<R: Collection, S: RemoteStore<R>> Drop for Inner<R, S> {
    fn drop(&mut self) {
        self.runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .teardown();
    }
}

async fn poll_loop<R: Collection, S: RemoteStore<R>>(
    inner: Weak<Inner<R, S>>,
    first_tick: Instant,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.check_for_updates().await;
    }
}

async fn save_and_announce<R: Collection, S: RemoteStore<R>>(
    remote: Arc<S>,
    bus: ChangeBus,
    origin: Option<SubscriberId>,
    snapshot: Snapshot<R>,
    pending: PendingSave,
) {
    match remote.save(&snapshot).await {
        Ok(()) => tracing::debug!(
            "Saved {} {} (version {})",
            snapshot.len(),
            R::NAME,
            snapshot.last_modified
        ),
        Err(error) => tracing::warn!(
            "Background save of {} failed; keeping local changes: {}",
            R::NAME,
            error
        ),
    }
    bus.publish_except(R::NAME, origin);
    drop(pending);
}

/// Counts one in-flight save for as long as it lives.
struct PendingSave(Arc<watch::Sender<usize>>);

impl PendingSave {
    fn begin(counter: Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|count| *count += 1);
        Self(counter)
    }
}

impl Drop for PendingSave {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}
