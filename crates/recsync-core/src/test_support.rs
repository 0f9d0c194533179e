//! In-memory remote and failing store used by controller tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{Error, Result};
use crate::models::{Collection, Snapshot};
use crate::remote::RemoteStore;
use crate::storage::SnapshotStore;

/// How [`FakeRemote::check_stale`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Compare against the stored snapshot's version.
    Compare,
    Stale,
    Timeout,
    Broken,
}

pub struct FakeRemote<R> {
    state: Mutex<Snapshot<R>>,
    saved: Mutex<Vec<Snapshot<R>>>,
    check_mode: Mutex<CheckMode>,
    fail_fetch: AtomicBool,
    fail_save: AtomicBool,
    save_gate: watch::Sender<bool>,
    fetch_gate: watch::Sender<bool>,
    fetch_calls: AtomicUsize,
    check_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl<R: Collection> FakeRemote<R> {
    pub fn new(initial: Snapshot<R>) -> Self {
        let (save_gate, _) = watch::channel(true);
        let (fetch_gate, _) = watch::channel(true);
        Self {
            state: Mutex::new(initial),
            saved: Mutex::new(Vec::new()),
            check_mode: Mutex::new(CheckMode::Compare),
            fail_fetch: AtomicBool::new(false),
            fail_save: AtomicBool::new(false),
            save_gate,
            fetch_gate,
            fetch_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        let remote = Self::new(Snapshot::empty(0));
        remote.set_fail_fetch(true);
        remote
    }

    pub fn set_remote(&self, snapshot: Snapshot<R>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn remote(&self) -> Snapshot<R> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn saved(&self) -> Vec<Snapshot<R>> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_check_mode(&self, mode: CheckMode) {
        *self.check_mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Park every save until [`FakeRemote::release_saves`].
    pub fn hold_saves(&self) {
        self.save_gate.send_replace(false);
    }

    pub fn release_saves(&self) {
        self.save_gate.send_replace(true);
    }

    /// Park every fetch until [`FakeRemote::release_fetches`].
    pub fn hold_fetches(&self) {
        self.fetch_gate.send_replace(false);
    }

    pub fn release_fetches(&self) {
        self.fetch_gate.send_replace(true);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

impl<R: Collection> RemoteStore<R> for FakeRemote<R> {
    async fn fetch_all(&self) -> Result<Snapshot<R>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.fetch_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Network("connection refused".to_string()));
        }
        Ok(self.remote())
    }

    async fn check_stale(&self, known_version: i64) -> Result<bool> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.check_mode.lock().unwrap_or_else(PoisonError::into_inner);
        match mode {
            CheckMode::Compare => Ok(self.remote().last_modified > known_version),
            CheckMode::Stale => Ok(true),
            CheckMode::Timeout => Err(Error::Timeout(5_000)),
            CheckMode::Broken => Err(Error::MalformedResponse("missing needsUpdate".to_string())),
        }
    }

    async fn save(&self, snapshot: &Snapshot<R>) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.save_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Error::RemoteUnavailable("save rejected".to_string()));
        }
        self.set_remote(snapshot.clone());
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
        Ok(())
    }
}

/// Snapshot store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

impl SnapshotStore for FailingStore {
    fn load(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn store(&self, key: &str, _value: &str) -> Result<()> {
        Err(Error::PersistenceWriteFailure(format!("{key}: disk full")))
    }
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
    }

    /// Route events at `level` and above on the current thread into this sink.
    pub fn install(&self, level: tracing::Level) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(level)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
