use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Severity;

/// Events emitted while loading files.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    RunStarted { files: usize },
    ThrottleWaited { duration: Duration },
    FileStarted { path: PathBuf },
    TableEnsured { path: PathBuf, table: String, column_defs: String },
    BatchFlushed { table: String, rows: usize },
    FileFinished { path: PathBuf, table: String, rows: u64 },
    FileFailed { path: PathBuf, severity: Severity, error: String },
    RunFinished {
        elapsed: Duration,
        metrics: LoadMetricsSnapshot,
    },
}

/// Observer hook for load events.
///
/// Called from the fan-out worker threads; implementations must be cheap and thread-safe.
pub trait LoadObserver: Send + Sync {
    fn on_event(&self, event: &LoadEvent);
}

/// An observer that forwards every event to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_event(&self, event: &LoadEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Real-time counters for a load run.
///
/// The loader updates these while files are processed; callers can snapshot them at any time.
pub struct LoadMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    files_started: AtomicU64,
    files_finished: AtomicU64,
    files_failed: AtomicU64,
    rows_loaded: AtomicU64,
    batches_flushed: AtomicU64,
    chunks_decoded: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_files: AtomicUsize,
    max_active_files: AtomicUsize,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            files_started: AtomicU64::new(0),
            files_finished: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            rows_loaded: AtomicU64::new(0),
            batches_flushed: AtomicU64::new(0),
            chunks_decoded: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_files: AtomicUsize::new(0),
            max_active_files: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);

        for counter in [
            &self.elapsed_ns,
            &self.files_started,
            &self.files_finished,
            &self.files_failed,
            &self.rows_loaded,
            &self.batches_flushed,
            &self.chunks_decoded,
            &self.throttle_wait_ns,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.active_files.store(0, Ordering::SeqCst);
        self.max_active_files.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(saturating_nanos(elapsed), Ordering::SeqCst);
    }

    pub fn on_file_start(&self) {
        self.files_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_files.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_files.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_file_end(&self, ok: bool) {
        let counter = if ok {
            &self.files_finished
        } else {
            &self.files_failed
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.active_files.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_batch_flushed(&self, rows: usize) {
        self.batches_flushed.fetch_add(1, Ordering::SeqCst);
        self.rows_loaded.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn on_chunks_decoded(&self, chunks: u64) {
        self.chunks_decoded.fetch_add(chunks, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        self.throttle_wait_ns
            .fetch_add(saturating_nanos(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> LoadMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        LoadMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            files_started: self.files_started.load(Ordering::SeqCst),
            files_finished: self.files_finished.load(Ordering::SeqCst),
            files_failed: self.files_failed.load(Ordering::SeqCst),
            rows_loaded: self.rows_loaded.load(Ordering::SeqCst),
            batches_flushed: self.batches_flushed.load(Ordering::SeqCst),
            chunks_decoded: self.chunks_decoded.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_files: self.max_active_files.load(Ordering::SeqCst),
        }
    }
}

impl Default for LoadMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Immutable snapshot of [`LoadMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub files_started: u64,
    pub files_finished: u64,
    pub files_failed: u64,
    pub rows_loaded: u64,
    pub batches_flushed: u64,
    pub chunks_decoded: u64,
    pub throttle_wait: Duration,
    pub max_active_files: usize,
}

impl fmt::Display for LoadMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            concat!(
                "run_id={}, files={}/{} (failed={}), rows_loaded={}, batches={}, chunks={}, ",
                "max_active_files={}, throttle_wait={:?}, elapsed={:?}",
            ),
            self.run_id,
            self.files_finished,
            self.files_started,
            self.files_failed,
            self.rows_loaded,
            self.batches_flushed,
            self.chunks_decoded,
            self.max_active_files,
            self.throttle_wait,
            self.elapsed
        )
    }
}
