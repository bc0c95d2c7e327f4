//! File-level fan-out: loading many sources concurrently.
//!
//! Each file runs the full per-file pipeline from [`crate::ingestion::loader`] on a dedicated
//! thread pool. At most `max_concurrent_files` files are in flight; the next file is admitted
//! only when a running one finishes.
//!
//! A failing file never aborts its siblings unless [`LoaderOptions::fail_fast`] is set. Every
//! failure is collected and returned together once all files have finished.

mod cancel;
mod observer;
mod semaphore;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::error::{FileFailure, LoadError, LoadResult};
use crate::ingestion::loader::{FileHooks, FileReport, run_file};
use crate::ingestion::options::LoaderOptions;
use crate::sink::Sink;

pub use cancel::CancellationToken;
pub(crate) use cancel::ErrorSlot;
pub use observer::{CompositeObserver, LoadEvent, LoadMetrics, LoadMetricsSnapshot, LoadObserver};

use semaphore::Semaphore;

/// Files loaded successfully by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// One report per file, in input order.
    pub files: Vec<FileReport>,
}

impl LoadReport {
    pub fn total_rows(&self) -> u64 {
        self.files.iter().map(|f| f.rows).sum()
    }
}

/// Bounded-concurrency loader for many files.
pub struct FanOut {
    pool: ThreadPool,
    opts: LoaderOptions,
    observer: Option<Arc<dyn LoadObserver>>,
    metrics: Arc<LoadMetrics>,
}

impl FanOut {
    /// Create a fan-out with the given options.
    pub fn new(opts: LoaderOptions) -> LoadResult<Self> {
        opts.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(opts.threads())
            .thread_name(|i| format!("dataload-{i}"))
            .build()
            .map_err(|e| LoadError::config(format!("failed to build thread pool: {e}")))?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(LoadMetrics::new()),
        })
    }

    /// Attach an observer for load events.
    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time load metrics.
    pub fn metrics(&self) -> Arc<LoadMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.opts
    }

    /// Load every file into `sink`.
    ///
    /// Returns [`LoadError::Aggregate`] listing every failed file (and the ones that succeeded)
    /// if any file failed. Successfully loaded files stay loaded either way.
    pub fn run<P>(&self, files: &[P], sink: &dyn Sink) -> LoadResult<LoadReport>
    where
        P: AsRef<Path> + Sync,
    {
        self.run_with_cancel(files, sink, &CancellationToken::new())
    }

    /// Like [`FanOut::run`], stopping early when `cancel` is cancelled.
    ///
    /// Files not yet started fail with [`LoadError::Cancelled`]; running files stop at their
    /// next cancellation check.
    pub fn run_with_cancel<P>(
        &self,
        files: &[P],
        sink: &dyn Sink,
        cancel: &CancellationToken,
    ) -> LoadResult<LoadReport>
    where
        P: AsRef<Path> + Sync,
    {
        self.pool.install(|| self.run_impl(files, sink, cancel))
    }

    fn run_impl<P>(
        &self,
        files: &[P],
        sink: &dyn Sink,
        cancel: &CancellationToken,
    ) -> LoadResult<LoadReport>
    where
        P: AsRef<Path> + Sync,
    {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(LoadEvent::RunStarted { files: files.len() });
        tracing::info!(
            files = files.len(),
            max_concurrent_files = self.opts.max_concurrent_files,
            "starting load"
        );

        let sem = Semaphore::new(self.opts.max_concurrent_files);
        let outcomes: Vec<(PathBuf, LoadResult<FileReport>)> = files
            .par_iter()
            .map(|file| {
                let path = file.as_ref();
                let (_permit, waited) = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(LoadEvent::ThrottleWaited { duration: waited });
                }

                let hooks = FileHooks {
                    cancel: cancel.child_token(),
                    metrics: &self.metrics,
                    observer: self.observer.as_deref(),
                };
                let result = run_file(path, sink, &self.opts, &hooks);
                if result.is_err() && self.opts.fail_fast {
                    cancel.cancel();
                }
                (path.to_path_buf(), result)
            })
            .collect();

        let mut report = LoadReport::default();
        let mut failures = Vec::new();
        for (path, result) in outcomes {
            match result {
                Ok(file) => report.files.push(file),
                Err(error) => failures.push(FileFailure { path, error }),
            }
        }

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        let snapshot = self.metrics.snapshot();
        tracing::info!(metrics = %snapshot, "load finished");
        self.emit(LoadEvent::RunFinished {
            elapsed,
            metrics: snapshot,
        });

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(LoadError::Aggregate {
                failures,
                succeeded: report.files.into_iter().map(|f| f.path).collect(),
            })
        }
    }

    fn emit(&self, event: LoadEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// Load `files` into `sink` with a fresh [`FanOut`].
pub fn load_files<P>(files: &[P], sink: &dyn Sink, opts: LoaderOptions) -> LoadResult<LoadReport>
where
    P: AsRef<Path> + Sync,
{
    FanOut::new(opts)?.run(files, sink)
}
