//! Fixed-size batching of rows into sink inserts.

use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadResult};
use crate::sink::Sink;
use crate::types::{RawRow, Row, Value};

/// Default number of rows per insert.
pub const DEFAULT_BATCH_SIZE: usize = 150;

/// Totals reported by [`BatchAccumulator::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub rows: u64,
    pub batches: u64,
}

/// Buffers rows for one table and flushes them to the sink every `batch_size` rows.
///
/// Empty raw fields are inserted as [`Value::Null`]. A failed flush is returned as
/// [`LoadError::Sink`] and is not retried.
pub struct BatchAccumulator<'a> {
    sink: &'a dyn Sink,
    path: PathBuf,
    table: String,
    columns: Vec<String>,
    batch_size: usize,
    batch: Vec<Row>,
    stats: BatchStats,
    on_flush: Option<Box<dyn FnMut(usize) + 'a>>,
}

impl<'a> BatchAccumulator<'a> {
    /// # Panics
    ///
    /// Panics if `batch_size == 0`.
    pub fn new(
        sink: &'a dyn Sink,
        path: impl AsRef<Path>,
        table: impl Into<String>,
        columns: Vec<String>,
        batch_size: usize,
    ) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        Self {
            sink,
            path: path.as_ref().to_path_buf(),
            table: table.into(),
            columns,
            batch_size,
            batch: Vec::with_capacity(batch_size),
            stats: BatchStats::default(),
            on_flush: None,
        }
    }

    /// Call `f` with the row count after every successful flush.
    pub fn with_flush_hook(mut self, f: impl FnMut(usize) + 'a) -> Self {
        self.on_flush = Some(Box::new(f));
        self
    }

    /// Append one row, flushing when the batch is full.
    ///
    /// A row of the wrong width fails with [`LoadError::Arity`] carrying its 1-based ordinal
    /// among the rows pushed so far.
    pub fn push(&mut self, raw: RawRow) -> LoadResult<()> {
        if raw.len() != self.columns.len() {
            return Err(LoadError::Arity {
                row: self.stats.rows + self.batch.len() as u64 + 1,
                expected: self.columns.len(),
                found: raw.len(),
            });
        }
        self.batch.push(raw.into_iter().map(Value::from_raw).collect());
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush any remaining rows and return the totals.
    pub fn finish(mut self) -> LoadResult<BatchStats> {
        if !self.batch.is_empty() {
            self.flush()?;
        }
        Ok(self.stats)
    }

    fn flush(&mut self) -> LoadResult<()> {
        self.sink
            .insert_records(&self.table, &self.batch, &self.columns)
            .map_err(|source| LoadError::Sink {
                path: self.path.clone(),
                table: self.table.clone(),
                source,
            })?;
        let n = self.batch.len();
        self.stats.rows += n as u64;
        self.stats.batches += 1;
        self.batch.clear();
        tracing::debug!(table = %self.table, rows = n, "flushed batch");
        if let Some(hook) = self.on_flush.as_mut() {
            hook(n);
        }
        Ok(())
    }
}
