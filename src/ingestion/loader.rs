//! The per-file load pipeline.
//!
//! For one source: detect its format, establish the schema (sampled for CSV, configured for
//! JSON lines), ensure the destination table, then stream every row through a
//! [`BatchAccumulator`] into the sink.

use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadResult};
use crate::execution::{CancellationToken, LoadEvent, LoadMetrics, LoadObserver};
use crate::sink::Sink;
use crate::types::TableSchema;

use super::batch::BatchAccumulator;
use super::csv::CsvSource;
use super::json::transcode_json_lines;
use super::options::LoaderOptions;
use super::schema::probe_csv_schema;
use super::source::{self, SourceFormat};
use super::table_name::table_name;

/// Outcome of loading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub table: String,
    pub schema: TableSchema,
    pub rows: u64,
    pub batches: u64,
    /// Chunks decoded by the JSON-lines pipeline; zero for CSV.
    pub chunks: u64,
    /// Bytes of an unterminated final JSON line that were dropped.
    pub dropped_tail: usize,
}

/// Shared state a file pipeline reports into.
pub(crate) struct FileHooks<'a> {
    pub cancel: CancellationToken,
    pub metrics: &'a LoadMetrics,
    pub observer: Option<&'a dyn LoadObserver>,
}

impl FileHooks<'_> {
    pub(crate) fn emit(&self, event: LoadEvent) {
        if let Some(obs) = self.observer {
            obs.on_event(&event);
        }
    }
}

/// Load a single file into `sink`.
///
/// This runs the same pipeline as [`crate::execution::FanOut`] does per file, without a thread
/// pool around it.
pub fn load_file(
    path: impl AsRef<Path>,
    sink: &dyn Sink,
    opts: &LoaderOptions,
) -> LoadResult<FileReport> {
    opts.validate()?;
    let metrics = LoadMetrics::new();
    let hooks = FileHooks {
        cancel: CancellationToken::new(),
        metrics: &metrics,
        observer: None,
    };
    run_file(path.as_ref(), sink, opts, &hooks)
}

/// Run one file's pipeline, reporting start/finish/failure to `hooks`.
pub(crate) fn run_file(
    path: &Path,
    sink: &dyn Sink,
    opts: &LoaderOptions,
    hooks: &FileHooks<'_>,
) -> LoadResult<FileReport> {
    hooks.metrics.on_file_start();
    hooks.emit(LoadEvent::FileStarted {
        path: path.to_path_buf(),
    });

    let result = load_source(path, sink, opts, hooks);
    hooks.metrics.on_file_end(result.is_ok());

    match &result {
        Ok(report) => {
            tracing::info!(
                path = %path.display(),
                table = %report.table,
                rows = report.rows,
                batches = report.batches,
                "loaded file"
            );
            hooks.emit(LoadEvent::FileFinished {
                path: path.to_path_buf(),
                table: report.table.clone(),
                rows: report.rows,
            });
        }
        Err(err) => {
            let severity = err.severity();
            if err.is_cancelled() {
                tracing::warn!(path = %path.display(), "load cancelled");
            } else {
                tracing::error!(
                    path = %path.display(),
                    table = %table_name(path),
                    ?severity,
                    error = %err,
                    "load failed"
                );
            }
            hooks.emit(LoadEvent::FileFailed {
                path: path.to_path_buf(),
                severity,
                error: err.to_string(),
            });
        }
    }
    result
}

fn load_source(
    path: &Path,
    sink: &dyn Sink,
    opts: &LoaderOptions,
    hooks: &FileHooks<'_>,
) -> LoadResult<FileReport> {
    if hooks.cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    let format = SourceFormat::from_path(path)?;
    let table = table_name(path);

    let schema = match format {
        SourceFormat::Csv => probe_csv_schema(path, opts.look_up_size, opts.inference)?,
        SourceFormat::JsonLines => {
            let columns = opts.json_columns.as_ref().ok_or_else(|| {
                LoadError::config(format!(
                    "json_columns must be set to load {}",
                    path.display()
                ))
            })?;
            TableSchema::all_text(columns.iter().cloned())
        }
    };

    let column_defs = schema.column_defs_clause();
    sink.ensure_table(&table, &column_defs)
        .map_err(|source| LoadError::Sink {
            path: path.to_path_buf(),
            table: table.clone(),
            source,
        })?;
    tracing::debug!(table = %table, %column_defs, "ensured table");
    hooks.emit(LoadEvent::TableEnsured {
        path: path.to_path_buf(),
        table: table.clone(),
        column_defs,
    });

    let columns = schema.column_names();
    let mut acc = BatchAccumulator::new(sink, path, table.clone(), columns.clone(), opts.batch_size)
        .with_flush_hook(|rows| {
            hooks.metrics.on_batch_flushed(rows);
            hooks.emit(LoadEvent::BatchFlushed {
                table: table.clone(),
                rows,
            });
        });

    let reader = source::open(path)?;
    let (chunks, dropped_tail) = match format {
        SourceFormat::Csv => {
            let src = CsvSource::from_reader(reader)?;
            if src.header() != columns.as_slice() {
                return Err(LoadError::config(format!(
                    "header of {} changed between sampling and loading",
                    path.display()
                )));
            }
            for row in src.into_rows() {
                if hooks.cancel.is_cancelled() {
                    return Err(LoadError::Cancelled);
                }
                acc.push(row?)?;
            }
            (0, 0)
        }
        SourceFormat::JsonLines => {
            let stats = transcode_json_lines(
                reader,
                &columns,
                &opts.transcode(),
                &hooks.cancel,
                |row| acc.push(row),
            )?;
            hooks.metrics.on_chunks_decoded(stats.chunks);
            (stats.chunks, stats.dropped_tail)
        }
    };

    let stats = acc.finish()?;
    Ok(FileReport {
        path: path.to_path_buf(),
        format,
        table,
        schema,
        rows: stats.rows,
        batches: stats.batches,
        chunks,
        dropped_tail,
    })
}
