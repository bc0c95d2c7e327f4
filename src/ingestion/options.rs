//! Loader configuration.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{LoadError, LoadResult};
use crate::types::InferenceMode;

use super::batch::DEFAULT_BATCH_SIZE;
use super::chunked::DEFAULT_CHUNK_SIZE;
use super::json::{DEFAULT_DECODE_WORKERS, DEFAULT_QUEUE_CAPACITY, TranscodeOptions};
use super::schema::DEFAULT_LOOK_UP_SIZE;

/// Default number of files loaded concurrently.
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 10;

/// Static parameters of a load run.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```
/// use dataload::ingestion::LoaderOptions;
/// use dataload::types::InferenceMode;
///
/// let opts =
///     LoaderOptions::from_json_str(r#"{"batch_size": 500, "inference": "all_text"}"#).unwrap();
/// assert_eq!(opts.batch_size, 500);
/// assert_eq!(opts.inference, InferenceMode::AllText);
/// assert_eq!(opts.look_up_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderOptions {
    /// Rows per insert.
    pub batch_size: usize,
    /// Rows sampled for type inference.
    pub look_up_size: usize,
    /// Bytes per read in the JSON-lines pipeline.
    pub chunk_size: usize,
    /// Decode workers per JSON-lines file.
    pub decode_workers: usize,
    /// Capacity of the JSON-lines chunk and row queues.
    pub queue_capacity: usize,
    /// Upper bound on files loaded at the same time.
    pub max_concurrent_files: usize,
    /// Threads in the fan-out pool. If `None`, uses `max_concurrent_files`.
    pub num_threads: Option<usize>,
    /// Type taxonomy for CSV schema inference.
    pub inference: InferenceMode,
    /// Column order for JSON-lines sources; every JSON column is typed TEXT.
    pub json_columns: Option<Vec<String>>,
    /// Cancel files still running once any file fails.
    pub fail_fast: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            look_up_size: DEFAULT_LOOK_UP_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            decode_workers: DEFAULT_DECODE_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            num_threads: None,
            inference: InferenceMode::default(),
            json_columns: None,
            fail_fast: false,
        }
    }
}

impl LoaderOptions {
    /// Parse and validate options from JSON text.
    pub fn from_json_str(text: &str) -> LoadResult<Self> {
        let opts: Self = serde_json::from_str(text)
            .map_err(|e| LoadError::config(format!("cannot parse options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read, parse and validate options from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| LoadError::open(path, e))?;
        Self::from_json_str(&text)
    }

    /// Reject sizes the pipeline cannot run with.
    pub fn validate(&self) -> LoadResult<()> {
        let sizes = [
            ("batch_size", self.batch_size),
            ("chunk_size", self.chunk_size),
            ("decode_workers", self.decode_workers),
            ("queue_capacity", self.queue_capacity),
            ("max_concurrent_files", self.max_concurrent_files),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(LoadError::config(format!("{name} must be > 0")));
        }
        if self.num_threads == Some(0) {
            return Err(LoadError::config("num_threads must be > 0 when set"));
        }
        if self.json_columns.as_ref().is_some_and(|c| c.is_empty()) {
            return Err(LoadError::config("json_columns must not be empty when set"));
        }
        Ok(())
    }

    pub fn transcode(&self) -> TranscodeOptions {
        TranscodeOptions {
            chunk_size: self.chunk_size,
            workers: self.decode_workers,
            queue_capacity: self.queue_capacity,
        }
    }

    pub(crate) fn threads(&self) -> usize {
        self.num_threads.unwrap_or(self.max_concurrent_files).max(1)
    }
}
