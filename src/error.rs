use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Boxed error returned by a [`crate::sink::Sink`] implementation.
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Severity classification used for observer callbacks and log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. a pipeline stopped because a sibling failed).
    Warning,
    /// The source could not be decoded.
    Error,
    /// I/O or sink failure.
    Critical,
}

/// Error type returned by every stage of the load pipeline.
///
/// A single enum is shared by the CSV and JSON-lines adapters, the batch accumulator and the
/// file-level fan-out.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Opening a source failed.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from an open source failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid JSON inside a chunk.
    #[error("invalid json in chunk {chunk}: {source}")]
    Json {
        chunk: u64,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON-lines record was valid JSON but not a flat object.
    #[error("record in chunk {chunk} is not a json object")]
    NotAnObject { chunk: u64 },

    /// The source ended before a header row was read.
    #[error("source has no header row")]
    MissingHeader,

    /// A row's field count does not match the header.
    #[error("row {row} has {found} fields, header has {expected}")]
    Arity {
        /// 1-based position of the offending row. From the CSV reader this is the line in the
        /// file where the record starts (the header is line 1); from
        /// [`BatchAccumulator::push`](crate::ingestion::BatchAccumulator::push) it is the
        /// ordinal of the row among those pushed.
        row: u64,
        expected: usize,
        found: usize,
    },

    /// Table creation or batch insert failed.
    #[error("sink error for {} (table '{table}'): {source}", path.display())]
    Sink {
        path: PathBuf,
        table: String,
        #[source]
        source: SinkError,
    },

    /// The source's format could not be determined from its name.
    #[error("unsupported source format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Invalid loader configuration.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The pipeline stopped because another task reported a fatal error.
    #[error("cancelled")]
    Cancelled,

    /// One or more files failed during a fan-out run.
    #[error("{} of {} files failed to load", failures.len(), failures.len() + succeeded.len())]
    Aggregate {
        failures: Vec<FileFailure>,
        succeeded: Vec<PathBuf>,
    },
}

/// A single file's failure inside [`LoadError::Aggregate`].
#[derive(Debug, Error)]
#[error("{}: {error}", path.display())]
pub struct FileFailure {
    pub path: PathBuf,
    #[source]
    pub error: LoadError,
}

impl LoadError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Severity of this error, used to pick a log level and for observers.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Open { .. } | Self::Io(_) | Self::Sink { .. } => Severity::Critical,
            Self::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Severity::Critical,
                _ => Severity::Error,
            },
            Self::Json { source, .. } if source.is_io() => Severity::Critical,
            Self::Json { .. }
            | Self::NotAnObject { .. }
            | Self::Arity { .. }
            | Self::MissingHeader
            | Self::UnsupportedFormat { .. }
            | Self::Config { .. } => Severity::Error,
            Self::Cancelled => Severity::Warning,
            Self::Aggregate { failures, .. } => failures
                .iter()
                .map(|f| f.error.severity())
                .max()
                .unwrap_or(Severity::Info),
        }
    }

    /// True if this error only records that the pipeline was stopped by someone else.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
