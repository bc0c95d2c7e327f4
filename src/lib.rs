//! `dataload` loads CSV and newline-delimited JSON files into a relational store.
//!
//! For every source the loader:
//!
//! 1. derives a table name from the path ([`ingestion::table_name`]);
//! 2. establishes the column order and types: CSV headers are typed by sampling the first rows
//!    ([`ingestion::probe_csv_schema`]), JSON-lines columns come from
//!    [`ingestion::LoaderOptions::json_columns`] and are typed TEXT;
//! 3. creates the table through the [`sink::Sink`] if it does not exist;
//! 4. streams every row into batches of [`ingestion::LoaderOptions::batch_size`] rows, inserting
//!    empty fields as SQL `NULL`.
//!
//! Sources are never read into memory whole. JSON-lines files are cut into newline-aligned
//! chunks and decoded by a pool of worker threads connected through bounded queues; CSV files
//! are read row by row. Gzip-compressed sources are decompressed transparently.
//!
//! Inferred types are advisory: they shape the `CREATE TABLE` clause, but values are passed to
//! the sink as raw text and never validated against them.
//!
//! ## Quick example
//!
//! ```no_run
//! use dataload::execution::FanOut;
//! use dataload::ingestion::{discover_sources, LoaderOptions};
//! use dataload::sink::MemorySink;
//!
//! # fn main() -> Result<(), dataload::LoadError> {
//! let files = discover_sources(&["data/"])?;
//! let sink = MemorySink::new();
//! let report = FanOut::new(LoaderOptions::default())?.run(&files, &sink)?;
//! println!("rows={}", report.total_rows());
//! # Ok(())
//! # }
//! ```
//!
//! ## Row order
//!
//! JSON-lines rows are decoded concurrently, so the order in which they reach the sink only
//! matches the file within a chunk. CSV rows arrive in file order.
//!
//! ## Modules
//!
//! - [`ingestion`]: per-file pipeline, format adapters, schema inference, batching
//! - [`execution`]: bounded-concurrency fan-out, cancellation, observer hooks and metrics
//! - [`sink`]: destination store interface and an in-memory implementation
//! - [`types`]: column types, values and table schemas
//! - [`error`]: the error type shared by all stages

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod sink;
pub mod types;

pub use error::{LoadError, LoadResult};
