//! Ingestion pipeline and format adapters.
//!
//! Most callers should use [`load_file`] for a single source or
//! [`crate::execution::FanOut`] for many. The building blocks are public too:
//!
//! - [`chunked`]: newline-aligned chunking of a byte stream
//! - [`buffer_pool`]: recycled chunk buffers
//! - [`json`]: the concurrent JSON-lines transcoder
//! - [`csv`]: header + arity-checked CSV rows
//! - [`schema`]: type inference by sampling
//! - [`batch`]: fixed-size batching into the sink

pub mod batch;
pub mod buffer_pool;
pub mod chunked;
pub mod csv;
pub mod discovery;
pub mod json;
pub mod loader;
pub mod options;
pub mod schema;
pub mod source;
pub mod table_name;

pub use batch::{BatchAccumulator, BatchStats};
pub use discovery::discover_sources;
pub use loader::{FileReport, load_file};
pub use options::LoaderOptions;
pub use schema::{infer_schema, probe_csv_schema};
pub use source::SourceFormat;
pub use table_name::table_name;
