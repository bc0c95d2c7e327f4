//! Schema inference by sampling.
//!
//! The sampler reads at most `look_up_size` data rows, classifies each non-empty value and picks
//! one [`ColumnType`] per column:
//!
//! 1. any [`ColumnType::Text`] value vetoes the column to Text;
//! 2. otherwise the most frequent type wins, with [`ColumnType::Float`] winning an
//!    Integer/Float tie;
//! 3. a column with no non-empty sampled values is Text.
//!
//! The result only depends on how many values of each kind were sampled, never on their order.
//! The sample is a prefix of the file, so the schema is as good as that prefix: a column whose
//! first hundred values are integers and whose next value is `"n/a"` is still typed Integer.

use std::io::Read;
use std::path::Path;

use crate::error::LoadResult;
use crate::types::{ColumnDef, ColumnType, InferenceMode, RawRow, TableSchema};

use super::csv::CsvSource;
use super::source;

/// Default number of rows sampled per source.
pub const DEFAULT_LOOK_UP_SIZE: usize = 100;

/// Classify a single non-empty raw value.
pub fn classify_value(raw: &str, mode: InferenceMode) -> ColumnType {
    match mode {
        InferenceMode::AllText => ColumnType::Text,
        InferenceMode::Precise | InferenceMode::Numeric => {
            let kind = if raw.parse::<i64>().is_ok() {
                ColumnType::Integer
            } else if raw.parse::<f64>().is_ok() {
                ColumnType::Float
            } else {
                return ColumnType::Text;
            };
            if mode == InferenceMode::Numeric {
                ColumnType::Numeric
            } else {
                kind
            }
        }
    }
}

/// Per-column tally of classified values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeTally {
    pub integer: usize,
    pub float: usize,
    pub numeric: usize,
    pub text: usize,
}

impl TypeTally {
    pub fn record(&mut self, ty: ColumnType) {
        match ty {
            ColumnType::Integer => self.integer += 1,
            ColumnType::Float => self.float += 1,
            ColumnType::Numeric => self.numeric += 1,
            ColumnType::Text => self.text += 1,
        }
    }

    /// Resolve the tally to a single column type.
    pub fn resolve(&self) -> ColumnType {
        if self.text > 0 {
            return ColumnType::Text;
        }
        // Float before Integer: `max_by_key` keeps the last maximum.
        [
            (ColumnType::Numeric, self.numeric),
            (ColumnType::Integer, self.integer),
            (ColumnType::Float, self.float),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map_or(ColumnType::Text, |(ty, _)| ty)
    }
}

/// Infer one type per header column from sampled rows.
///
/// Empty values are skipped rather than counted as Text. Rows are assumed to match the header's
/// arity; missing trailing fields are treated as empty.
pub fn infer_schema(header: &[String], sample: &[RawRow], mode: InferenceMode) -> TableSchema {
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut tally = TypeTally::default();
            sample
                .iter()
                .filter_map(|row| row.get(i))
                .filter(|v| !v.is_empty())
                .for_each(|v| tally.record(classify_value(v, mode)));
            ColumnDef::new(name.clone(), tally.resolve())
        })
        .collect();
    TableSchema::new(columns)
}

/// Read the header and up to `look_up_size` rows from a CSV reader and infer its schema.
pub fn sample_csv<R: Read>(
    reader: R,
    look_up_size: usize,
    mode: InferenceMode,
) -> LoadResult<TableSchema> {
    let src = CsvSource::from_reader(reader)?;
    let header = src.header().to_vec();
    let sample: Vec<RawRow> = src
        .into_rows()
        .take(look_up_size)
        .collect::<LoadResult<_>>()?;
    tracing::debug!(
        columns = header.len(),
        sampled = sample.len(),
        "sampled csv source"
    );
    Ok(infer_schema(&header, &sample, mode))
}

/// Open a CSV file (gzip-aware) and infer its schema from the first `look_up_size` rows.
///
/// This is an independent read: the main load pass opens the file again.
pub fn probe_csv_schema(
    path: impl AsRef<Path>,
    look_up_size: usize,
    mode: InferenceMode,
) -> LoadResult<TableSchema> {
    let reader = source::open(path.as_ref())?;
    sample_csv(reader, look_up_size, mode)
}
