//! CSV adapter: header plus raw, arity-checked rows.

use std::io::Read;

use crate::error::{LoadError, LoadResult};
use crate::types::RawRow;

/// A CSV source whose header has been read.
///
/// The first record is the header; it fixes the column order for every row that follows.
pub struct CsvSource<R: Read> {
    header: Vec<String>,
    reader: csv::Reader<R>,
}

impl<R: Read> CsvSource<R> {
    /// Read the header from `reader`.
    ///
    /// Fails with [`LoadError::MissingHeader`] when the input holds no records at all.
    pub fn from_reader(reader: R) -> LoadResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            // arity is checked per row so the error can name the offending line
            .flexible(true)
            .from_reader(reader);
        let header: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        if header.is_empty() {
            return Err(LoadError::MissingHeader);
        }
        Ok(Self { header, reader })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Consume the source, yielding data rows in file order.
    pub fn into_rows(self) -> CsvRows<R> {
        CsvRows {
            width: self.header.len(),
            records: self.reader.into_records(),
            failed: false,
        }
    }
}

/// Iterator over the data rows of a [`CsvSource`].
///
/// The first error ends the iteration.
pub struct CsvRows<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    width: usize,
    failed: bool,
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = LoadResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.records.next()?.map_err(LoadError::from).and_then(|record| {
            if record.len() != self.width {
                return Err(LoadError::Arity {
                    row: record.position().map_or(0, |p| p.line()),
                    expected: self.width,
                    found: record.len(),
                });
            }
            Ok(record.iter().map(str::to_owned).collect())
        });
        self.failed = result.is_err();
        Some(result)
    }
}
