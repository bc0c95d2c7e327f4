//! Destination store interface.
//!
//! The loader only needs two operations from a relational store: idempotent table creation and
//! bulk insert of a batch. [`MemorySink`] is an in-process implementation that records every
//! call; it backs the test suite and is handy for dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::SinkError;
use crate::types::Row;

/// A relational destination for loaded batches.
pub trait Sink: Send + Sync {
    /// Create `table` with the given column-definition clause unless it already exists.
    fn ensure_table(&self, table: &str, column_defs: &str) -> Result<(), SinkError>;

    /// Insert one batch. [`crate::types::Value::Null`] fields must be written as SQL `NULL`.
    ///
    /// `columns` gives the header order every row in `rows` follows.
    fn insert_records(
        &self,
        table: &str,
        rows: &[Row],
        columns: &[String],
    ) -> Result<(), SinkError>;
}

/// A table held by [`MemorySink`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    pub column_defs: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Size of every insert call, in call order.
    pub batch_sizes: Vec<usize>,
}

/// In-memory [`Sink`].
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a table's current contents.
    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.lock().get(name).cloned()
    }

    /// Names of all created tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.lock().expect("memory sink mutex poisoned")
    }
}

impl Sink for MemorySink {
    fn ensure_table(&self, table: &str, column_defs: &str) -> Result<(), SinkError> {
        self.lock()
            .entry(table.to_string())
            .or_insert_with(|| MemoryTable {
                column_defs: column_defs.to_string(),
                ..Default::default()
            });
        Ok(())
    }

    fn insert_records(
        &self,
        table: &str,
        rows: &[Row],
        columns: &[String],
    ) -> Result<(), SinkError> {
        let mut tables = self.lock();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| format!("table '{table}' does not exist"))?;
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(format!(
                "row has {} values but {} columns were given",
                row.len(),
                columns.len()
            )
            .into());
        }
        if t.columns.is_empty() {
            t.columns = columns.to_vec();
        }
        t.rows.extend_from_slice(rows);
        t.batch_sizes.push(rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn ensure_table_is_idempotent() {
        let sink = MemorySink::new();
        sink.ensure_table("t", "(\"a\" TEXT)").unwrap();
        sink.insert_records("t", &[vec![Value::Null]], &["a".into()])
            .unwrap();
        sink.ensure_table("t", "(\"a\" INTEGER)").unwrap();

        let t = sink.table("t").unwrap();
        assert_eq!(t.column_defs, "(\"a\" TEXT)");
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn insert_into_missing_table_fails() {
        let sink = MemorySink::new();
        let err = sink.insert_records("nope", &[], &[]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
