//! Core data model types shared by the format adapters and the sink.
//!
//! Rows travel through the pipeline as raw strings; the inferred [`ColumnType`] only shapes the
//! table definition and is never used to coerce values.

use std::fmt;

use serde::Deserialize;

/// Inferred SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    /// Base-10 integer literal.
    Integer,
    /// Floating point literal.
    Float,
    /// Integer or float, used by [`InferenceMode::Numeric`].
    Numeric,
    /// Anything else.
    Text,
}

impl ColumnType {
    /// SQL spelling used in the column-definition clause.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Numeric => "NUMERIC",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Type taxonomy used by the schema sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Distinguish [`ColumnType::Integer`] from [`ColumnType::Float`].
    #[default]
    Precise,
    /// Collapse both numeric kinds into [`ColumnType::Numeric`].
    Numeric,
    /// Skip classification; every column is [`ColumnType::Text`].
    ///
    /// Useful when values such as zip codes must keep leading zeros verbatim.
    AllText,
}

/// A single field handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Empty raw field; inserted as SQL `NULL`.
    Null,
    /// Raw field text, never type-coerced.
    Text(String),
}

impl Value {
    /// Wrap a raw field: the empty string becomes [`Value::Null`].
    pub fn from_raw(raw: String) -> Self {
        if raw.is_empty() {
            Self::Null
        } else {
            Self::Text(raw)
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Raw decoded row, positionally aligned with the header.
pub type RawRow = Vec<String>;

/// Row of sink values, positionally aligned with the header.
pub type Row = Vec<Value>;

/// A named column with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Header order plus per-column types for one source.
///
/// Header order is authoritative: every row emitted for the source follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Schema where every column is [`ColumnType::Text`].
    pub fn all_text<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .map(|n| ColumnDef::new(n, ColumnType::Text))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in header order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the type of a column by name, if present.
    pub fn type_of(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Column-definition clause passed to [`crate::sink::Sink::ensure_table`], e.g.
    /// `("id" INTEGER, "name" TEXT)`.
    ///
    /// Names are double-quoted so the sink keeps them exactly as they appear in the header.
    pub fn column_defs_clause(&self) -> String {
        let defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type))
            .collect();
        format!("({})", defs.join(", "))
    }
}

/// Double-quote an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_raw_value_is_null() {
        assert_eq!(Value::from_raw(String::new()), Value::Null);
        assert_eq!(Value::from_raw("0".into()), Value::Text("0".into()));
        assert_eq!(Value::from_raw(" ".into()).as_str(), Some(" "));
    }

    #[test]
    fn column_defs_clause_keeps_header_order_and_quotes_names() {
        let schema = TableSchema::new(vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("Full Name", ColumnType::Text),
            ColumnDef::new("say \"hi\"", ColumnType::Float),
        ]);
        assert_eq!(
            schema.column_defs_clause(),
            r#"("id" INTEGER, "Full Name" TEXT, "say ""hi""" FLOAT)"#
        );
        assert_eq!(schema.type_of("Full Name"), Some(ColumnType::Text));
        assert_eq!(schema.type_of("missing"), None);
    }

    #[test]
    fn inference_mode_deserializes_snake_case() {
        let mode: InferenceMode = serde_json::from_str("\"all_text\"").unwrap();
        assert_eq!(mode, InferenceMode::AllText);
    }
}
