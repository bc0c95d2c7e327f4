//! Table-name derivation from a source path.

use std::path::Path;

use super::source::strip_gz_suffix;

/// Derive a table name from `path`.
///
/// The name is `<parent dir>_<file stem>`, where the stem is the file name up to its first `.`.
/// A file with no parent directory uses its stem alone, prefixed with `t` when it starts with a
/// digit. Hyphens become underscores; nothing else is rewritten.
///
/// ```
/// use dataload::ingestion::table_name;
///
/// assert_eq!(table_name("data/2024-01/orders.csv"), "2024_01_orders");
/// assert_eq!(table_name("2024-sales.csv"), "t2024_sales");
/// assert_eq!(table_name("orders.csv.gz"), "orders");
/// ```
pub fn table_name(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let file = strip_gz_suffix(&file);
    let stem = file.split('.').next().unwrap_or(file);

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy());

    let name = match parent {
        Some(dir) => format!("{dir}_{stem}"),
        None if stem.starts_with(|c: char| c.is_ascii_digit()) => format!("t{stem}"),
        None => stem.to_string(),
    };
    name.replace('-', "_")
}
