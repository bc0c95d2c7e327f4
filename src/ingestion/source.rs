//! Opening sources: format detection and transparent gzip decompression.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{LoadError, LoadResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// Newline-delimited flat JSON objects.
    JsonLines,
}

impl SourceFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Detect the format of `path`, looking through a trailing `.gz`.
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let name = strip_gz_suffix(name);
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }
}

/// `orders.csv.gz` -> `orders.csv`.
pub(crate) fn strip_gz_suffix(name: &str) -> &str {
    match name.len().checked_sub(3) {
        Some(i) if name.is_char_boundary(i) && name[i..].eq_ignore_ascii_case(".gz") => &name[..i],
        _ => name,
    }
}

/// Open `path` for reading, decompressing it when it is gzip-encoded.
///
/// Gzip is recognised by a `.gz` suffix or by the gzip magic bytes, so a compressed file with a
/// plain `.csv` name is still read correctly.
pub fn open(path: &Path) -> LoadResult<Box<dyn Read + Send>> {
    let mut file = File::open(path).map_err(|e| LoadError::open(path, e))?;
    let gz_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| strip_gz_suffix(n).len() != n.len());
    let gzipped = gz_name || has_gzip_magic(&mut file).map_err(|e| LoadError::open(path, e))?;

    let reader = BufReader::new(file);
    if gzipped {
        tracing::debug!(path = %path.display(), "opening gzip source");
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn has_gzip_magic(file: &mut File) -> std::io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(filled == magic.len() && magic == GZIP_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    #[test]
    fn format_from_path() {
        let f = |p: &str| SourceFormat::from_path(Path::new(p)).ok();
        assert_eq!(f("data/orders.csv"), Some(SourceFormat::Csv));
        assert_eq!(f("data/orders.CSV.gz"), Some(SourceFormat::Csv));
        assert_eq!(f("events.ndjson"), Some(SourceFormat::JsonLines));
        assert_eq!(f("events.jsonl.gz"), Some(SourceFormat::JsonLines));
        assert_eq!(f("notes.txt"), None);
        assert_eq!(f("noext"), None);
    }

    #[test]
    fn gzip_is_detected_by_suffix_and_magic() {
        let dir = tempfile::tempdir().unwrap();
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"a,b\n1,2\n").unwrap();
        let compressed = enc.finish().unwrap();

        for name in ["x.csv.gz", "disguised.csv"] {
            let path = dir.path().join(name);
            std::fs::write(&path, &compressed).unwrap();
            let mut out = String::new();
            open(&path).unwrap().read_to_string(&mut out).unwrap();
            assert_eq!(out, "a,b\n1,2\n", "{name}");
        }

        let plain = dir.path().join("plain.csv");
        std::fs::write(&plain, "a\n").unwrap();
        let mut out = String::new();
        open(&plain).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "a\n");
    }

    #[test]
    fn missing_file_is_io_error_with_path() {
        let err = open(Path::new("does/not/exist.csv")).err().unwrap();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("does/not/exist.csv"));
    }
}
