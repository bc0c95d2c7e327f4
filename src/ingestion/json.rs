//! Concurrent JSON-lines transcoder.
//!
//! One reader thread cuts the input into newline-aligned [`Chunk`]s and pushes them onto a
//! bounded queue. A fixed pool of decode workers pulls chunks, decodes every flat JSON object
//! in them and pushes one [`RawRow`] per object onto a second bounded queue, which the caller
//! drains on its own thread. Full queues block their producer, so memory stays bounded no matter
//! how large the input is.
//!
//! # Ordering
//!
//! Rows decoded from one chunk are emitted in chunk order. Chunks are decoded concurrently, so
//! rows from different chunks interleave arbitrarily. Downstream consumers must not rely on
//! input order.
//!
//! # Failure
//!
//! The first fatal error (read failure, invalid JSON, a non-object record, or an error returned
//! by the row callback) is kept and cancels the pipeline; the other threads stop at their next
//! queue operation or cancellation check.

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Sender, bounded};
use serde_json::Value as JsonValue;

use crate::error::{LoadError, LoadResult};
use crate::execution::{CancellationToken, ErrorSlot};
use crate::types::RawRow;

use super::buffer_pool::BufferPool;
use super::chunked::{Chunk, ChunkedLineReader, DEFAULT_CHUNK_SIZE};

/// Default number of decode workers.
pub const DEFAULT_DECODE_WORKERS: usize = 5;

/// Default capacity of the chunk and row queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Sizing of the JSON-lines pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// Bytes per read.
    pub chunk_size: usize,
    /// Number of concurrent decode workers.
    pub workers: usize,
    /// Capacity of both the chunk queue and the row queue.
    pub queue_capacity: usize,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_DECODE_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Counters reported by a finished transcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    pub chunks: u64,
    pub rows: u64,
    /// Bytes of an unterminated final line that were dropped.
    pub dropped_tail: usize,
}

/// Decode newline-delimited JSON objects from `reader` into rows ordered by `columns`.
///
/// `on_row` is called on the calling thread for every decoded row. A column missing from an
/// object yields an empty field; keys not in `columns` are ignored.
///
/// # Panics
///
/// Panics if any of the sizes in `opts` is zero.
pub fn transcode_json_lines<R, F>(
    reader: R,
    columns: &[String],
    opts: &TranscodeOptions,
    cancel: &CancellationToken,
    mut on_row: F,
) -> LoadResult<TranscodeStats>
where
    R: Read + Send,
    F: FnMut(RawRow) -> LoadResult<()>,
{
    assert!(opts.workers > 0, "workers must be > 0");
    assert!(opts.queue_capacity > 0, "queue_capacity must be > 0");

    let pool = BufferPool::new(opts.queue_capacity + opts.workers + 1, 0);
    let slot = ErrorSlot::new(cancel.clone());
    let decoded_chunks = AtomicU64::new(0);
    // set when a stage drops input because of cancellation
    let cut_short = AtomicBool::new(false);
    let mut rows = 0u64;

    let dropped_tail = thread::scope(|s| {
        let (chunk_tx, chunk_rx) = bounded::<Chunk>(opts.queue_capacity);
        let (row_tx, row_rx) = bounded::<RawRow>(opts.queue_capacity);
        let slot = &slot;
        let decoded_chunks = &decoded_chunks;
        let cut_short = &cut_short;

        let reader_handle = s.spawn(move || {
            let mut chunks = ChunkedLineReader::new(reader, opts.chunk_size, pool);
            for next in chunks.by_ref() {
                if cancel.is_cancelled() {
                    cut_short.store(true, Ordering::Relaxed);
                    break;
                }
                match next {
                    Ok(chunk) => {
                        if chunk_tx.send(chunk).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        slot.record(LoadError::Io(e));
                        break;
                    }
                }
            }
            chunks.dropped_tail()
        });

        for worker in 0..opts.workers {
            let chunk_rx = chunk_rx.clone();
            let row_tx = row_tx.clone();
            s.spawn(move || {
                for chunk in chunk_rx.iter() {
                    if cancel.is_cancelled() {
                        cut_short.store(true, Ordering::Relaxed);
                        break;
                    }
                    let result = decode_chunk(&chunk, columns, &row_tx, cancel);
                    // the chunk's buffer goes back to the pool only once decoding is over
                    drop(chunk);
                    match result {
                        Ok(n) => {
                            decoded_chunks.fetch_add(1, Ordering::Relaxed);
                            tracing::trace!(worker, rows = n, "decoded chunk");
                        }
                        Err(e) => {
                            slot.record(e);
                            break;
                        }
                    }
                }
            });
        }
        drop(chunk_rx);
        drop(row_tx);

        for row in row_rx.iter() {
            if cancel.is_cancelled() {
                cut_short.store(true, Ordering::Relaxed);
                break;
            }
            if let Err(e) = on_row(row) {
                slot.record(e);
                break;
            }
            rows += 1;
        }
        // unblocks workers waiting on a full row queue
        drop(row_rx);

        reader_handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    });

    if let Some(err) = slot.into_inner() {
        return Err(err);
    }
    // a cancel that lands after the last row was handed over loses nothing
    if cut_short.into_inner() {
        return Err(LoadError::Cancelled);
    }
    Ok(TranscodeStats {
        chunks: decoded_chunks.into_inner(),
        rows,
        dropped_tail,
    })
}

/// Decode one chunk, sending rows in the order they appear. Returns the number of rows sent.
fn decode_chunk(
    chunk: &Chunk,
    columns: &[String],
    out: &Sender<RawRow>,
    cancel: &CancellationToken,
) -> LoadResult<u64> {
    let mut sent = 0;
    let stream = serde_json::Deserializer::from_slice(chunk.bytes()).into_iter::<JsonValue>();
    for item in stream {
        let value = item.map_err(|source| LoadError::Json {
            chunk: chunk.seq,
            source,
        })?;
        let JsonValue::Object(obj) = value else {
            return Err(LoadError::NotAnObject { chunk: chunk.seq });
        };
        let row: RawRow = columns
            .iter()
            .map(|c| obj.get(c).map(field_text).unwrap_or_default())
            .collect();
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        out.send(row).map_err(|_| LoadError::Cancelled)?;
        sent += 1;
    }
    Ok(sent)
}

/// Render a JSON value as a raw field.
///
/// `null` becomes the empty (absent) field, strings are taken verbatim, and nested arrays or
/// objects keep their compact JSON text.
pub fn field_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn small() -> TranscodeOptions {
        TranscodeOptions {
            chunk_size: 16,
            workers: 3,
            queue_capacity: 2,
        }
    }

    fn run(
        input: &str,
        columns: &[String],
        opts: &TranscodeOptions,
    ) -> LoadResult<(Vec<RawRow>, TranscodeStats)> {
        let mut out = Vec::new();
        let stats = transcode_json_lines(
            input.as_bytes(),
            columns,
            opts,
            &CancellationToken::new(),
            |row| {
                out.push(row);
                Ok(())
            },
        )?;
        Ok((out, stats))
    }

    #[test]
    fn every_row_arrives_regardless_of_order() {
        let input: String = (0..500).map(|i| format!("{{\"id\":{i},\"v\":\"x{i}\"}}\n")).collect();
        let (mut rows, stats) = run(&input, &cols(&["id", "v"]), &small()).unwrap();
        assert_eq!(rows.len(), 500);
        assert_eq!(stats.rows, 500);
        assert!(stats.chunks > 1);

        rows.sort_by_key(|r| r[0].parse::<u32>().unwrap());
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row, &vec![i.to_string(), format!("x{i}")]);
        }
    }

    #[test]
    fn order_within_a_single_chunk_is_preserved() {
        let input = "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n";
        let opts = TranscodeOptions {
            chunk_size: 1024,
            ..small()
        };
        let (rows, stats) = run(input, &cols(&["n"]), &opts).unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(rows, vec![vec!["1"], vec!["2"], vec!["3"]]);
    }

    #[test]
    fn missing_fields_are_empty_and_extra_keys_ignored() {
        let input = "{\"a\":\"x\",\"zzz\":1}\n{\"b\":null}\n";
        let (mut rows, _) = run(input, &cols(&["a", "b"]), &small()).unwrap();
        rows.sort();
        assert_eq!(rows, vec![vec!["", ""], vec!["x", ""]]);
    }

    #[test]
    fn unterminated_last_line_is_dropped() {
        let input = "{\"a\":1}\n{\"a\":2}";
        let (rows, stats) = run(input, &cols(&["a"]), &TranscodeOptions::default()).unwrap();
        assert_eq!(rows, vec![vec!["1"]]);
        assert_eq!(stats.dropped_tail, 7);
    }

    #[test]
    fn invalid_json_fails_the_pipeline() {
        let mut input: String = (0..200).map(|i| format!("{{\"id\":{i}}}\n")).collect();
        input.push_str("{\"id\": oops}\n");
        let err = run(&input, &cols(&["id"]), &small()).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }), "{err}");
    }

    #[test]
    fn non_object_record_is_rejected() {
        let err = run("[1,2]\n", &cols(&["a"]), &small()).unwrap_err();
        assert!(matches!(err, LoadError::NotAnObject { chunk: 0 }));
    }

    #[test]
    fn callback_error_stops_workers() {
        let input: String = (0..1_000).map(|i| format!("{{\"id\":{i}}}\n")).collect();
        let mut seen = 0;
        let err = transcode_json_lines(
            input.as_bytes(),
            &cols(&["id"]),
            &small(),
            &CancellationToken::new(),
            |_| {
                seen += 1;
                if seen == 10 {
                    Err(LoadError::config("sink full"))
                } else {
                    Ok(())
                }
            },
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Config { .. }));
        assert_eq!(seen, 10);
    }

    #[test]
    fn pre_cancelled_token_reports_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let err = transcode_json_lines(
            "{\"a\":1}\n".as_bytes(),
            &cols(&["a"]),
            &small(),
            &token,
            |_| Ok(()),
        )
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    /// Yields `lines` JSON records, then fails.
    struct FailingReader {
        data: std::io::Cursor<Vec<u8>>,
    }

    impl FailingReader {
        fn new(lines: usize) -> Self {
            let body: String = (0..lines).map(|i| format!("{{\"id\":{i}}}\n")).collect();
            Self {
                data: std::io::Cursor::new(body.into_bytes()),
            }
        }
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(std::io::Error::other("disk went away")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn read_error_mid_stream_fails_with_io() {
        let mut seen = 0;
        let err = transcode_json_lines(
            FailingReader::new(100),
            &cols(&["id"]),
            &small(),
            &CancellationToken::new(),
            |_| {
                seen += 1;
                Ok(())
            },
        )
        .unwrap_err();
        assert!(matches!(&err, LoadError::Io(e) if e.to_string() == "disk went away"), "{err}");
        assert!(seen <= 100);
    }

    #[test]
    fn cancel_after_last_row_is_not_a_failure() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let mut seen = 0;
        let stats = transcode_json_lines(
            "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n".as_bytes(),
            &cols(&["n"]),
            &TranscodeOptions {
                chunk_size: 1024,
                ..small()
            },
            &child,
            |_| {
                seen += 1;
                if seen == 3 {
                    parent.cancel();
                }
                Ok(())
            },
        )
        .unwrap();
        assert!(child.is_cancelled());
        assert_eq!(stats.rows, 3);
    }

    #[test]
    fn field_text_renders_scalars_and_nesting() {
        assert_eq!(field_text(&json!(null)), "");
        assert_eq!(field_text(&json!("")), "");
        assert_eq!(field_text(&json!("a b")), "a b");
        assert_eq!(field_text(&json!(true)), "true");
        assert_eq!(field_text(&json!(-2.5)), "-2.5");
        assert_eq!(field_text(&json!(7)), "7");
        assert_eq!(field_text(&json!({"k": [1, 2]})), r#"{"k":[1,2]}"#);
    }
}
