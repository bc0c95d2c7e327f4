//! Line-boundary-aligned chunking of a byte stream.
//!
//! [`ChunkedLineReader`] reads fixed-size blocks and yields [`Chunk`]s that always end on a
//! newline, so a record never straddles two chunks. Bytes after the last newline of a block are
//! carried over and prefixed to the next chunk.
//!
//! # Unterminated final line
//!
//! When the stream ends, bytes that were never followed by a newline are dropped. A file without
//! a trailing newline therefore loses its last line. The dropped byte count is available through
//! [`ChunkedLineReader::dropped_tail`] and is logged at `warn` level.

use std::io::{self, Read};

use super::buffer_pool::{BufferPool, PooledBuffer};

/// Default read size: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// A newline-aligned unit of input, excluding its final newline.
///
/// A chunk can contain many lines. Its bytes live in a pooled buffer that returns to the pool
/// when the chunk is dropped.
#[derive(Debug)]
pub struct Chunk {
    /// Zero-based position of this chunk in the stream.
    pub seq: u64,
    bytes: PooledBuffer,
}

impl Chunk {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Iterator over the newline-aligned [`Chunk`]s of a reader.
///
/// A read error is yielded once, after which the iterator is exhausted.
pub struct ChunkedLineReader<R> {
    reader: R,
    scratch: Vec<u8>,
    carry: Vec<u8>,
    pool: BufferPool,
    next_seq: u64,
    dropped_tail: usize,
    done: bool,
}

impl<R: Read> ChunkedLineReader<R> {
    /// # Panics
    ///
    /// Panics if `chunk_size == 0`.
    pub fn new(reader: R, chunk_size: usize, pool: BufferPool) -> Self {
        assert!(chunk_size > 0, "chunk_size must be > 0");
        Self {
            reader,
            scratch: vec![0; chunk_size],
            carry: Vec::new(),
            pool,
            next_seq: 0,
            dropped_tail: 0,
            done: false,
        }
    }

    /// Bytes discarded at end of stream because no newline followed them.
    pub fn dropped_tail(&self) -> usize {
        self.dropped_tail
    }

    fn finish(&mut self) {
        self.done = true;
        if !self.carry.is_empty() {
            self.dropped_tail = self.carry.len();
            tracing::warn!(
                bytes = self.dropped_tail,
                "dropping unterminated final line"
            );
            self.carry = Vec::new();
        }
    }
}

impl<R: Read> Iterator for ChunkedLineReader<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let n = match self.reader.read(&mut self.scratch) {
                Ok(0) => {
                    self.finish();
                    return None;
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            let block = &self.scratch[..n];
            let Some(last_nl) = block.iter().rposition(|&b| b == b'\n') else {
                self.carry.extend_from_slice(block);
                continue;
            };

            let mut unit = self.pool.acquire();
            unit.reserve(self.carry.len() + last_nl);
            unit.extend_from_slice(&self.carry);
            unit.extend_from_slice(&block[..last_nl]);
            self.carry.clear();
            self.carry.extend_from_slice(&block[last_nl + 1..]);

            let seq = self.next_seq;
            self.next_seq += 1;
            return Some(Ok(Chunk { seq, bytes: unit }));
        }
    }
}
