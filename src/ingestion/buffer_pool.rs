//! Recycled byte buffers for chunk storage.
//!
//! A [`PooledBuffer`] is owned by exactly one stage at a time: the chunk reader fills it, the
//! decode worker that claims the chunk reads from it, and dropping it (after decoding has
//! finished or failed) hands the allocation back to the pool.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// A bounded free-list of byte buffers.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    initial_capacity: usize,
}

impl BufferPool {
    /// Create a pool retaining at most `max_retained` idle buffers.
    ///
    /// Fresh buffers are allocated with `initial_capacity` bytes.
    pub fn new(max_retained: usize, initial_capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::with_capacity(max_retained)),
                max_retained,
                initial_capacity,
            }),
        }
    }

    /// Take an empty buffer, reusing an idle allocation when one is available.
    pub fn acquire(&self) -> PooledBuffer {
        let reused = self.lock_free().pop();
        let mut buf = reused.unwrap_or_else(|| Vec::with_capacity(self.inner.initial_capacity));
        buf.clear();
        PooledBuffer {
            buf,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.lock_free().len()
    }

    fn lock_free(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        self.inner.free.lock().expect("buffer pool mutex poisoned")
    }
}

/// A byte buffer on loan from a [`BufferPool`]; returned on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        if let Ok(mut free) = self.pool.free.lock() {
            if free.len() < self.pool.max_retained {
                free.push(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BufferPool;

    #[test]
    fn dropped_buffers_are_reused_and_reset() {
        let pool = BufferPool::new(2, 16);
        let mut a = pool.acquire();
        a.extend_from_slice(b"hello");
        let ptr = a.as_ptr();
        drop(a);
        assert_eq!(pool.idle(), 1);

        let b = pool.acquire();
        assert!(b.is_empty());
        assert_eq!(b.as_ptr(), ptr);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn retention_is_bounded() {
        let pool = BufferPool::new(1, 0);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
    }
}
