//! Reusable output buffers for render calls.
//!
//! Every buffered render borrows a buffer from a shared [`BufferPool`]
//! instead of allocating a fresh `Vec<u8>`. The [`PooledBuf`] guard owns the
//! buffer exclusively for the duration of one render and hands it back when
//! dropped, so the buffer returns to the pool on every exit path, render
//! failures and panics included.

use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A thread-safe pool of growable byte buffers.
///
/// Buffers handed out by [`acquire`](BufferPool::acquire) are always empty;
/// recycled buffers keep their capacity, so steady-state rendering stops
/// allocating once the pool has warmed up. The pool is unbounded.
#[derive(Debug, Default)]
pub struct BufferPool {
    bufs: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out an empty buffer, reusing a recycled one when available.
    pub fn acquire(&self) -> PooledBuf<'_> {
        let buf = self.lock().pop().unwrap_or_default();
        debug_assert!(buf.is_empty());
        PooledBuf { pool: self, buf }
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        self.lock().push(buf);
    }

    // A panic can never happen while the lock is held (pop/push only), but
    // recover from poisoning anyway rather than propagating it.
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.bufs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive handle on a pooled buffer.
///
/// Dereferences to `Vec<u8>`; dropping it returns the buffer to the pool.
#[derive(Debug)]
pub struct PooledBuf<'p> {
    pool: &'p BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuf<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuf<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuf<'_> {
    fn drop(&mut self) {
        self.pool.release(mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_acquire_returns_empty_buffer() {
        let pool = BufferPool::new();
        let buf = pool.acquire();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_release_keeps_capacity() {
        let pool = BufferPool::new();

        let mut buf = pool.acquire();
        buf.extend_from_slice(&[0u8; 4096]);
        drop(buf);

        let recycled = pool.acquire();
        assert!(recycled.is_empty());
        assert!(recycled.capacity() >= 4096);
    }

    #[test]
    fn test_concurrent_handles_are_distinct() {
        let pool = BufferPool::new();

        let mut a = pool.acquire();
        let mut b = pool.acquire();
        a.extend_from_slice(b"aaaa");
        b.extend_from_slice(b"bb");

        assert_eq!(&**a, b"aaaa");
        assert_eq!(&**b, b"bb");
    }

    #[test]
    fn test_pooled_buf_is_a_writer() {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        write!(&mut *buf, "hello {}", 42).unwrap();
        assert_eq!(&**buf, b"hello 42");
    }

    #[test]
    fn test_acquire_release_across_threads() {
        let pool = BufferPool::new();

        std::thread::scope(|s| {
            for i in 0..16 {
                let pool = &pool;
                s.spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        assert!(buf.is_empty());
                        buf.extend_from_slice(format!("worker {i}").as_bytes());
                    }
                });
            }
        });
    }
}
