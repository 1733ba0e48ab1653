//! Cursor buffers for stream nodes, backed by a shared chunk pool.
//!
//! Every node owns one [`StreamBuf`]: a byte buffer with a read cursor and a
//! logical capacity. Fresh buffers check a fixed-size `Vec` out of the shared
//! [`ChunkPool`] and return it on release; a buffer that had to grow past the
//! chunk size (load-entire-payload mode) becomes private and is freed
//! directly instead.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Result, StreamError};
use crate::pool::{Handle, Pool};
use crate::stream::RawSource;

/// Capacity of a pooled I/O buffer.
pub const CHUNK_SIZE: usize = 4096;

/// Pool slot backing one node I/O buffer.
#[derive(Default)]
pub struct Chunk {
    bytes: Vec<u8>,
}

/// Shared, single-threaded pool of I/O chunks.
///
/// Cloning is cheap; all clones refer to the same pool. Chains built from the
/// same pool recycle each other's buffers.
#[derive(Clone)]
pub struct ChunkPool {
    inner: Rc<RefCell<Pool<Chunk>>>,
}

impl ChunkPool {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Pool::new())),
        }
    }

    /// Number of buffers currently checked out.
    pub fn live(&self) -> usize {
        self.inner.borrow().count_live()
    }

    /// Number of blocks currently held by the pool.
    pub fn blocks(&self) -> usize {
        self.inner.borrow().block_count()
    }
}

impl Default for ChunkPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Growable byte buffer with a read cursor.
///
/// Unread bytes live in `[pos, len)`. Writers append up to the logical
/// capacity; readers consume from the front. Invariant: `pos <= len <= cap`.
pub struct StreamBuf {
    data: Vec<u8>,
    pos: usize,
    cap: usize,
    handle: Option<Handle>,
    private: bool,
}

impl StreamBuf {
    /// Check a fixed-size buffer out of the pool.
    pub(crate) fn pooled(pool: &ChunkPool) -> Result<Self> {
        let mut inner = pool.inner.borrow_mut();
        let handle = inner.acquire()?;
        let mut bytes = std::mem::take(&mut inner.get_mut(handle).bytes);
        bytes.clear();
        if bytes.capacity() < CHUNK_SIZE && bytes.try_reserve_exact(CHUNK_SIZE).is_err() {
            inner.get_mut(handle).bytes = bytes;
            inner.release(handle);
            return Err(StreamError::AllocationFailure("chunk buffer"));
        }
        Ok(Self {
            data: bytes,
            pos: 0,
            cap: CHUNK_SIZE,
            handle: Some(handle),
            private: false,
        })
    }

    /// Stand-alone buffer with its own storage, outside any pool. Used when
    /// driving codec state machines directly.
    pub fn detached(capacity: usize) -> Result<Self> {
        assert!(capacity > 0, "buffer capacity must be nonzero");
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        Ok(Self {
            data,
            pos: 0,
            cap: capacity,
            handle: None,
            private: true,
        })
    }

    /// Unread bytes.
    pub fn readable(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Number of unread bytes.
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Room left for writers.
    pub fn space(&self) -> usize {
        self.cap - self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Advance the read cursor past `n` consumed bytes.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.available(), "consumed past end of buffer");
        self.pos += n;
        if self.pos == self.data.len() {
            self.data.clear();
            self.pos = 0;
        }
    }

    pub fn push(&mut self, byte: u8) {
        debug_assert!(self.space() > 0, "stream buffer overfilled");
        self.data.push(byte);
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.space(), "stream buffer overfilled");
        self.data.extend_from_slice(bytes);
    }

    /// Hand the unwritten region to `f`, which returns how many bytes it
    /// produced. Used by adapter codecs that write through a `&mut [u8]`.
    pub fn with_space<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnOnce(&mut [u8]) -> Result<usize>,
    {
        let start = self.data.len();
        self.data.resize(self.cap, 0);
        match f(&mut self.data[start..]) {
            Ok(n) => {
                debug_assert!(start + n <= self.cap);
                self.data.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.data.truncate(start);
                Err(e)
            }
        }
    }

    /// Move unread bytes to the front so the full capacity is writable again.
    pub(crate) fn compact(&mut self) {
        if self.pos > 0 {
            self.data.copy_within(self.pos.., 0);
            let len = self.data.len() - self.pos;
            self.data.truncate(len);
            self.pos = 0;
        }
    }

    /// Double the logical capacity. The buffer becomes private: it will be
    /// freed on release instead of returning to the pool.
    pub(crate) fn grow(&mut self) -> Result<()> {
        let new_cap = self
            .cap
            .checked_mul(2)
            .ok_or(StreamError::AllocationFailure("buffer growth"))?;
        self.data.try_reserve(new_cap - self.data.len())?;
        self.cap = new_cap;
        self.private = true;
        Ok(())
    }

    /// Append up to `max` bytes pulled from a raw source.
    pub(crate) fn fill_from(&mut self, source: &mut dyn RawSource, max: usize) -> Result<usize> {
        let want = max.min(self.space());
        if want == 0 {
            return Ok(0);
        }
        let start = self.data.len();
        self.data.resize(start + want, 0);
        match source.pull(&mut self.data[start..]) {
            Ok(n) => {
                self.data.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.data.truncate(start);
                Err(e)
            }
        }
    }

    /// Return the backing storage to the pool, or free it if private.
    pub(crate) fn release(&mut self, pool: &ChunkPool) {
        if let Some(handle) = self.handle.take() {
            let mut inner = pool.inner.borrow_mut();
            if !self.private {
                let mut bytes = std::mem::take(&mut self.data);
                bytes.clear();
                inner.get_mut(handle).bytes = bytes;
            }
            inner.release(handle);
        }
        self.data = Vec::new();
        self.pos = 0;
        self.cap = 0;
    }
}
