use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Counters for metrics lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    pub capacity: usize,
    pub available: usize,
    pub allocated: usize,
    pub acquired: u64,
    pub released: u64,
    /// `try_acquire` calls that found no free buffer.
    pub exhausted: u64,
}

/// Fixed number of equal-size byte buffers.
///
/// Buffers are allocated lazily up to `capacity` and handed out as [`PooledBuffer`]s, which return
/// themselves on drop. With a bounded pool the number of frames queued for the encoder can never
/// exceed `capacity`.
#[derive(Clone)]
pub struct PixelBufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    buffer_len: usize,
    capacity: usize,
    state: Mutex<PoolState>,
    returned: Condvar,
}

#[derive(Default)]
struct PoolState {
    free: Vec<Vec<u8>>,
    allocated: usize,
    acquired: u64,
    released: u64,
    exhausted: u64,
}

impl PixelBufferPool {
    /// `capacity` is clamped to at least 1.
    pub fn new(buffer_len: usize, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                buffer_len,
                capacity: capacity.max(1),
                state: Mutex::new(PoolState::default()),
                returned: Condvar::new(),
            }),
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Buffers that can be acquired right now without waiting.
    pub fn available(&self) -> usize {
        let st = self.inner.state.lock();
        st.free.len() + (self.inner.capacity - st.allocated)
    }

    pub fn try_acquire(&self) -> Option<PooledBuffer> {
        let mut st = self.inner.state.lock();
        let buf = self.take_locked(&mut st);
        if buf.is_none() {
            st.exhausted += 1;
        }
        buf.map(|buf| self.wrap(buf))
    }

    /// Wait up to `timeout` for a buffer to come back.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<PooledBuffer> {
        let mut st = self.inner.state.lock();
        if let Some(buf) = self.take_locked(&mut st) {
            return Some(self.wrap(buf));
        }
        st.exhausted += 1;
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self
                .inner
                .returned
                .wait_until(&mut st, deadline)
                .timed_out()
            {
                return self.take_locked(&mut st).map(|buf| self.wrap(buf));
            }
            if let Some(buf) = self.take_locked(&mut st) {
                return Some(self.wrap(buf));
            }
        }
    }

    pub fn stats(&self) -> BufferPoolStats {
        let st = self.inner.state.lock();
        BufferPoolStats {
            capacity: self.inner.capacity,
            available: st.free.len() + (self.inner.capacity - st.allocated),
            allocated: st.allocated,
            acquired: st.acquired,
            released: st.released,
            exhausted: st.exhausted,
        }
    }

    fn take_locked(&self, st: &mut PoolState) -> Option<Vec<u8>> {
        let buf = if let Some(buf) = st.free.pop() {
            buf
        } else if st.allocated < self.inner.capacity {
            st.allocated += 1;
            vec![0u8; self.inner.buffer_len]
        } else {
            return None;
        };
        st.acquired += 1;
        Some(buf)
    }

    fn wrap(&self, buf: Vec<u8>) -> PooledBuffer {
        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(&self.inner),
        }
    }
}

/// A buffer on loan from a [`PixelBufferPool`]. Goes back to the pool when dropped.
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            let mut st = self.pool.state.lock();
            st.released += 1;
            st.free.push(buf);
            drop(st);
            self.pool.returned.notify_one();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/buffer_pool.rs"]
mod tests;
