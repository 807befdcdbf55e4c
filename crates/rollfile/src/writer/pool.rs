//! Reusable byte buffers for the asynchronous writer.

use parking_lot::Mutex;

/// Buffers that grew past this are dropped instead of pooled.
const MAX_POOLED_CAPACITY: usize = 1024 * 1024;

/// A bounded free list of byte buffers.
#[derive(Debug)]
pub(crate) struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_buffers: usize,
    buffer_capacity: usize,
}

impl BufferPool {
    pub(crate) fn new(max_buffers: usize, buffer_capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_buffers,
            buffer_capacity,
        }
    }

    /// Returns an empty buffer, reusing a pooled one when available.
    pub(crate) fn get(&self) -> Vec<u8> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity))
    }

    /// Returns a buffer filled with a copy of `bytes`.
    pub(crate) fn filled(&self, bytes: &[u8]) -> Vec<u8> {
        let mut buf = self.get();
        buf.extend_from_slice(bytes);
        buf
    }

    /// Gives a buffer back to the pool.
    pub(crate) fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_buffers {
            free.push(buf);
        }
    }

    #[cfg(test)]
    fn pooled(&self) -> usize {
        self.free.lock().len()
    }
}
