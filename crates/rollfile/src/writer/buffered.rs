//! Batching rolling writer.

use super::{RollingWriter, Writer};
use crate::config::WriterMode;
use crate::error::{WriterError, WriterResult};
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A rolling writer that merges small writes into larger ones.
///
/// Appends publish a new buffer containing the old contents plus the payload
/// (read-copy-append-republish), so every caller sees a whole buffer. Once
/// the buffer is larger than the threshold, the caller that wins the flush
/// flag swaps in an empty buffer and writes the old one out; the others carry
/// on without waiting.
///
/// Bytes are only guaranteed to be on disk after [`RollingWriter::flush`] or
/// [`RollingWriter::close`]. A write that returns `Ok` is always written by
/// `close`; one that returns [`WriterError::Closed`] never is.
pub struct BufferedWriter {
    inner: Writer,
    buf: ArcSwap<Vec<u8>>,
    flushing: AtomicBool,
    closed: AtomicBool,
    /// Writers hold it shared while appending; `close` takes it exclusively.
    accepting: RwLock<()>,
    threshold: usize,
    flushes: AtomicU64,
}

impl BufferedWriter {
    /// Wraps an opened base writer, flushing past `config.buffer_threshold`.
    #[must_use]
    pub fn new(inner: Writer) -> Self {
        let threshold = inner.config().buffer_threshold;
        Self {
            inner,
            buf: ArcSwap::from_pointee(Vec::with_capacity(threshold)),
            flushing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            accepting: RwLock::new(()),
            threshold,
            flushes: AtomicU64::new(0),
        }
    }

    /// The wrapped base writer.
    #[must_use]
    pub fn inner(&self) -> &Writer {
        &self.inner
    }

    /// Number of bytes waiting in memory.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.load().len()
    }

    /// Number of non-empty flushes performed so far.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    fn try_begin_flush(&self) -> Option<FlushGuard<'_>> {
        self.flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlushGuard(&self.flushing))
    }

    fn begin_flush(&self) -> FlushGuard<'_> {
        loop {
            if let Some(guard) = self.try_begin_flush() {
                return guard;
            }
            std::thread::yield_now();
        }
    }

    /// Swaps the buffer out and writes it. Callers hold the flush flag.
    fn flush_pending(&self, _flag: &FlushGuard<'_>) -> WriterResult<()> {
        let pending = self.buf.swap(Arc::new(Vec::with_capacity(self.threshold)));
        if pending.is_empty() {
            return Ok(());
        }
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.inner.write_current(&pending).map(|_| ())
    }

    fn append(&self, bytes: &[u8]) {
        self.buf.rcu(|current| {
            let mut next = Vec::with_capacity((current.len() + bytes.len()).max(self.threshold));
            next.extend_from_slice(current);
            next.extend_from_slice(bytes);
            next
        });
    }
}

/// Clears the flush flag when dropped.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RollingWriter for BufferedWriter {
    fn write(&self, buf: &[u8]) -> WriterResult<usize> {
        // `closed` only changes under the exclusive lock, so a write that
        // gets past this check is appended before `close` takes its snapshot.
        let _accepting = self.accepting.read();
        if self.closed.load(Ordering::Acquire) {
            return Err(WriterError::Closed);
        }

        if let Some(rotation) = self.inner.poll_rotation() {
            // Bytes accepted before the signal belong to the old file.
            let flag = self.begin_flush();
            self.flush_pending(&flag)?;
            self.inner.rotate(rotation)?;
        }

        self.append(buf);

        if self.buf.load().len() > self.threshold {
            if let Some(flag) = self.try_begin_flush() {
                self.flush_pending(&flag)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&self) -> WriterResult<()> {
        let _accepting = self.accepting.read();
        if self.closed.load(Ordering::Acquire) {
            return Err(WriterError::Closed);
        }
        let flag = self.begin_flush();
        self.flush_pending(&flag)
    }

    fn close(&self) -> WriterResult<()> {
        let _barrier = self.accepting.write();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(WriterError::Closed);
        }
        let flushed = {
            let flag = self.begin_flush();
            self.flush_pending(&flag)
        };
        let released = self.inner.close_handle();
        flushed.and(released)
    }

    fn mode(&self) -> WriterMode {
        WriterMode::Buffer
    }

    fn path(&self) -> &Path {
        self.inner.path()
    }
}

impl Drop for BufferedWriter {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            if let Err(err) = self.close() {
                tracing::error!(error = %err, "failed to close buffered writer on drop");
            }
        }
    }
}

impl std::fmt::Debug for BufferedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("path", &self.inner.path())
            .field("threshold", &self.threshold)
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}
