//! Queue-backed asynchronous rolling writer.

use super::pool::BufferPool;
use super::{RollingWriter, Rotation, Writer};
use crate::config::WriterMode;
use crate::error::{WriterError, WriterResult};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Capacity of the write queue. Callers block once it is full.
pub const QUEUE_SIZE: usize = 1024;

/// Size of the pooled chunks a payload is split into after a rotation.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Capacity of the error side channel.
const ERROR_CAPACITY: usize = 1;

enum Job {
    Data(Vec<u8>),
    Rotate(Rotation),
    /// Acknowledged once every earlier job has run.
    Flush(Sender<()>),
}

/// State shared by the caller side and the background thread.
struct Shared {
    inner: Writer,
    pool: BufferPool,
    errors: Sender<WriterError>,
}

impl Shared {
    fn run(&self, job: Job) {
        match job {
            Job::Data(buf) => {
                if let Err(err) = self.inner.write_current(&buf) {
                    self.report(err);
                }
                self.pool.put(buf);
            }
            Job::Rotate(rotation) => {
                if let Err(err) = self.inner.rotate(rotation) {
                    self.report(err);
                }
            }
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    /// Forwards a failure without blocking; it is dropped if nobody drains
    /// the error channel.
    fn report(&self, err: WriterError) {
        if let Err(dropped) = self.errors.try_send(err) {
            debug!(error = %dropped.into_inner(), "error channel full, dropping write error");
        }
    }
}

/// A rolling writer that hands bytes to a background thread.
///
/// `write` copies the payload into a pooled buffer and enqueues it; a single
/// background thread drains the queue in FIFO order. Callers only block when
/// the queue is full.
///
/// # Errors
///
/// A failed background write is reported to the *next* `write` call, or can
/// be polled from [`RollingWriter::error_channel`]. When the channel is full
/// the error is dropped rather than letting it grow.
///
/// # Rotation
///
/// A pending rotation is queued behind the bytes already accepted, so the
/// background thread rotates only after they have reached the old file.
///
/// # Flushing
///
/// [`RollingWriter::flush`] queues a marker and blocks until the background
/// thread reaches it, so every byte accepted before the call is in the file
/// when it returns.
pub struct AsyncWriter {
    shared: Arc<Shared>,
    queue: Sender<Job>,
    backlog: Receiver<Job>,
    errors: Receiver<WriterError>,
    stop: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    /// Writers hold it shared while enqueueing; `close` takes it exclusively.
    accepting: RwLock<()>,
}

impl AsyncWriter {
    /// Wraps an opened base writer and starts the background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the background thread cannot be spawned.
    pub fn new(inner: Writer) -> WriterResult<Self> {
        let (queue, backlog) = bounded(QUEUE_SIZE);
        let (error_tx, errors) = bounded(ERROR_CAPACITY);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let shared = Arc::new(Shared {
            inner,
            pool: BufferPool::new(QUEUE_SIZE, CHUNK_SIZE),
            errors: error_tx,
        });

        let worker = {
            let shared = Arc::clone(&shared);
            let jobs = backlog.clone();
            thread::Builder::new()
                .name("rollfile-async".to_string())
                .spawn(move || drain_until_stopped(&shared, &jobs, &stop_rx))?
        };

        Ok(Self {
            shared,
            queue,
            backlog,
            errors,
            stop: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
            accepting: RwLock::new(()),
        })
    }

    /// The wrapped base writer.
    #[must_use]
    pub fn inner(&self) -> &Writer {
        &self.shared.inner
    }

    fn enqueue(&self, job: Job) -> WriterResult<()> {
        self.queue.send(job).map_err(|_| WriterError::Closed)
    }

    fn shutdown(&self) -> WriterResult<()> {
        // Wait for writers that are mid-enqueue; the worker keeps draining
        // meanwhile so a full queue cannot wedge them.
        drop(self.accepting.write());

        drop(self.stop.lock().take());
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("async writer thread panicked");
            }
        }

        // Flush whatever the worker left behind, in order.
        while let Ok(job) = self.backlog.try_recv() {
            self.shared.run(job);
        }
        self.shared.inner.close_handle()
    }
}

fn drain_until_stopped(shared: &Shared, jobs: &Receiver<Job>, stop: &Receiver<()>) {
    loop {
        select! {
            recv(jobs) -> job => match job {
                Ok(job) => shared.run(job),
                Err(_) => return,
            },
            recv(stop) -> _ => return,
        }
    }
}

impl RollingWriter for AsyncWriter {
    fn write(&self, buf: &[u8]) -> WriterResult<usize> {
        let _accepting = self.accepting.read();
        if self.closed.load(Ordering::Acquire) {
            return Err(WriterError::Closed);
        }

        if let Ok(err) = self.errors.try_recv() {
            return Err(err);
        }

        if let Some(rotation) = self.shared.inner.poll_rotation() {
            self.enqueue(Job::Rotate(rotation))?;
            for chunk in buf.chunks(CHUNK_SIZE) {
                self.enqueue(Job::Data(self.shared.pool.filled(chunk)))?;
            }
            return Ok(buf.len());
        }

        self.enqueue(Job::Data(self.shared.pool.filled(buf)))?;
        Ok(buf.len())
    }

    fn flush(&self) -> WriterResult<()> {
        let (ack_tx, ack_rx) = bounded(1);
        {
            let _accepting = self.accepting.read();
            if self.closed.load(Ordering::Acquire) {
                return Err(WriterError::Closed);
            }
            self.enqueue(Job::Flush(ack_tx))?;
        }

        // `close` runs any marker the worker left behind, so the ack always
        // arrives unless the job was dropped.
        ack_rx.recv().map_err(|_| WriterError::Closed)?;
        match self.errors.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        }
    }

    fn close(&self) -> WriterResult<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WriterError::Closed);
        }
        self.shutdown()
    }

    fn mode(&self) -> WriterMode {
        WriterMode::Async
    }

    fn path(&self) -> &Path {
        self.shared.inner.path()
    }

    fn error_channel(&self) -> Option<Receiver<WriterError>> {
        Some(self.errors.clone())
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            if let Err(err) = self.shutdown() {
                error!(error = %err, "failed to close async writer on drop");
            }
        }
    }
}

impl std::fmt::Debug for AsyncWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncWriter")
            .field("path", &self.shared.inner.path())
            .field("queued", &self.backlog.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
