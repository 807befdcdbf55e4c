//! Rolling writers.
//!
//! All four strategies share the same base ([`Writer`]): one active file
//! handle published through an atomic shared pointer, a rotation signal
//! channel polled before every write, and a rotation protocol that renames
//! the active file, opens a fresh one and hands the old handle to a
//! background finisher.
//!
//! | Mode     | Type               | Cross-thread order | Caller blocks on      |
//! |----------|--------------------|--------------------|-----------------------|
//! | `none`   | [`Writer`]         | none               | disk I/O              |
//! | `lock`   | [`LockedWriter`]   | mutex order        | mutex + disk I/O      |
//! | `async`  | [`AsyncWriter`]    | queue FIFO         | full queue only       |
//! | `buffer` | [`BufferedWriter`] | publish order      | occasional flush      |

mod asynchronous;
mod base;
mod buffered;
mod locked;
mod pool;

pub use asynchronous::{AsyncWriter, CHUNK_SIZE, QUEUE_SIZE};
pub use base::Writer;
pub(crate) use base::Rotation;
pub use buffered::BufferedWriter;
pub use locked::LockedWriter;

use crate::config::WriterMode;
use crate::error::{WriterError, WriterResult};
use crossbeam_channel::Receiver;
use std::io;
use std::path::Path;

/// A byte sink that rotates its file on external signals.
///
/// Writers take `&self` so one instance can be shared across threads
/// (for example behind an `Arc`).
pub trait RollingWriter: Send + Sync {
    /// Writes all of `buf`, returning its length.
    ///
    /// A pending rotation is performed (or scheduled) before the bytes are
    /// delivered, so they land in the new file.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Closed`] after [`RollingWriter::close`], or an
    /// I/O error from the underlying file. The asynchronous writer reports a
    /// failed write on the following call instead.
    fn write(&self, buf: &[u8]) -> WriterResult<usize>;

    /// Pushes bytes held in memory by the writer to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer is closed or the write fails.
    fn flush(&self) -> WriterResult<()> {
        Ok(())
    }

    /// Writes out pending data and releases the file handle.
    ///
    /// Also waits for background rotation work started by this writer.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Closed`] if the writer was already closed, or
    /// the first error hit while flushing.
    fn close(&self) -> WriterResult<()>;

    /// The write strategy of this writer.
    fn mode(&self) -> WriterMode;

    /// Path of the active file.
    fn path(&self) -> &Path;

    /// Side channel carrying failed background writes.
    ///
    /// Only the asynchronous writer has one.
    fn error_channel(&self) -> Option<Receiver<WriterError>> {
        None
    }
}

impl io::Write for Box<dyn RollingWriter> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RollingWriter::write(self.as_ref(), buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        RollingWriter::flush(self.as_ref()).map_err(io::Error::from)
    }
}
